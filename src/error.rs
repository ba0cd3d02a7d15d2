//! Error types shared by the server side of the crate.
//!
//! Registration-time failures (`InvalidHandlerType`, `MissingHandler`,
//! `InvalidMiddleware`, `InvalidFinalHandler`, `InvalidPattern`,
//! `DuplicateRoute`) come back
//! synchronously from the registration call. Everything else is produced while
//! a request is being handled and is turned into exactly one HTTP response at
//! the request boundary.

use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

use crate::handler::params::ParamError;
use crate::routing::Method;

/// Content type used for plain-text error bodies.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Content type that switches a [`ServerError`] to the JSON envelope.
pub const APPLICATION_JSON: &str = "application/json";

/// Errors produced while registering routes or handling requests.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler value matched none of the supported shapes.
    #[error(
        "invalid handler type: {type_name} - must be a Handler, a ContextHandler, \
         a request/response function or a context function"
    )]
    InvalidHandlerType { type_name: &'static str },

    /// A registration call received an empty handler list.
    #[error("no handler supplied")]
    MissingHandler,

    /// One of the middleware values of a batch failed normalization.
    #[error("middleware at position {position}: {source}")]
    InvalidMiddleware {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    /// The terminal handler of a batch failed normalization.
    #[error("final handler: {source}")]
    InvalidFinalHandler {
        #[source]
        source: Box<Error>,
    },

    /// A route pattern could not be compiled.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A route with the same method already matches exactly the same paths.
    #[error("route {method} {pattern} conflicts with {existing}")]
    DuplicateRoute {
        method: Method,
        pattern: String,
        existing: String,
    },

    /// A header name or value rejected by the HTTP layer.
    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    /// A handler error tagged with its own status and content type.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Path parameter coercion failed.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// JSON encoding or decoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The body is not `multipart/form-data` or could not be parsed.
    #[error(transparent)]
    Multipart(#[from] multer::Error),

    /// No file was uploaded under the form field.
    #[error("no such file: {key:?}")]
    MissingFile { key: String },

    /// Free-form handler failure, answered with a 500.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Build a plain handler error from any displayable value.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Message(message.to_string())
    }

    /// Position of the failing element when this is a batch normalization error.
    pub fn batch_position(&self) -> Option<BatchPosition> {
        match self {
            Self::InvalidMiddleware { position, .. } => Some(BatchPosition::Middleware(*position)),
            Self::InvalidFinalHandler { .. } => Some(BatchPosition::Final),
            _ => None,
        }
    }
}

/// Where in a handler batch normalization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPosition {
    /// Zero-based index among the middleware.
    Middleware(usize),
    /// The terminal handler.
    Final,
}

/// Result type for registration and handler operations.
pub type Result<T = ()> = std::result::Result<T, Error>;

/// An error a handler returns to choose the response it produces.
///
/// With `application/json` as content type the body is `{"err":"<message>"}`;
/// any other content type sends the message as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServerError {
    pub status: StatusCode,
    pub content_type: String,
    pub message: String,
}

impl ServerError {
    /// Plain-text server error.
    pub fn new(status: StatusCode, message: impl fmt::Display) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN.to_string(),
            message: message.to_string(),
        }
    }

    /// Server error rendered with the JSON envelope.
    pub fn json(status: StatusCode, message: impl fmt::Display) -> Self {
        Self::new(status, message).with_content_type(APPLICATION_JSON)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn is_json(&self) -> bool {
        self.content_type == APPLICATION_JSON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_display() {
        let err = Error::InvalidMiddleware {
            position: 2,
            source: Box::new(Error::InvalidHandlerType { type_name: "u32" }),
        };
        assert!(err.to_string().starts_with("middleware at position 2: invalid handler type: u32"));
        assert_eq!(err.batch_position(), Some(BatchPosition::Middleware(2)));

        let err = Error::InvalidFinalHandler {
            source: Box::new(Error::InvalidHandlerType { type_name: "&str" }),
        };
        assert!(err.to_string().starts_with("final handler: "));
        assert_eq!(err.batch_position(), Some(BatchPosition::Final));
        assert_eq!(Error::MissingHandler.batch_position(), None);
    }

    #[test]
    fn test_wrapped_errors_keep_source_text() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert_eq!(Error::from(io).to_string(), "no such file");

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let text = json.to_string();
        assert_eq!(Error::from(json).to_string(), text);

        let err = Error::DuplicateRoute {
            method: Method::Get,
            pattern: "/users/{name}".into(),
            existing: "/users/:id".into(),
        };
        assert_eq!(err.to_string(), "route GET /users/{name} conflicts with /users/:id");
    }

    #[test]
    fn test_server_error_content_type() {
        let err = ServerError::json(StatusCode::NOT_FOUND, "missing");
        assert!(err.is_json());
        assert_eq!(err.to_string(), "missing");

        let err = ServerError::new(StatusCode::BAD_REQUEST, "bad");
        assert_eq!(err.content_type, TEXT_PLAIN);
        assert!(!err.is_json());
    }
}
