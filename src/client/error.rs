//! Client error types.

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

/// A response with status 400 or above.
#[derive(Debug, Clone)]
pub struct RequestError {
    pub status: StatusCode,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RequestError {
    /// Response body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request to {} failed with status {}", self.url, self.status)
    }
}

impl std::error::Error for RequestError {}

/// Errors returned by [`Client`](crate::Client).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The call could not be completed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {0:?}")]
    InvalidHeader(String),
}

impl ClientError {
    /// Status code when the server answered with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Request(err) => Some(err.status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}
