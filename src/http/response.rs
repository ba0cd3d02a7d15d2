//! Response view handed to handlers.
//!
//! # Responsibilities
//! - Buffer status, headers and body written by the handler chain
//! - Detect the body content type when the handler did not set one
//! - Render handler errors into exactly one response
//!
//! # Design Decisions
//! - The first write commits the status; later status changes are ignored
//! - Status codes outside 100..=511 fall back to 200
//! - A failing chain discards what it buffered before the error is rendered

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use serde::Serialize;

use crate::error::{Error, Result, ServerError, APPLICATION_JSON, TEXT_PLAIN};
use crate::http::mime::sniff_content_type;
use crate::json::{Json, Payload};

const DEFAULT_STATUS: StatusCode = StatusCode::OK;

/// Buffered response written by handlers and middleware.
#[derive(Debug, Default)]
pub struct Response {
    requested: Option<u16>,
    committed: Option<StatusCode>,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status for the next write. Chainable.
    ///
    /// ```text
    /// res.status(StatusCode::CREATED).json(&payload)?;
    /// ```
    pub fn status(&mut self, code: impl Into<u16>) -> &mut Self {
        self.requested = Some(code.into());
        self
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidHeader {
            name: key.to_string(),
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
            name: key.to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Write `data` as body, sniffing the content type if none was set.
    pub fn send(&mut self, data: impl AsRef<[u8]>) -> Result {
        let data = data.as_ref();
        self.commit();
        if !data.is_empty() {
            if !self.headers.contains_key(header::CONTENT_TYPE) {
                self.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(sniff_content_type(data)),
                );
            }
            self.body.extend_from_slice(data);
        }
        Ok(())
    }

    /// Commit `code` without a body.
    pub fn send_status(&mut self, code: impl Into<u16>) -> Result {
        self.status(code);
        self.commit();
        Ok(())
    }

    /// Serialize `data` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result {
        let encoded = serde_json::to_vec(data)?;
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.commit();
        self.body.extend_from_slice(&encoded);
        Ok(())
    }

    /// Status that will be sent: the committed one, else the requested one if
    /// valid, else 200.
    pub fn status_code(&self) -> StatusCode {
        self.committed
            .unwrap_or_else(|| self.requested.map_or(DEFAULT_STATUS, valid_or_default))
    }

    pub fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    fn commit(&mut self) {
        if self.committed.is_none() {
            self.committed = Some(self.requested.map_or(DEFAULT_STATUS, valid_or_default));
        }
    }

    /// Replace whatever was buffered with the rendering of `err`.
    pub(crate) fn fail(&mut self, err: &Error) {
        *self = Self::new();
        match err {
            Error::Server(server_error) => self.write_server_error(server_error),
            other => self.write_plain(StatusCode::INTERNAL_SERVER_ERROR, TEXT_PLAIN, other.to_string()),
        }
    }

    fn write_server_error(&mut self, err: &ServerError) {
        if !err.is_json() {
            self.write_plain(err.status, &err.content_type, err.message.clone());
            return;
        }
        match Json::new().with("err", err.message.as_str()).bytes() {
            Ok(body) => {
                self.headers
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                self.committed = Some(err.status);
                self.body = body;
            }
            Err(encode_err) => self.write_plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                TEXT_PLAIN,
                encode_err.to_string(),
            ),
        }
    }

    fn write_plain(&mut self, status: StatusCode, content_type: &str, message: String) {
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(TEXT_PLAIN));
        self.headers.insert(header::CONTENT_TYPE, content_type);
        self.headers
            .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        self.committed = Some(status);
        self.body = message.into_bytes();
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let mut response = HttpResponse::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn valid_or_default(code: u16) -> StatusCode {
    if !(100..=511).contains(&code) {
        return DEFAULT_STATUS;
    }
    StatusCode::from_u16(code).unwrap_or(DEFAULT_STATUS)
}
