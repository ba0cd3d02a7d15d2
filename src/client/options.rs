//! Per-call request options.

use std::fmt;
use std::io::Read;

use crate::error::Result;
use crate::json::Payload;

/// Headers, query parameters and body applied to one outbound call.
///
/// ```
/// use tessera::Options;
///
/// let opts = Options::new()
///     .header("X-Custom-Header", "value")
///     .query("search", "gopher")
///     .body("test body");
/// assert_eq!(opts.query_params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. Values are rendered with `Display`.
    pub fn header(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter. Values are rendered with `Display`.
    pub fn query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query_params.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Read the body from `reader` until EOF.
    pub fn body_reader(mut self, mut reader: impl Read) -> Result<Self> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        self.body = Some(body);
        Ok(self)
    }

    /// Use the rendered bytes of `payload` as the body.
    pub fn json(self, payload: &impl Payload) -> Result<Self> {
        Ok(self.body(payload.bytes()?))
    }
}
