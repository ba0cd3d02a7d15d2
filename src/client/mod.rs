//! Outbound HTTP client.
//!
//! # Data Flow
//! ```text
//! Client::{get,post,put,patch,delete}(url, &Options)
//!     or Client::request(method, url).header().query().body()
//!     → RequestBuilder::send (URL parsed, query appended, headers validated)
//!     → reqwest transport (one network call)
//!     → status >= 400 → ClientError::Request(RequestError)
//! ```
//!
//! # Design Decisions
//! - No retries and no default timeout; configure the injected transport
//! - Cancellation is dropping the returned future
//! - Error responses are fully buffered into the error value

pub mod error;
pub mod options;

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

pub use error::{ClientError, RequestError};
pub use options::Options;

use crate::json::Payload;
use crate::routing::Method;

/// Request builder factory over a shared transport.
#[derive(Debug, Clone, Default)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured transport (timeouts, proxies, TLS).
    pub fn with_transport(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Start building a request.
    ///
    /// ```no_run
    /// use tessera::{Client, Method};
    ///
    /// # async fn run() -> Result<(), tessera::ClientError> {
    /// let response = Client::new()
    ///     .request(Method::Get, "http://localhost:5050/search")
    ///     .header("X-Custom-Header", "value")
    ///     .query("search", "gopher")
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            http: self.http.clone(),
            method,
            url: url.into(),
            options: Options::default(),
        }
    }

    pub async fn get(&self, url: &str, opts: &Options) -> Result<reqwest::Response, ClientError> {
        self.request(Method::Get, url).options(opts).send().await
    }

    pub async fn post(&self, url: &str, opts: &Options) -> Result<reqwest::Response, ClientError> {
        self.request(Method::Post, url).options(opts).send().await
    }

    pub async fn put(&self, url: &str, opts: &Options) -> Result<reqwest::Response, ClientError> {
        self.request(Method::Put, url).options(opts).send().await
    }

    pub async fn patch(&self, url: &str, opts: &Options) -> Result<reqwest::Response, ClientError> {
        self.request(Method::Patch, url).options(opts).send().await
    }

    pub async fn delete(&self, url: &str, opts: &Options) -> Result<reqwest::Response, ClientError> {
        self.request(Method::Delete, url).options(opts).send().await
    }
}

/// A request being assembled.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    http: reqwest::Client,
    method: Method,
    url: String,
    options: Options,
}

impl RequestBuilder {
    pub fn header(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.options = self.options.header(key, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.options = self.options.query(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.options = self.options.body(body);
        self
    }

    /// Use the rendered bytes of `payload` as the body.
    pub fn json(mut self, payload: &impl Payload) -> crate::error::Result<Self> {
        self.options = self.options.json(payload)?;
        Ok(self)
    }

    /// Merge `opts`: headers and query parameters are appended, a body
    /// replaces the current one.
    pub fn options(mut self, opts: &Options) -> Self {
        self.options.headers.extend(opts.headers.iter().cloned());
        self.options.query_params.extend(opts.query_params.iter().cloned());
        if let Some(body) = &opts.body {
            self.options.body = Some(body.clone());
        }
        self
    }

    /// Perform the call. Statuses of 400 and above become
    /// [`ClientError::Request`].
    pub async fn send(self) -> Result<reqwest::Response, ClientError> {
        let Self {
            http,
            method,
            url,
            options,
        } = self;

        let mut target = Url::parse(&url).map_err(|source| ClientError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        if !options.query_params.is_empty() {
            let mut pairs = target.query_pairs_mut();
            for (key, value) in &options.query_params {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = HeaderMap::new();
        for (key, value) in &options.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(key.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(key.clone()))?;
            headers.append(name, value);
        }

        tracing::debug!(method = %method, url = %target, "Sending request");

        let mut request = http.request(method.into(), target).headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let url = response.url().to_string();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            tracing::debug!(status = %status, url = %url, "Request failed");
            return Err(RequestError {
                status,
                url,
                headers,
                body,
            }
            .into());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url() {
        let err = Client::new()
            .request(Method::Get, "not a url")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_invalid_header() {
        let err = Client::new()
            .request(Method::Get, "http://127.0.0.1:1/")
            .header("bad header", "x")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader(name) if name == "bad header"));
    }

    #[test]
    fn test_options_merge() {
        let opts = Options::new().header("a", 1).query("q", "x").body("from options");
        let builder = Client::new()
            .request(Method::Post, "http://localhost/")
            .header("b", 2)
            .body("replaced")
            .options(&opts);
        assert_eq!(builder.options.headers.len(), 2);
        assert_eq!(builder.options.query_params, vec![("q".into(), "x".into())]);
        assert_eq!(builder.options.body.as_deref(), Some(b"from options".as_slice()));
    }
}
