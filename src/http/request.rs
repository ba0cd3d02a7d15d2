//! Request view handed to handlers, plus request ID tagging.
//!
//! # Responsibilities
//! - Expose method, path, headers, query and buffered body
//! - Carry the matched route pattern and its decoded path parameters
//! - Assign a request ID to every inbound request (tower layer)
//!
//! # Design Decisions
//! - The body is buffered before the handler chain runs, so handlers can
//!   read it any number of times
//! - Request ID added as early as possible for tracing

use std::net::SocketAddr;
use std::task::{Context as TaskContext, Poll};

use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::http::{self, request::Parts, Extensions, HeaderMap, HeaderValue, Method, Uri};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Read-only view of an inbound request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
    pattern: String,
    params: Vec<(String, String)>,
}

impl Request {
    /// Wrap a fully buffered request that has not been routed.
    pub fn new(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body)
    }

    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            pattern: String::new(),
            params: Vec::new(),
        }
    }

    /// Attach the registered pattern and the parameters resolved from it.
    pub(crate) fn with_route(mut self, pattern: impl Into<String>, params: Vec<(String, String)>) -> Self {
        self.pattern = pattern.into();
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Raw (still percent-encoded) request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Value of a header, if present and valid UTF-8.
    ///
    /// ```text
    /// let content_type = req.header("content-type");
    /// ```
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the query parameter `key`, decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.uri.query().unwrap_or_default().as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }

    /// Every query pair in order of appearance, decoded.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Cheap handle to the body bytes.
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Decoded value of the path parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Route pattern this request was dispatched to. Empty when unrouted.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Peer address, when the server was started with connection info.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.extensions.get::<RequestId>().map(|id| id.0.as_str())
    }

    /// Request-scoped values inserted by tower layers.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

/// Layer that tags every request with a UUID v4 request ID.
///
/// An ID supplied by the client in `x-request-id` is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for RequestIdService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let id = match request.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.is_empty() => existing.to_string(),
            _ => {
                let generated = Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&generated) {
                    request.headers_mut().insert(X_REQUEST_ID, value);
                }
                generated
            }
        };
        request.extensions_mut().insert(RequestId(id));
        self.inner.call(request)
    }
}
