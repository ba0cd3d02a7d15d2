//! In-process dispatch for tests.
//!
//! Requests go straight through the frozen router without a socket. The peer
//! address is reported as `127.0.0.1:0`.

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{self, HeaderMap, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use crate::error::{Error, Result};
use crate::json::decode_json;

/// Handle returned by [`Server::test`](crate::Server::test).
#[derive(Debug, Clone)]
pub struct TestServer {
    router: Router,
}

impl TestServer {
    pub(crate) fn new(router: Router) -> Self {
        Self { router }
    }

    /// Dispatch `request` and buffer the full response.
    pub async fn request(&self, mut request: http::Request<Body>) -> Result<TestResponse> {
        if request.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
        }

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.map_err(Error::msg)?;
        Ok(TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(http::Method::GET, uri, Body::empty()).await
    }

    pub async fn send(&self, method: http::Method, uri: &str, body: impl Into<Body>) -> Result<TestResponse> {
        let request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .map_err(Error::msg)?;
        self.request(request).await
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        decode_json(&self.body)
    }
}
