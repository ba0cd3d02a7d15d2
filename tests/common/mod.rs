//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use tessera::{Server, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Start a mock backend on an ephemeral port.
///
/// - `/echo/...` answers 200 with a JSON description of the request
/// - `/status/{code}` answers `code` with body `boom`
pub async fn start_mock_backend() -> SocketAddr {
    let app = Router::new()
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or_default(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [("x-failure", "injected")], "boom")
}

/// Serve `server` on an ephemeral port until `shutdown` fires.
pub async fn start_server(server: Server, shutdown: &Shutdown) -> (SocketAddr, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.serve(listener, receiver).await });
    (addr, handle)
}
