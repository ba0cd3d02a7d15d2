//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Own the route table while routes are registered
//! - Freeze it into an Axum Router with tracing and request ID layers
//! - Bind the listener and shut down gracefully
//! - Dispatch each request to its handler chain and render the outcome
//! - Observability (metrics, correlation IDs)
//!
//! # Design Decisions
//! - The request timeout is enforced in `dispatch`, so a 408 still gets the
//!   request ID header and is counted under its route
//! - A timed-out chain cannot be cancelled: it runs to completion on its
//!   blocking thread and its output is discarded

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request as HttpRequest, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{Error, Result, ServerError};
use crate::handler::{Handler, HandlerValue};
use crate::http::request::{Request, RequestId, RequestIdLayer, X_REQUEST_ID};
use crate::http::response::Response;
use crate::lifecycle::{wait_for_signal, Shutdown};
use crate::observability::metrics::{self, UNMATCHED_ROUTE};
use crate::routing::{join_path, CompiledRoutes, Lookup, Method, RouteGroup, RouteInfo, RouteManager, RouteTable};
use crate::testing::TestServer;

/// Application state injected into the dispatcher.
#[derive(Clone)]
struct AppState {
    routes: Arc<CompiledRoutes>,
    max_body_size: usize,
    request_timeout: Duration,
}

/// Route/middleware server.
///
/// ```no_run
/// use tessera::{raw, RouteManager, Server};
///
/// # async fn run() -> std::io::Result<()> {
/// let server = Server::new(5050);
/// server
///     .get("/hello", [raw(|_req, res| res.send("Hello World"))])
///     .expect("valid route");
/// server.listen().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    table: RouteTable,
}

impl Server {
    /// Server listening on `port` on all interfaces. A full `host:port`
    /// address is used as is.
    pub fn new(port: impl fmt::Display) -> Self {
        let port = port.to_string();
        let mut config = ServerConfig::default();
        config.listener.bind_address = if port.contains(':') {
            port
        } else {
            format!("0.0.0.0:{port}")
        };
        Self::with_config(config)
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            table: RouteTable::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Routes registered so far, in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table.routes()
    }

    /// Build the Axum router from the routes registered so far.
    pub fn router(&self) -> Router {
        let state = AppState {
            routes: Arc::new(self.table.compile()),
            max_body_size: self.config.limits.max_body_size,
            request_timeout: Duration::from_secs(self.config.timeouts.request_secs),
        };

        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn serve(&self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!(
            address = %addr,
            routes = self.table.routes().len(),
            "HTTP server starting"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn listen(&self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        tokio::spawn(async move {
            wait_for_signal().await;
            shutdown.trigger();
        });
        self.serve(listener, receiver).await
    }

    /// In-process client over the routes registered so far.
    pub fn test(&self) -> TestServer {
        TestServer::new(self.router())
    }
}

impl RouteManager for Server {
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerValue>) -> Result {
        self.table.register(method, path, handlers)
    }

    fn group(&self, base_path: &str, middlewares: impl IntoIterator<Item = HandlerValue>) -> RouteGroup {
        RouteGroup::new(
            self.table.clone(),
            join_path("/", base_path),
            middlewares.into_iter().collect(),
        )
    }

    fn use_middleware(&self, middlewares: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.table.use_middleware(middlewares.into_iter().collect())
    }
}

/// Catch-all handler: route lookup, then body buffering and chain execution
/// under the request timeout.
async fn dispatch(State(state): State<AppState>, request: HttpRequest) -> HttpResponse {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let request_id = parts
        .extensions
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Dispatching request"
    );

    let (endpoint, pattern, params) = match state.routes.lookup(&method, &path) {
        Lookup::Found { route, params } => (route.endpoint().clone(), route.pattern().to_string(), params),
        Lookup::MethodNotAllowed(allowed) => {
            let mut response = rejection(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed");
            if let Ok(value) = HeaderValue::from_str(&allow_header(&allowed)) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            return finish(response, &method, UNMATCHED_ROUTE, &request_id, start);
        }
        Lookup::NotFound => {
            tracing::debug!(request_id = %request_id, path = %path, "No route matched");
            let response = rejection(StatusCode::NOT_FOUND, "404 page not found");
            return finish(response, &method, UNMATCHED_ROUTE, &request_id, start);
        }
    };

    let handled = RunChain {
        endpoint,
        pattern: pattern.clone(),
        params,
        max_body_size: state.max_body_size,
        request_id: request_id.clone(),
    }
    .run(parts, body);

    let response = match tokio::time::timeout(state.request_timeout, handled).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                pattern = %pattern,
                timeout_secs = state.request_timeout.as_secs(),
                "Request timed out"
            );
            rejection(StatusCode::REQUEST_TIMEOUT, "request timed out")
        }
    };
    finish(response, &method, &pattern, &request_id, start)
}

/// Everything needed to run a matched route once its body is read.
struct RunChain {
    endpoint: Handler,
    pattern: String,
    params: Vec<(String, String)>,
    max_body_size: usize,
    request_id: String,
}

impl RunChain {
    async fn run(self, parts: Parts, body: Body) -> HttpResponse {
        let Self {
            endpoint,
            pattern,
            params,
            max_body_size,
            request_id,
        } = self;

        let bytes = match axum::body::to_bytes(body, max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
                return rejection(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            }
        };

        let request = Request::from_parts(parts, bytes).with_route(pattern, params);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut response = Response::new();
            if let Err(err) = endpoint.call(&request, &mut response) {
                tracing::warn!(
                    request_id = request.request_id().unwrap_or("unknown"),
                    method = %request.method(),
                    pattern = %request.pattern(),
                    error = %err,
                    "Handler failed"
                );
                response.fail(&err);
            }
            response
        })
        .await;

        match outcome {
            Ok(response) => response.into_response(),
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Handler panicked");
                rejection(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// `Allow` value for a 405. `GET` routes also answer `HEAD`.
fn allow_header(allowed: &[Method]) -> String {
    let mut names = Vec::with_capacity(allowed.len() + 1);
    for method in allowed {
        names.push(method.as_str());
        if *method == Method::Get {
            names.push("HEAD");
        }
    }
    names.join(", ")
}

/// Plain-text response rendered the same way as a tagged handler error.
fn rejection(status: StatusCode, message: &str) -> HttpResponse {
    let mut response = Response::new();
    response.fail(&Error::Server(ServerError::new(status, message)));
    response.into_response()
}

fn finish(
    mut response: HttpResponse,
    method: &axum::http::Method,
    route: &str,
    request_id: &str,
    start: Instant,
) -> HttpResponse {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    metrics::record_request(method.as_str(), response.status().as_u16(), route, start);
    response
}
