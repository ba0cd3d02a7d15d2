//! Tessera: a small convenience layer over HTTP client and server primitives.
//!
//! # Architecture Overview
//!
//! ```text
//!   registration                                serving
//!   ────────────                                ───────
//!   Server / RouteGroup                         TCP ─▶ axum Router (trace, request id)
//!     │ join_path + group chain                        │
//!     ▼                                                ▼
//!   handler::register_handlers                  CompiledRoutes::lookup(method, path)
//!     │ HandlerValue ─▶ Handler                        │ params decoded
//!     ▼                                                ▼
//!   RouteTable ── compile() ──────────────────▶ chain(globals ++ middleware ++ handler)
//!                                                      │ Request / Response views
//!                                                      ▼
//!                                               Response, or error rendered once
//!
//!   Client::request(method, url) ─▶ RequestBuilder ─▶ reqwest ─▶ RequestError on >= 400
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod json;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod testing;

pub use axum::http::StatusCode;

pub use client::{Client, ClientError, Options, RequestBuilder, RequestError};
pub use config::ServerConfig;
pub use error::{BatchPosition, Error, Result, ServerError};
pub use handler::params::{FromParam, ParamError, Params};
pub use handler::{capability, ctx, raw, Context, ContextHandler, FormFile, Handler, HandlerValue};
pub use http::{Request, Response, Server};
pub use json::{decode_json, rw_buffer, Json, Payload};
pub use lifecycle::Shutdown;
pub use routing::{join_path, Method, RouteGroup, RouteManager};
pub use testing::{TestResponse, TestServer};
