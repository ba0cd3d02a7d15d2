//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID and trace layers, timeout)
//!     → body buffered, route looked up
//!     → request.rs (read-only request view with route params)
//!     → handler chain on the blocking pool
//!     → response.rs (buffered response, error rendering)
//!     → Send to client
//! ```

pub mod mime;
pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, RequestId, RequestIdLayer, X_REQUEST_ID};
pub use response::Response;
pub use server::Server;
