//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (Server / RouteGroup):
//!     group prefix + path  → group.rs (join_path)
//!     group chain + values → handler::register_handlers
//!     → router.rs (RouteTable, pattern compiled by matcher.rs)
//!
//! Serving:
//!     RouteTable::compile() → CompiledRoutes (immutable, Arc-shared)
//!     Incoming (method, path) → lookup → Found / MethodNotAllowed / NotFound
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at registration, chains composed once at compile time
//! - Most specific match wins (literal segments before placeholders)
//! - Duplicate (method, pattern shape) rejected at registration
//! - Explicit NotFound / MethodNotAllowed rather than silent default

pub mod group;
pub mod matcher;
pub mod router;

use std::fmt;

pub use group::{join_path, RouteGroup, RouteManager};
pub use matcher::PathPattern;
pub use router::{CompiledRoutes, Lookup, RouteInfo, RouteTable};

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether an inbound request method is served by routes of this method.
    /// `HEAD` is answered by `GET` routes.
    pub fn matches(&self, method: &axum::http::Method) -> bool {
        match self {
            Self::Get => method == axum::http::Method::GET || method == axum::http::Method::HEAD,
            other => method.as_str() == other.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for axum::http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}
