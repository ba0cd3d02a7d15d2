//! Route groups: shared path prefixes and middleware chains.
//!
//! A group never owns routes. Registering through a group resolves the full
//! path and chain, then records the route on the root table.

use crate::error::{Error, Result};
use crate::handler::HandlerValue;
use crate::routing::router::RouteTable;
use crate::routing::Method;

/// Join a base path and a relative path with exactly one `/` between them.
///
/// ```
/// use tessera::routing::join_path;
///
/// assert_eq!(join_path("/account/", "/profile"), "/account/profile");
/// assert_eq!(join_path("/account", "/"), "/account");
/// ```
pub fn join_path(base: &str, path: &str) -> String {
    if path.is_empty() || path == "/" {
        return base.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

/// Registration surface shared by the server and its groups.
pub trait RouteManager {
    /// Register `handlers` for `method` at `path`, relative to this manager.
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerValue>) -> Result;

    /// A new group below this one. `self` is left unchanged.
    fn group(&self, base_path: &str, middlewares: impl IntoIterator<Item = HandlerValue>) -> RouteGroup;

    /// Add middleware that wraps every route of the server.
    fn use_middleware(&self, middlewares: impl IntoIterator<Item = HandlerValue>) -> Result;

    /// Open a group at `base_path` inheriting this manager's middleware and
    /// hand it to `f`.
    fn route<F, R>(&self, base_path: &str, f: F) -> R
    where
        F: FnOnce(&RouteGroup) -> R,
    {
        let group = self.group(base_path, Vec::new());
        f(&group)
    }

    fn get(&self, path: &str, handlers: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.handle(Method::Get, path, handlers.into_iter().collect())
    }

    fn post(&self, path: &str, handlers: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.handle(Method::Post, path, handlers.into_iter().collect())
    }

    fn put(&self, path: &str, handlers: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.handle(Method::Put, path, handlers.into_iter().collect())
    }

    fn patch(&self, path: &str, handlers: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.handle(Method::Patch, path, handlers.into_iter().collect())
    }

    fn delete(&self, path: &str, handlers: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.handle(Method::Delete, path, handlers.into_iter().collect())
    }
}

/// A path prefix plus the middleware applied to every route declared in it.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    table: RouteTable,
    base_path: String,
    middlewares: Vec<HandlerValue>,
}

impl RouteGroup {
    pub(crate) fn new(table: RouteTable, base_path: String, middlewares: Vec<HandlerValue>) -> Self {
        Self {
            table,
            base_path,
            middlewares,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Inherited middleware, outermost first, not yet normalized.
    pub fn middlewares(&self) -> &[HandlerValue] {
        &self.middlewares
    }
}

impl RouteManager for RouteGroup {
    fn handle(&self, method: Method, path: &str, handlers: Vec<HandlerValue>) -> Result {
        if handlers.is_empty() {
            return Err(Error::MissingHandler);
        }
        let chain = self.middlewares.iter().cloned().chain(handlers).collect();
        self.table
            .register(method, &join_path(&self.base_path, path), chain)
    }

    fn group(&self, base_path: &str, middlewares: impl IntoIterator<Item = HandlerValue>) -> RouteGroup {
        RouteGroup::new(
            self.table.clone(),
            join_path(&self.base_path, base_path),
            self.middlewares.iter().cloned().chain(middlewares).collect(),
        )
    }

    fn use_middleware(&self, middlewares: impl IntoIterator<Item = HandlerValue>) -> Result {
        self.table.use_middleware(middlewares.into_iter().collect())
    }
}
