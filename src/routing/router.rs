//! Route table and dispatch lookup.
//!
//! # Responsibilities
//! - Record routes during registration (shared by the server and its groups)
//! - Compose each route's middleware chain around its terminal handler
//! - Freeze the table for serving and look up (method, path) pairs
//!
//! # Design Decisions
//! - Mutex only while registering; the compiled table is immutable
//! - Global middleware wraps every route, outermost, in registration order
//! - Same (method, path shape) registered twice is rejected
//! - Compiled routes ordered by precedence (literal segments before
//!   placeholders), then registration order; lookup is an O(n) scan
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::handler::{normalize, register_handlers, Handler, HandlerValue};
use crate::routing::matcher::PathPattern;
use crate::routing::Method;

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Handler,
    pub middlewares: Vec<Handler>,
}

/// Summary of a registered route, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub pattern: String,
    /// Route-level middleware count, global middleware excluded.
    pub middlewares: usize,
}

#[derive(Debug, Default)]
struct Registry {
    routes: Vec<Route>,
    globals: Vec<Handler>,
}

/// Route table being built. Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    inner: Arc<Mutex<Registry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Normalize `handlers` and record a route. Nothing is recorded on error.
    pub fn register(&self, method: Method, path: &str, handlers: Vec<HandlerValue>) -> Result {
        let (handler, middlewares) = register_handlers(handlers)?;
        let pattern = PathPattern::parse(path)?;

        let mut registry = self.registry();
        if let Some(existing) = registry
            .routes
            .iter()
            .find(|route| route.method == method && route.pattern.same_shape(&pattern))
        {
            return Err(Error::DuplicateRoute {
                method,
                pattern: path.to_string(),
                existing: existing.pattern.as_str().to_string(),
            });
        }

        tracing::debug!(
            method = %method,
            pattern = %path,
            middlewares = middlewares.len(),
            "Route registered"
        );

        registry.routes.push(Route {
            method,
            pattern,
            handler,
            middlewares,
        });
        Ok(())
    }

    /// Append middleware applied to every route.
    pub fn use_middleware(&self, values: Vec<HandlerValue>) -> Result {
        let handlers = values
            .into_iter()
            .enumerate()
            .map(|(position, value)| {
                normalize(value).map_err(|source| Error::InvalidMiddleware {
                    position,
                    source: Box::new(source),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(count = handlers.len(), "Global middleware registered");
        self.registry().globals.extend(handlers);
        Ok(())
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.registry()
            .routes
            .iter()
            .map(|route| RouteInfo {
                method: route.method,
                pattern: route.pattern.as_str().to_string(),
                middlewares: route.middlewares.len(),
            })
            .collect()
    }

    /// Freeze the current routes into a lookup table with composed chains.
    pub fn compile(&self) -> CompiledRoutes {
        let registry = self.registry();
        let mut routes: Vec<CompiledRoute> = registry
            .routes
            .iter()
            .map(|route| CompiledRoute {
                method: route.method,
                pattern: route.pattern.clone(),
                endpoint: compose(&registry.globals, &route.middlewares, &route.handler),
            })
            .collect();
        // Stable, so equal precedence keeps registration order.
        routes.sort_by(|a, b| a.pattern.precedence(&b.pattern));
        CompiledRoutes { routes }
    }
}

/// Wrap `handler` right-to-left: route middleware first, then globals, so
/// globals run outermost.
fn compose(globals: &[Handler], middlewares: &[Handler], handler: &Handler) -> Handler {
    globals
        .iter()
        .chain(middlewares)
        .rev()
        .fold(handler.clone(), |next, middleware| {
            let middleware = middleware.clone();
            Handler::new(move |req, res| {
                middleware.call(req, res)?;
                next.call(req, res)
            })
        })
}

/// A route ready to serve.
#[derive(Debug)]
pub struct CompiledRoute {
    method: Method,
    pattern: PathPattern,
    endpoint: Handler,
}

impl CompiledRoute {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The full chain: global middleware, route middleware, handler.
    pub fn endpoint(&self) -> &Handler {
        &self.endpoint
    }
}

/// Result of a route lookup.
#[derive(Debug)]
pub enum Lookup<'a> {
    Found {
        route: &'a CompiledRoute,
        params: Vec<(String, String)>,
    },
    /// The path is known, but not for this method.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Immutable route table used while serving.
#[derive(Debug, Default)]
pub struct CompiledRoutes {
    routes: Vec<CompiledRoute>,
}

impl CompiledRoutes {
    pub fn lookup(&self, method: &axum::http::Method, path: &str) -> Lookup<'_> {
        let mut allowed: Vec<Method> = Vec::new();
        for route in &self.routes {
            let Some(params) = route.pattern.captures(path) else {
                continue;
            };
            if route.method.matches(method) {
                return Lookup::Found { route, params };
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method);
            }
        }

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http;

    use super::*;
    use crate::handler::{ctx, raw};
    use crate::http::{Request, Response};

    fn tag(label: &'static str) -> HandlerValue {
        raw(move |_req, res| {
            let trail = res
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            res.set_header("x-trail", &format!("{trail}{label}"))?;
            Ok(())
        })
    }

    fn ok() -> HandlerValue {
        ctx(|c| c.send_string("ok"))
    }

    fn call(routes: &CompiledRoutes, method: http::Method, path: &str) -> Response {
        let Lookup::Found { route, params } = routes.lookup(&method, path) else {
            panic!("no route for {method} {path}");
        };
        let req = Request::new(http::Request::builder().uri(path).body(Bytes::new()).unwrap())
            .with_route(route.pattern(), params);
        let mut res = Response::new();
        if let Err(err) = route.endpoint().call(&req, &mut res) {
            res.fail(&err);
        }
        res
    }

    #[test]
    fn test_lookup_outcomes() {
        let table = RouteTable::new();
        table.register(Method::Get, "/items/:id", vec![ok()]).unwrap();
        table.register(Method::Delete, "/items/:id", vec![ok()]).unwrap();
        let routes = table.compile();

        match routes.lookup(&http::Method::GET, "/items/42") {
            Lookup::Found { route, params } => {
                assert_eq!(route.pattern(), "/items/:id");
                assert_eq!(params, vec![("id".to_string(), "42".to_string())]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            routes.lookup(&http::Method::HEAD, "/items/42"),
            Lookup::Found { .. }
        ));
        match routes.lookup(&http::Method::POST, "/items/42") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::Get, Method::Delete])
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(routes.lookup(&http::Method::GET, "/nothing"), Lookup::NotFound));
    }

    #[test]
    fn test_failed_registration_records_nothing() {
        let table = RouteTable::new();
        assert!(matches!(
            table.register(Method::Get, "/x", vec![]),
            Err(Error::MissingHandler)
        ));
        assert!(table
            .register(Method::Get, "/x", vec![HandlerValue::dynamic(1u8)])
            .is_err());
        assert!(table.register(Method::Get, "no-slash", vec![ok()]).is_err());
        assert!(table.routes().is_empty());
    }

    #[test]
    fn test_literal_route_beats_earlier_placeholder() {
        let table = RouteTable::new();
        table
            .register(Method::Get, "/users/:id", vec![ctx(|c| c.send_string("by-id"))])
            .unwrap();
        table
            .register(Method::Get, "/users/me", vec![ctx(|c| c.send_string("me"))])
            .unwrap();
        let routes = table.compile();

        assert_eq!(call(&routes, http::Method::GET, "/users/me").body(), b"me");
        assert_eq!(call(&routes, http::Method::GET, "/users/42").body(), b"by-id");
        assert_eq!(table.routes()[0].pattern, "/users/:id");
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let table = RouteTable::new();
        table
            .register(Method::Get, "/dup", vec![ctx(|c| c.send_string("first"))])
            .unwrap();
        let err = table
            .register(Method::Get, "/dup", vec![ctx(|c| c.send_string("second"))])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { method: Method::Get, .. }));

        table.register(Method::Get, "/items/:id", vec![ok()]).unwrap();
        let err = table
            .register(Method::Get, "/items/{name}", vec![ok()])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { ref existing, .. } if existing == "/items/:id"));
        table.register(Method::Post, "/dup", vec![ok()]).unwrap();

        assert_eq!(table.routes().len(), 3);
        let routes = table.compile();
        assert_eq!(call(&routes, http::Method::GET, "/dup").body(), b"first");
    }

    #[test]
    fn test_chain_order_with_globals() {
        let table = RouteTable::new();
        table.register(Method::Get, "/", vec![tag("a"), tag("b"), ok()]).unwrap();
        table.use_middleware(vec![tag("g")]).unwrap();
        let routes = table.compile();

        let res = call(&routes, http::Method::GET, "/");
        assert_eq!(res.headers()["x-trail"], "gab");
        assert_eq!(res.body(), b"ok");
        assert_eq!(table.routes()[0].middlewares, 2);
    }

    #[test]
    fn test_middleware_short_circuits() {
        let table = RouteTable::new();
        let deny = raw(|_req, _res| Err(Error::msg("denied")));
        table.register(Method::Get, "/secret", vec![deny, ok()]).unwrap();
        let routes = table.compile();

        let res = call(&routes, http::Method::GET, "/secret");
        assert_eq!(res.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"denied");
    }

    #[test]
    fn test_invalid_global_middleware_position() {
        let table = RouteTable::new();
        let err = table
            .use_middleware(vec![tag("a"), HandlerValue::dynamic("nope")])
            .unwrap_err();
        assert_eq!(
            err.batch_position(),
            Some(crate::error::BatchPosition::Middleware(1))
        );
    }
}
