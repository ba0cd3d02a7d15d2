//! Handler normalization.
//!
//! # Data Flow
//! ```text
//! registration call (HandlerValue...)
//!     → normalize() per value (adapter chosen by shape)
//!     → register_handlers() splits middleware / terminal handler
//!     → Handler (one calling convention: &Request, &mut Response)
//! ```
//!
//! # Design Decisions
//! - One adapter constructor per supported shape, no runtime type switch
//!   except for explicitly dynamic values
//! - Adaptation happens once at registration, never per request
//! - Normalization failures surface from the registration call

pub mod context;
pub mod params;

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

pub use context::{Context, FormFile};

use crate::error::{Error, Result};
use crate::http::{Request, Response};

type HandlerFn = dyn Fn(&Request, &mut Response) -> Result + Send + Sync;
type ContextFn = dyn Fn(&mut Context<'_>) -> Result + Send + Sync;

/// Plain request/response function accepted by [`HandlerValue::dynamic`].
pub type RawHandlerFn = for<'a, 'b> fn(&'a Request, &'b mut Response) -> Result;

/// Context function accepted by [`HandlerValue::dynamic`].
pub type ContextHandlerFn = for<'a, 'b> fn(&'a mut Context<'b>) -> Result;

/// The canonical handler every accepted shape is adapted into.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> Result + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, req: &Request, res: &mut Response) -> Result {
        (self.0)(req, res)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// A value exposing a context-based handler method.
///
/// ```
/// use tessera::{Context, ContextHandler, Result};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl ContextHandler for Greeter {
///     fn handle(&self, c: &mut Context<'_>) -> Result {
///         let name = c.param_or("name", "world");
///         c.send_string(format!("{} {}", self.greeting, name))
///     }
/// }
/// ```
pub trait ContextHandler: Send + Sync {
    fn handle(&self, c: &mut Context<'_>) -> Result;
}

struct ContextClosure(Arc<ContextFn>);

impl ContextHandler for ContextClosure {
    fn handle(&self, c: &mut Context<'_>) -> Result {
        (self.0)(c)
    }
}

/// A handler as supplied at registration, before normalization.
#[derive(Clone)]
pub enum HandlerValue {
    /// Already canonical.
    Handler(Handler),
    /// Capability value with a context-based method.
    Capability(Arc<dyn ContextHandler>),
    /// Two-argument request/response function.
    Raw(Arc<HandlerFn>),
    /// Single-argument context function.
    Context(Arc<ContextFn>),
    /// Opaque value resolved by downcasting at normalization time.
    Dynamic {
        type_name: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl HandlerValue {
    /// Wrap an arbitrary value; normalization accepts it only if it is a
    /// [`Handler`], an `Arc<dyn ContextHandler>`, a [`RawHandlerFn`], a
    /// [`ContextHandlerFn`] or another [`HandlerValue`].
    pub fn dynamic<T: Any + Send + Sync>(value: T) -> Self {
        Self::Dynamic {
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Name of the shape this value was supplied as.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::Capability(_) => "capability",
            Self::Raw(_) => "raw",
            Self::Context(_) => "context",
            Self::Dynamic { .. } => "dynamic",
        }
    }
}

impl fmt::Debug for HandlerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic { type_name, .. } => write!(f, "HandlerValue::Dynamic({type_name})"),
            other => write!(f, "HandlerValue::{}", other.shape()),
        }
    }
}

impl From<Handler> for HandlerValue {
    fn from(handler: Handler) -> Self {
        Self::Handler(handler)
    }
}

impl From<Arc<dyn ContextHandler>> for HandlerValue {
    fn from(capability: Arc<dyn ContextHandler>) -> Self {
        Self::Capability(capability)
    }
}

/// Adapter for a two-argument request/response function.
///
/// ```
/// use tessera::raw;
///
/// let hello = raw(|_req, res| res.send("Hello World"));
/// ```
pub fn raw<F>(f: F) -> HandlerValue
where
    F: Fn(&Request, &mut Response) -> Result + Send + Sync + 'static,
{
    HandlerValue::Raw(Arc::new(f))
}

/// Adapter for a single-argument context function.
///
/// ```
/// use tessera::ctx;
///
/// let hello = ctx(|c| c.send_string("Hello World"));
/// ```
pub fn ctx<F>(f: F) -> HandlerValue
where
    F: Fn(&mut Context<'_>) -> Result + Send + Sync + 'static,
{
    HandlerValue::Context(Arc::new(f))
}

/// Adapter for a [`ContextHandler`] value.
pub fn capability<C>(value: C) -> HandlerValue
where
    C: ContextHandler + 'static,
{
    HandlerValue::Capability(Arc::new(value))
}

/// Produce the canonical handler for `value`.
pub fn normalize(value: HandlerValue) -> Result<Handler> {
    match value {
        HandlerValue::Handler(handler) => Ok(handler),
        HandlerValue::Capability(capability) => Ok(from_capability(capability)),
        HandlerValue::Raw(f) => Ok(Handler(f)),
        HandlerValue::Context(f) => Ok(from_capability(Arc::new(ContextClosure(f)))),
        HandlerValue::Dynamic { type_name, value } => normalize_dynamic(type_name, value),
    }
}

fn from_capability(capability: Arc<dyn ContextHandler>) -> Handler {
    Handler::new(move |req, res| {
        let mut c = Context::new(req, res);
        capability.handle(&mut c)
    })
}

fn normalize_dynamic(type_name: &'static str, value: Arc<dyn Any + Send + Sync>) -> Result<Handler> {
    if let Some(handler) = value.downcast_ref::<Handler>() {
        return Ok(handler.clone());
    }
    if let Some(capability) = value.downcast_ref::<Arc<dyn ContextHandler>>() {
        return Ok(from_capability(capability.clone()));
    }
    if let Some(f) = value.downcast_ref::<RawHandlerFn>() {
        return Ok(Handler::new(*f));
    }
    if let Some(f) = value.downcast_ref::<ContextHandlerFn>() {
        let f = *f;
        return Ok(from_capability(Arc::new(ContextClosure(Arc::new(f)))));
    }
    if let Some(inner) = value.downcast_ref::<HandlerValue>() {
        return normalize(inner.clone());
    }
    Err(Error::InvalidHandlerType { type_name })
}

/// Normalize a batch: every value but the last is middleware, the last one
/// is the terminal handler.
pub fn register_handlers<I>(values: I) -> Result<(Handler, Vec<Handler>)>
where
    I: IntoIterator<Item = HandlerValue>,
{
    let mut values: Vec<HandlerValue> = values.into_iter().collect();
    let last = values.pop().ok_or(Error::MissingHandler)?;

    let middlewares = values
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            normalize(value).map_err(|source| Error::InvalidMiddleware {
                position,
                source: Box::new(source),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let handler = normalize(last).map_err(|source| Error::InvalidFinalHandler {
        source: Box::new(source),
    })?;

    Ok((handler, middlewares))
}
