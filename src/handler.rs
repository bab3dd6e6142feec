//! Handler references and the seam through which they are invoked.
//!
//! Routing never looks inside a handler. A [`HandlerRef`] is threaded from the
//! route to a [`HandlerInvoker`] supplied by the application, which decides what
//! the reference means. [`HandlerRegistry`] is the in-memory invoker used by the
//! CLI and the tests: a name-keyed table of closures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::request::Request;
use crate::response::Response;

/// Opaque reference to the code that produces a response for a route
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerRef {
    /// A closure registered under an id
    Closure {
        /// Registry id of the closure
        id: String,
    },
    /// A method on a named type, written `Type@method`
    Named {
        /// Type (controller) name
        type_name: String,
        /// Method name
        method: String,
    },
    /// A path-like callable, written `a::b::c`
    Callable {
        /// Path segments
        parts: Vec<String>,
    },
}

impl HandlerRef {
    pub fn closure(id: impl Into<String>) -> Self {
        HandlerRef::Closure { id: id.into() }
    }

    pub fn named(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        HandlerRef::Named {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    pub fn callable<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HandlerRef::Callable {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the textual form used by route manifests
    ///
    /// `Type@method` is a named handler, `a::b` a callable, anything else a closure id.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if let Some((type_name, method)) = value.split_once('@') {
            if !type_name.is_empty() && !method.is_empty() {
                return Self::named(type_name, method);
            }
        }
        if value.contains("::") {
            return Self::callable(value.split("::").filter(|p| !p.is_empty()));
        }
        Self::closure(value)
    }

    /// Key under which an invoker looks this handler up (the textual form)
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            HandlerRef::Closure { id } => id.clone(),
            HandlerRef::Named { type_name, method } => format!("{type_name}@{method}"),
            HandlerRef::Callable { parts } => parts.join("::"),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for HandlerRef {
    fn from(value: &str) -> Self {
        HandlerRef::parse(value)
    }
}

impl From<String> for HandlerRef {
    fn from(value: String) -> Self {
        HandlerRef::parse(&value)
    }
}

/// Anything that turns a request into a response
///
/// Implemented for plain closures so terminal handlers and test handlers can be
/// written inline.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> Response;
}

impl<F> RequestHandler for F
where
    F: Fn(Request) -> Response + Send + Sync,
{
    fn handle(&self, request: Request) -> Response {
        self(request)
    }
}

/// Collaborator that executes the handler a route points at
pub trait HandlerInvoker: Send + Sync {
    fn invoke(&self, handler: &HandlerRef, request: Request) -> Response;
}

/// Shared closure type stored in a [`HandlerRegistry`]
pub type HandlerFn = Arc<dyn Fn(Request) -> Response + Send + Sync>;

/// Name-keyed table of handler closures
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for a handler reference.
    ///
    /// If a handler with the same key already exists, it is replaced.
    pub fn register<F>(&mut self, handler: impl Into<HandlerRef>, f: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static,
    {
        let key = handler.into().key();
        if self.handlers.insert(key.clone(), Arc::new(f)).is_some() {
            warn!(handler = %key, "Replaced existing handler");
        } else {
            debug!(handler = %key, total_handlers = self.handlers.len(), "Handler registered");
        }
    }

    #[must_use]
    pub fn contains(&self, handler: &HandlerRef) -> bool {
        self.handlers.contains_key(&handler.key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &keys).finish()
    }
}

impl HandlerInvoker for HandlerRegistry {
    fn invoke(&self, handler: &HandlerRef, request: Request) -> Response {
        let key = handler.key();
        match self.handlers.get(&key) {
            Some(f) => f(request),
            None => {
                let available: Vec<&String> = self.handlers.keys().collect();
                error!(
                    request_id = %request.request_id,
                    handler = %key,
                    available_handlers = ?available,
                    "Handler not found - CRITICAL"
                );
                Response::error(500, &format!("Handler '{}' is not registered", key))
            }
        }
    }
}
