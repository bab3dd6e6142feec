//! # Middleware Module
//!
//! Cross-cutting request processing wrapped around route handlers.
//!
//! A middleware receives the request and a handler standing for the rest of the
//! chain. It may call `next.handle(request)` (optionally altering the request or
//! the response) or return its own response without calling it, which stops the
//! chain there.
//!
//! ## Ordering
//!
//! Lower priority runs earlier, i.e. further out in the onion. Global middleware
//! live in a [`MiddlewareManager`]; route middleware run inside the global ones in
//! the order they were attached.
//!
//! ## Built-in middleware
//!
//! - [`AuthMiddleware`]: bearer-token gate answering 401
//! - [`MetricsMiddleware`]: request counters and average latency
//! - [`TracingMiddleware`]: one `tracing` span per request

mod auth;
mod base;
mod core;
mod manager;
mod metrics;
mod tracing;

pub use auth::{AuthMiddleware, AUTH_TOKEN_ATTR};
pub use base::{MiddlewareBase, MiddlewareSettings, DEFAULT_PRIORITY};
pub use core::{Configurable, Middleware};
pub use manager::MiddlewareManager;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
