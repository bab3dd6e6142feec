//! # Dispatcher Module
//!
//! Builds the onion: an ordered middleware list and a terminal handler become a
//! single [`RequestHandler`](crate::handler::RequestHandler).
//!
//! ## Request Flow
//!
//! 1. The first middleware receives the request and a handler for the rest
//! 2. Each middleware either calls that handler or answers on its own
//! 3. The terminal handler runs only if every middleware passed the request on
//! 4. The response travels back out through the same middleware in reverse
//!
//! Chains borrow their middleware and are dropped after one request, so a
//! per-route middleware set costs one small allocation per link.

mod core;

pub use core::MiddlewareDispatcher;
