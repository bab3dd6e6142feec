//! # routeweave
//!
//! **routeweave** is an HTTP request-routing and middleware-execution engine meant
//! to be embedded in a larger web application. It matches requests against a
//! registered route table, extracts path parameters, and runs an ordered
//! "onion" of middleware around an opaque handler.
//!
//! ## Overview
//!
//! - Routes pair a method set and a `{name}` path template with a [`HandlerRef`]
//! - Templates compile once into anchored regexes; matching is first-match-wins
//!   in registration order
//! - Named routes generate URLs (the inverse of matching)
//! - Global middleware are ordered by priority; route middleware are attached per
//!   route, by instance or by alias
//! - Aliases are resolved through a dependency [`container`] at dispatch time
//! - The compiled route table can be persisted in a TTL-bound [`cache`], which
//!   degrades to live matching on any problem
//!
//! ## Architecture
//!
//! - **[`router`]** - Templates, routes, the route collection and the [`Router`]
//! - **[`cache`]** - Durable compiled route table
//! - **[`middleware`]** - The [`Middleware`](middleware::Middleware) trait, the manager and built-ins
//! - **[`dispatcher`]** - Builds the onion chain
//! - **[`resolver`]** - Alias registry and middleware resolution
//! - **[`service`]** - [`RoutingService`]: router + resolver + handler invoker
//! - **[`manifest`]** - Routes declared in YAML, JSON or TOML
//! - **[`config`]** / **[`logging`]** - Environment and file configuration, `tracing` setup
//! - **[`cli`]** - The `routeweave` binary
//!
//! ## Request Flow
//!
//! ```text
//! Request
//!   └─ Router::dispatch ──no match──> 405 (path known) / 404
//!        └─ attributes: route.name, route.pattern, route.params
//!        └─ MiddlewareResolver::resolve_multiple(route middleware)
//!        └─ global middleware (priority order)
//!             └─ route middleware (attachment order)
//!                  └─ HandlerInvoker::invoke(handler)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use routeweave::container::ServiceContainer;
//! use routeweave::handler::HandlerRegistry;
//! use routeweave::resolver::{AliasRegistry, MiddlewareResolver};
//! use routeweave::{Request, Response, Router, RoutingService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::new();
//! router.get("/posts/{id}", "posts.show")?.name("posts.show")?;
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("posts.show", |req: Request| {
//!     Response::text(200, &format!("post {}", req.path))
//! });
//!
//! let resolver = MiddlewareResolver::new(
//!     Arc::new(ServiceContainer::new()),
//!     AliasRegistry::with_defaults(),
//! );
//! let service = RoutingService::new(router, resolver, Arc::new(handlers));
//!
//! let resp = service.handle(Request::new(Method::GET, "/posts/42"))?;
//! assert_eq!(resp.status, 200);
//! let resp = service.handle(Request::new(Method::DELETE, "/posts/42"))?;
//! assert_eq!(resp.status, 405);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod manifest;
pub mod middleware;
pub mod request;
pub mod resolver;
pub mod response;
pub mod router;
pub mod service;

pub use cache::{CacheStats, RouteCache};
pub use error::{RegistrationError, ResolutionError, UrlGenerationError};
pub use handler::{HandlerInvoker, HandlerRef, RequestHandler};
pub use request::Request;
pub use response::Response;
pub use router::{GroupAttributes, Route, RouteMatchResult, Router};
pub use service::RoutingService;
