//! # Router Module
//!
//! Path matching, route registration and URL generation for routeweave.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing and validating `{name}` path templates
//! - Compiling each template once into an anchored regex
//! - Matching incoming requests against routes in registration order
//! - Generating URLs for named routes (the inverse of matching)
//! - Persisting the compiled table through an optional [`RouteCache`](crate::cache::RouteCache)
//!
//! ## Architecture
//!
//! Matching has two phases:
//!
//! 1. **Compilation**: a template such as `/posts/{id}` becomes `^/posts/([^/]+)$`
//!    plus the ordered parameter names. Compilation happens lazily, once per route.
//!
//! 2. **Matching**: the request method is checked first, then the compiled
//!    regex; captures are zipped with parameter names into a [`ParamVec`].
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routeweave::router::{GroupAttributes, Router};
//! use routeweave::Request;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::new();
//! router.group(GroupAttributes::new("/api").name_prefix("api."), |r| {
//!     r.get("/users/{id}", "users.show")?.name("users.show")?;
//!     Ok(())
//! })?;
//!
//! let result = router.dispatch(&Request::new(Method::GET, "/api/users/7"));
//! assert_eq!(result.param("id"), Some("7"));
//!
//! let params = serde_json::json!({"id": 7});
//! let url = router.url("api.users.show", params.as_object().unwrap(), None)?;
//! assert_eq!(url, "/api/users/7");
//! # Ok(())
//! # }
//! ```

mod collection;
mod core;
mod matching;
mod pattern;
mod route;
mod table;
#[cfg(test)]
mod tests;

pub use collection::RouteCollection;
pub use core::{GroupAttributes, RouteRegistration, Router, ANY_METHODS};
pub use matching::{ParamVec, RouteMatchResult, MAX_INLINE_PARAMS};
pub use pattern::{PathTemplate, Token};
pub use route::{CompiledPattern, MiddlewareRef, Route, RouteAttributes, RouteBuilder};
pub use table::{CompiledEntry, CompiledTable};
