//! # CLI Module
//!
//! Command-line access to a route manifest and the route cache.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List every route a manifest registers:
//!
//! ```bash
//! routeweave routes --manifest routes.yaml
//! routeweave routes --manifest routes.yaml --json
//! ```
//!
//! ### `match`
//!
//! Show the route, name and parameters a request resolves to (or the methods
//! the path would accept):
//!
//! ```bash
//! routeweave match --manifest routes.yaml GET /posts/42
//! ```
//!
//! ### `handle`
//!
//! Run a request through the full pipeline (global and route middleware,
//! 404/405 mapping) with echo handlers:
//!
//! ```bash
//! routeweave handle --manifest routes.yaml GET /api/posts/42 \
//!     -H 'authorization: Bearer secret' --auth-token secret
//! ```
//!
//! ### `url`
//!
//! Generate the URL of a named route:
//!
//! ```bash
//! routeweave url --manifest routes.yaml posts.show -p id=42 -q page=2
//! ```
//!
//! ### `cache`
//!
//! ```bash
//! ROUTEWEAVE_CACHE=on routeweave cache warm --manifest routes.yaml
//! ROUTEWEAVE_CACHE=on routeweave cache stats
//! ROUTEWEAVE_CACHE=on routeweave cache clear
//! ```

mod commands;

pub use commands::{load_router, run, run_cli, CacheAction, Cli, Commands};

#[cfg(test)]
mod tests;
