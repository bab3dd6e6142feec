//! Router core: registration, group scopes and the dispatch hot path.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use http::Method;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::collection::RouteCollection;
use super::matching::RouteMatchResult;
use super::route::{MiddlewareRef, Route};
use super::table::LoadedTable;
use crate::cache::{CacheStats, RouteCache};
use crate::error::{RegistrationError, UrlGenerationError};
use crate::handler::HandlerRef;
use crate::middleware::{Middleware, MiddlewareManager};
use crate::request::Request;

/// Methods registered by [`Router::any`]
pub const ANY_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"];

/// Seconds between two attempts to persist the compiled table
const STORE_RETRY_SECS: u64 = 5;

/// Prefix, name prefix and middleware applied to every route registered in a group
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: String,
    name_prefix: String,
    middleware: Vec<MiddlewareRef>,
}

impl GroupAttributes {
    /// Group rooted at `prefix` (e.g. `/api`)
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            ..Self::default()
        }
    }

    /// Prepended to the names given to routes inside the group
    #[must_use]
    pub fn name_prefix(mut self, name_prefix: impl Into<String>) -> Self {
        self.name_prefix = name_prefix.into();
        self
    }

    /// Attached to every route inside the group, before the route's own middleware
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Effective scope while a group closure runs (outer scopes already merged in)
#[derive(Debug, Clone, Default)]
struct GroupScope {
    prefix: String,
    name_prefix: String,
    middleware: Vec<MiddlewareRef>,
}

impl GroupScope {
    fn nest(&self, attrs: GroupAttributes) -> Self {
        let mut middleware = self.middleware.clone();
        middleware.extend(attrs.middleware);
        Self {
            prefix: format!("{}{}", self.prefix, attrs.prefix),
            name_prefix: format!("{}{}", self.name_prefix, attrs.name_prefix),
            middleware,
        }
    }

    fn join(&self, pattern: &str) -> String {
        if self.prefix.is_empty() {
            return pattern.to_string();
        }
        let rest = pattern.trim_start_matches('/');
        if rest.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, rest)
        }
    }
}

/// Handle returned by registration calls for fluent naming and middleware
///
/// Every call stores a new [`Route`] value in place of the previous one.
pub struct RouteRegistration<'a> {
    router: &'a mut Router,
    index: usize,
    name_prefix: String,
}

impl RouteRegistration<'_> {
    /// Name the route (the enclosing groups' name prefixes are prepended)
    ///
    /// # Errors
    ///
    /// [`RegistrationError::DuplicateName`] if another route already uses the name.
    /// The route being registered is then removed again.
    pub fn name(mut self, name: &str) -> Result<Self, RegistrationError> {
        let full = format!("{}{}", self.name_prefix, name);
        if let Some(existing) = self.router.routes.position_by_name(&full) {
            if existing != self.index {
                self.router.routes.remove(self.index);
                self.router.invalidate();
                warn!(
                    route_index = self.index,
                    route_name = %full,
                    "Route rejected: name already registered"
                );
                return Err(RegistrationError::DuplicateName { name: full });
            }
        }
        debug!(route_index = self.index, route_name = %full, "Route named");
        self.update(|route| route.to_builder().name(full).build());
        Ok(self)
    }

    /// Append a middleware to the route
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        let middleware = middleware.into();
        self.update(|route| route.to_builder().middleware(middleware).build());
        self
    }

    /// Append several middleware in order
    #[must_use]
    pub fn middlewares<I, M>(self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        middleware.into_iter().fold(self, |reg, m| reg.middleware(m))
    }

    /// The route as currently stored
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.router.routes.get(self.index)
    }

    /// Registration index (match order)
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    fn update(&mut self, f: impl FnOnce(&Route) -> Route) {
        if let Some(current) = self.router.routes.get(self.index).cloned() {
            self.router.routes.replace(self.index, f(&current));
        }
    }
}

/// Ordered route registry plus the global middleware and an optional route cache
///
/// Routes are matched in registration order; the first match wins. When a
/// [`RouteCache`] is attached, dispatch consults the persisted compiled table
/// first and falls back to the live collection on any cache problem, so a
/// broken cache changes performance, never results.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use routeweave::{Request, Router};
///
/// let mut router = Router::new();
/// router.get("/posts/{id}", "posts.show").unwrap().name("posts.show").unwrap();
///
/// let result = router.dispatch(&Request::new(Method::GET, "/posts/42"));
/// assert_eq!(result.param("id"), Some("42"));
/// ```
pub struct Router {
    routes: RouteCollection,
    scopes: Vec<GroupScope>,
    middleware: MiddlewareManager,
    cache: Option<RouteCache>,
    /// Compiled table loaded from the cache, reused while its fingerprint matches
    table: ArcSwapOption<LoadedTable>,
    /// Unix seconds of the last cache write attempt, 0 when none since the last change
    last_store_attempt: AtomicU64,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            routes: RouteCollection::new(),
            scopes: Vec::new(),
            middleware: MiddlewareManager::new(),
            cache: None,
            table: ArcSwapOption::empty(),
            last_store_attempt: AtomicU64::new(0),
        }
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a route cache
    #[must_use]
    pub fn with_cache(mut self, cache: RouteCache) -> Self {
        self.set_cache(Some(cache));
        self
    }

    /// Attach, replace or remove the route cache
    pub fn set_cache(&mut self, cache: Option<RouteCache>) {
        self.cache = cache;
        self.invalidate();
    }

    #[must_use]
    pub fn cache(&self) -> Option<&RouteCache> {
        self.cache.as_ref()
    }

    pub fn get(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["GET"], pattern, handler)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["POST"], pattern, handler)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["PUT"], pattern, handler)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["PATCH"], pattern, handler)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["DELETE"], pattern, handler)
    }

    pub fn options(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["OPTIONS"], pattern, handler)
    }

    pub fn head(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(["HEAD"], pattern, handler)
    }

    /// Register a route for every method in [`ANY_METHODS`]
    pub fn any(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError> {
        self.map(ANY_METHODS, pattern, handler)
    }

    /// Register a route for an explicit method set
    ///
    /// The pattern is joined onto the prefix of the enclosing groups and the
    /// groups' middleware is attached ahead of anything added later.
    ///
    /// # Errors
    ///
    /// [`RegistrationError`] for an empty or invalid method set or a malformed pattern.
    pub fn map<I, S>(
        &mut self,
        methods: I,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteRegistration<'_>, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scope = self.scopes.last().cloned().unwrap_or_default();
        let full_pattern = scope.join(pattern);
        let route = Route::builder(methods, &full_pattern, handler)?
            .replace_middleware(scope.middleware)
            .build();

        info!(
            route = %route.signature(),
            handler = %route.handler(),
            "Route registered"
        );
        let index = self.routes.add(route);
        self.invalidate();

        Ok(RouteRegistration {
            router: self,
            index,
            name_prefix: scope.name_prefix,
        })
    }

    /// Register routes inside a group scope
    ///
    /// Nested groups concatenate prefixes and name prefixes and append middleware.
    /// The scope is popped even when the closure fails.
    ///
    /// # Errors
    ///
    /// Whatever the closure returns.
    pub fn group<F>(&mut self, attrs: GroupAttributes, f: F) -> Result<(), RegistrationError>
    where
        F: FnOnce(&mut Router) -> Result<(), RegistrationError>,
    {
        let scope = self.scopes.last().cloned().unwrap_or_default().nest(attrs);
        debug!(
            prefix = %scope.prefix,
            name_prefix = %scope.name_prefix,
            middleware = scope.middleware.len(),
            "Entering route group"
        );
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Add a global middleware
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.add(middleware);
    }

    #[must_use]
    pub fn middleware_manager(&self) -> &MiddlewareManager {
        &self.middleware
    }

    pub fn middleware_manager_mut(&mut self) -> &mut MiddlewareManager {
        &mut self.middleware
    }

    #[must_use]
    pub fn routes(&self) -> &RouteCollection {
        &self.routes
    }

    /// Find the route for a request
    ///
    /// First match in registration order. Uses the cached compiled table when the
    /// cache is valid and was built from this route set, otherwise the live
    /// collection (writing a fresh table to the cache afterwards).
    #[must_use]
    pub fn dispatch(&self, request: &Request) -> RouteMatchResult {
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            "Route match attempt"
        );
        let match_start = Instant::now();

        let (result, source) = match self.cached_table() {
            Some(table) => (self.match_cached(&table, request), "cache"),
            None => {
                let result = self.match_live(request);
                self.persist_table();
                (result, "live")
            }
        };

        let match_duration = match_start.elapsed();
        match result.route() {
            Some(route) if match_duration > Duration::from_millis(1) => warn!(
                request_id = %request.request_id,
                route = %route.pattern(),
                duration_us = match_duration.as_micros(),
                source,
                "Slow route matching detected"
            ),
            Some(route) => debug!(
                request_id = %request.request_id,
                route = %route.pattern(),
                route_name = route.name().unwrap_or("-"),
                path_params = ?result.params(),
                duration_us = match_duration.as_micros(),
                source,
                "Route matched"
            ),
            None => debug!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                duration_us = match_duration.as_micros(),
                source,
                "No route matched"
            ),
        }
        result
    }

    /// Methods of every route whose pattern matches `path`, in registration order
    ///
    /// Empty when no pattern matches, which distinguishes 404 from 405.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        for route in self.routes.iter() {
            if route.matches_path(path).is_matched() {
                for method in route.methods() {
                    if !allowed.contains(method) {
                        allowed.push(method.clone());
                    }
                }
            }
        }
        allowed
    }

    /// Generate a URL for a named route
    ///
    /// # Errors
    ///
    /// [`UrlGenerationError::UnknownRoute`] for an unknown name, otherwise
    /// whatever [`Route::generate_url`] reports.
    pub fn url(
        &self,
        name: &str,
        params: &Map<String, Value>,
        query: Option<&Map<String, Value>>,
    ) -> Result<String, UrlGenerationError> {
        let route = self
            .routes
            .find_by_name(name)
            .ok_or_else(|| UrlGenerationError::UnknownRoute {
                name: name.to_string(),
            })?;
        route.generate_url(params, query)
    }

    /// Compile the live collection and write it to the cache
    ///
    /// Returns `false` when no cache is attached or the write failed.
    pub fn warm_cache(&self) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        let compiled = self.routes.compile();
        let stored = cache.store(&compiled);
        if stored {
            match LoadedTable::from_compiled(compiled) {
                Ok(table) => self.table.store(Some(Arc::new(table))),
                Err(e) => warn!(error = %e, "Compiled route table failed to reload"),
            }
        }
        stored
    }

    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(RouteCache::stats)
    }

    /// Remove the cache file and forget the loaded table
    pub fn clear_cache(&mut self) -> bool {
        let cleared = self.cache.as_ref().is_some_and(RouteCache::clear);
        self.invalidate();
        cleared
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for route in self.routes.iter() {
            println!(
                "[route] {} -> {} name={} middleware={:?}",
                route.signature(),
                route.handler(),
                route.name().unwrap_or("-"),
                route.middleware().iter().map(MiddlewareRef::label).collect::<Vec<_>>()
            );
        }
    }

    fn match_live(&self, request: &Request) -> RouteMatchResult {
        self.routes
            .iter()
            .map(|route| route.matches(request))
            .find(RouteMatchResult::is_matched)
            .unwrap_or_else(RouteMatchResult::not_matched)
    }

    fn match_cached(&self, table: &LoadedTable, request: &Request) -> RouteMatchResult {
        let method = request.method.as_str();
        for entry in &table.entries {
            if !entry.matches_method(method) {
                continue;
            }
            let Some(params) = entry.matcher.captures(&request.path) else {
                continue;
            };
            return match self.routes.get(entry.index) {
                Some(route) => RouteMatchResult::matched(Arc::clone(route), params),
                None => {
                    warn!(
                        route_index = entry.index,
                        routes = self.routes.len(),
                        "Cached route index out of range, matching live routes"
                    );
                    self.match_live(request)
                }
            };
        }
        RouteMatchResult::not_matched()
    }

    /// The compiled table to match against, or `None` to use the live collection
    fn cached_table(&self) -> Option<Arc<LoadedTable>> {
        let cache = self.cache.as_ref()?;
        if !cache.is_valid() {
            cache.record_invalid();
            return None;
        }
        let fingerprint = self.routes.fingerprint();
        if let Some(table) = self.table.load_full() {
            if table.fingerprint == fingerprint {
                cache.record_hit();
                return Some(table);
            }
        }
        let compiled = cache.load_matching(fingerprint)?;
        match LoadedTable::from_compiled(compiled) {
            Ok(table) => {
                let table = Arc::new(table);
                self.table.store(Some(Arc::clone(&table)));
                Some(table)
            }
            Err(e) => {
                warn!(
                    path = %cache.path().display(),
                    error = %e,
                    "Cached route table has an invalid pattern, ignoring it"
                );
                None
            }
        }
    }

    /// Write the live table after a cold match, at most once per retry window
    fn persist_table(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let last = self.last_store_attempt.load(Ordering::Relaxed);
        if last != 0 && now.saturating_sub(last) < STORE_RETRY_SECS {
            return;
        }
        if self
            .last_store_attempt
            .compare_exchange(last, now.max(1), Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        if !cache.store(&self.routes.compile()) {
            debug!(
                path = %cache.path().display(),
                retry_secs = STORE_RETRY_SECS,
                "Compiled route table not persisted, retrying after the window"
            );
        }
    }

    fn invalidate(&mut self) {
        self.table.store(None);
        *self.last_store_attempt.get_mut() = 0;
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware)
            .field("cache", &self.cache.as_ref().map(RouteCache::path))
            .finish()
    }
}

/// Leading `/`, no trailing `/`; the root prefix becomes empty
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
