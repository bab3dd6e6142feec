//! Composition root for handling one request end to end.
//!
//! [`RoutingService`] wires a [`Router`], a [`MiddlewareResolver`] and a
//! [`HandlerInvoker`] together:
//!
//! 1. dispatch the request; no match becomes `405` (path known, method not) or `404`
//! 2. record the route name, pattern and parameters as request attributes
//! 3. resolve the route's middleware, all or nothing
//! 4. run the global middleware around the route middleware around the handler

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::dispatcher::MiddlewareDispatcher;
use crate::error::ResolutionError;
use crate::handler::HandlerInvoker;
use crate::request::{Request, ROUTE_NAME_ATTR, ROUTE_PARAMS_ATTR, ROUTE_PATTERN_ATTR};
use crate::resolver::MiddlewareResolver;
use crate::response::Response;
use crate::router::Router;

/// Router + resolver + invoker
pub struct RoutingService {
    router: Arc<Router>,
    resolver: MiddlewareResolver,
    invoker: Arc<dyn HandlerInvoker>,
}

impl RoutingService {
    pub fn new(
        router: impl Into<Arc<Router>>,
        resolver: MiddlewareResolver,
        invoker: Arc<dyn HandlerInvoker>,
    ) -> Self {
        Self {
            router: router.into(),
            resolver,
            invoker,
        }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn resolver(&self) -> &MiddlewareResolver {
        &self.resolver
    }

    /// Run one request through routing, middleware and the handler
    ///
    /// # Errors
    ///
    /// [`ResolutionError`] when a middleware attached to the matched route cannot
    /// be resolved. Nothing has run at that point.
    pub fn handle(&self, mut request: Request) -> Result<Response, ResolutionError> {
        let result = self.router.dispatch(&request);
        let Some((route, params)) = result.into_parts() else {
            let allowed = self.router.allowed_methods(&request.path);
            return Ok(if allowed.is_empty() {
                debug!(request_id = %request.request_id, path = %request.path, "Responding 404");
                Response::not_found(&request.path)
            } else {
                debug!(
                    request_id = %request.request_id,
                    method = %request.method,
                    allowed = ?allowed,
                    "Responding 405"
                );
                Response::method_not_allowed(&allowed)
            });
        };

        let params: Map<String, Value> = params
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(value.as_str())))
            .collect();
        request.set_attribute(ROUTE_NAME_ATTR, route.name().map_or(Value::Null, Value::from));
        request.set_attribute(ROUTE_PATTERN_ATTR, route.pattern());
        request.set_attribute(ROUTE_PARAMS_ATTR, Value::Object(params));

        let route_middleware = self.resolver.resolve_multiple(route.middleware())?;

        let invoker = self.invoker.as_ref();
        let handler = route.handler();
        let terminal = |req: Request| invoker.invoke(handler, req);
        let route_chain =
            |req: Request| MiddlewareDispatcher::dispatch(&route_middleware, &terminal, req);

        Ok(self
            .router
            .middleware_manager()
            .process(request, &route_chain))
    }

    /// [`handle`](Self::handle) with resolution failures turned into a `500`
    pub fn respond(&self, request: Request) -> Response {
        let request_id = request.request_id;
        self.handle(request).unwrap_or_else(|e| {
            error!(request_id = %request_id, error = %e, "Route middleware resolution failed");
            Response::error(500, "Internal Server Error")
        })
    }
}

impl std::fmt::Debug for RoutingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingService")
            .field("router", &self.router)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
