use std::time::Instant;

use tracing::{field, info, info_span};

use super::{Configurable, Middleware, MiddlewareBase};
use crate::handler::RequestHandler;
use crate::ids::REQUEST_ID_HEADER;
use crate::request::{Request, ROUTE_NAME_ATTR, ROUTE_PATTERN_ATTR};
use crate::response::Response;

/// Wraps the rest of the chain in a `request` span
///
/// Records status and latency on the span and echoes the request id back in an
/// `x-request-id` response header.
#[derive(Debug)]
pub struct TracingMiddleware {
    base: MiddlewareBase,
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self {
            base: MiddlewareBase::new("tracing").priority_of(1),
        }
    }
}

impl TracingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn priority(&self) -> i32 {
        self.base.priority()
    }

    fn is_enabled(&self) -> bool {
        self.base.is_enabled()
    }

    fn configurable(&self) -> Option<&dyn Configurable> {
        Some(&self.base)
    }

    fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
        let request_id = request.request_id;
        let route = request
            .attribute(ROUTE_NAME_ATTR)
            .and_then(|v| v.as_str())
            .or_else(|| request.attribute(ROUTE_PATTERN_ATTR).and_then(|v| v.as_str()))
            .unwrap_or("-")
            .to_string();
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            route = %route,
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let _entered = span.enter();

        let start = Instant::now();
        let mut resp = next.handle(request);
        let latency_ms = start.elapsed().as_millis() as u64;

        span.record("status", resp.status);
        span.record("latency_ms", latency_ms);
        info!(status = resp.status, latency_ms, "Request completed");

        if resp.header(REQUEST_ID_HEADER).is_none() {
            resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
        }
        resp
    }
}
