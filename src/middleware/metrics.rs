use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Configurable, Middleware, MiddlewareBase};
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;

/// Middleware collecting request counters
///
/// All counters use atomic operations for thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count
/// - Average latency of the rest of the chain
/// - Responses by class (2xx, 4xx, 5xx)
/// - Short-circuited 401 responses
#[derive(Debug)]
pub struct MetricsMiddleware {
    base: MiddlewareBase,
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    success_count: AtomicUsize,
    client_error_count: AtomicUsize,
    server_error_count: AtomicUsize,
    auth_failures: AtomicUsize,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            base: MiddlewareBase::new("metrics").priority_of(0),
            request_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
            success_count: AtomicUsize::new(0),
            client_error_count: AtomicUsize::new(0),
            server_error_count: AtomicUsize::new(0),
            auth_failures: AtomicUsize::new(0),
        }
    }
}

impl MetricsMiddleware {
    /// Create a new metrics middleware with all counters initialized to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests processed
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency
    ///
    /// Returns zero duration if no requests have been processed yet.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// `(2xx, 4xx, 5xx)` response counts
    pub fn status_counts(&self) -> (usize, usize, usize) {
        (
            self.success_count.load(Ordering::Relaxed),
            self.client_error_count.load(Ordering::Relaxed),
            self.server_error_count.load(Ordering::Relaxed),
        )
    }

    /// Get the total number of authentication failures
    pub fn auth_failures(&self) -> usize {
        self.auth_failures.load(Ordering::Relaxed)
    }

    fn record(&self, status: u16, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        let counter = match status {
            200..=399 => &self.success_count,
            400..=499 => &self.client_error_count,
            _ => &self.server_error_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if status == 401 {
            self.auth_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Passive: never blocks requests, only observes the response on the way out.
impl Middleware for MetricsMiddleware {
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
        let start = Instant::now();
        let resp = next.handle(request);
        self.record(resp.status, start.elapsed());
        resp
    }
}
