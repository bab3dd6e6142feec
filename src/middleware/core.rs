use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;

/// A request/response interceptor in the onion chain
///
/// `process` receives the request and a handler representing everything after
/// this middleware. Calling `next.handle(request)` continues the chain;
/// returning a response without calling it short-circuits every later
/// middleware and the route handler.
pub trait Middleware: Send + Sync {
    /// Unique key within a [`MiddlewareManager`](super::MiddlewareManager)
    fn name(&self) -> &str;

    /// Lower runs earlier (further out)
    fn priority(&self) -> i32 {
        super::base::DEFAULT_PRIORITY
    }

    fn is_enabled(&self) -> bool {
        true
    }

    /// Evaluated for every request before the chain is built
    fn should_process(&self, _request: &Request) -> bool {
        self.is_enabled()
    }

    fn process(&self, request: Request, next: &dyn RequestHandler) -> Response;

    /// Runtime priority/enable control, if this middleware supports it
    fn configurable(&self) -> Option<&dyn Configurable> {
        None
    }
}

/// Capability to change priority and enabled state at runtime
pub trait Configurable: Send + Sync {
    fn set_priority(&self, priority: i32);
    fn set_enabled(&self, enabled: bool);
}
