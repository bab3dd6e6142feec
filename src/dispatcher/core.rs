use std::sync::Arc;

use tracing::trace;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Folds an ordered middleware list and a terminal handler into one handler
///
/// Stateless: chains are rebuilt for every request because the middleware set
/// can differ per route.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiddlewareDispatcher;

impl MiddlewareDispatcher {
    /// Build the onion chain
    ///
    /// `middlewares[0]` wraps `middlewares[1]` ... wraps `final_handler`, so the
    /// first middleware runs first and each one receives a handler standing for
    /// everything after it.
    #[must_use]
    pub fn build_chain<'a>(
        middlewares: &'a [Arc<dyn Middleware>],
        final_handler: &'a dyn RequestHandler,
    ) -> Box<dyn RequestHandler + 'a> {
        let terminal: Box<dyn RequestHandler + 'a> = Box::new(Terminal(final_handler));
        middlewares.iter().rev().fold(terminal, |next, middleware| {
            Box::new(Link {
                middleware: middleware.as_ref(),
                next,
            })
        })
    }

    /// Build the chain and run `request` through it
    pub fn dispatch(
        middlewares: &[Arc<dyn Middleware>],
        final_handler: &dyn RequestHandler,
        request: Request,
    ) -> Response {
        Self::build_chain(middlewares, final_handler).handle(request)
    }
}

struct Terminal<'a>(&'a dyn RequestHandler);

impl RequestHandler for Terminal<'_> {
    fn handle(&self, request: Request) -> Response {
        trace!(request_id = %request.request_id, "Chain reached terminal handler");
        self.0.handle(request)
    }
}

struct Link<'a> {
    middleware: &'a dyn Middleware,
    next: Box<dyn RequestHandler + 'a>,
}

impl RequestHandler for Link<'_> {
    fn handle(&self, request: Request) -> Response {
        trace!(
            request_id = %request.request_id,
            middleware = %self.middleware.name(),
            "Entering middleware"
        );
        self.middleware.process(request, self.next.as_ref())
    }
}
