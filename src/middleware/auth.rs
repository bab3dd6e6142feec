use tracing::warn;

use super::{Configurable, Middleware, MiddlewareBase};
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;

/// Attribute holding the bearer token accepted by [`AuthMiddleware`]
pub const AUTH_TOKEN_ATTR: &str = "auth.token";

/// Bearer-token gate
///
/// Rejects requests whose `Authorization` header does not carry one of the
/// accepted tokens with `401` and never calls the rest of the chain. The
/// accepted token is recorded on the request under [`AUTH_TOKEN_ATTR`].
#[derive(Debug)]
pub struct AuthMiddleware {
    base: MiddlewareBase,
    tokens: Vec<String>,
}

impl AuthMiddleware {
    /// Accept a single token
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_tokens([token.into()])
    }

    /// Accept any of `tokens`
    pub fn with_tokens<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        Self {
            base: MiddlewareBase::new("auth").priority_of(10),
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Use a different manager key than `auth`
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.base = MiddlewareBase::with_settings(name, self.base.settings());
        self
    }

    fn bearer(request: &Request) -> Option<&str> {
        let header = request.header("authorization")?;
        let (scheme, token) = header.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
    }
}

impl Middleware for AuthMiddleware {
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

    fn process(&self, mut request: Request, next: &dyn RequestHandler) -> Response {
        match Self::bearer(&request).filter(|t| self.tokens.iter().any(|known| known == t)) {
            Some(token) => {
                let token = token.to_string();
                request.set_attribute(AUTH_TOKEN_ATTR, token);
                next.handle(request)
            }
            None => {
                warn!(
                    request_id = %request.request_id,
                    path = %request.path,
                    "Rejected request without a valid bearer token"
                );
                let mut resp = Response::error(401, "Unauthorized");
                resp.set_header("www-authenticate", "Bearer".to_string());
                resp
            }
        }
    }
}
