use serde_json::json;

use crate::handler::{HandlerInvoker, HandlerRef};
use crate::request::{Request, ROUTE_PARAMS_ATTR};
use crate::response::Response;

/// Invoker that answers every handler by echoing the request back as JSON
///
/// Used by the CLI `handle` command to exercise the full pipeline without
/// application code.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoInvoker;

impl HandlerInvoker for EchoInvoker {
    fn invoke(&self, handler: &HandlerRef, request: Request) -> Response {
        Response::json(
            200,
            &json!({
                "handler": handler.key(),
                "method": request.method.as_str(),
                "path": request.path,
                "params": request.attribute(ROUTE_PARAMS_ATTR),
                "query": request.query,
                "attributes": request.attributes(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_echo_reflects_request() {
        let req = Request::new(Method::GET, "/posts/1?x=2").with_attribute("k", "v");
        let resp = EchoInvoker.invoke(&HandlerRef::named("Posts", "show"), req);
        let body = resp.body_json().unwrap();
        assert_eq!(body["handler"], "Posts@show");
        assert_eq!(body["query"], "x=2");
        assert_eq!(body["attributes"]["k"], "v");
    }
}
