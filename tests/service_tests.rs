#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use http::Method;
use routeweave::container::ServiceContainer;
use routeweave::handler::HandlerRegistry;
use routeweave::middleware::{AuthMiddleware, MetricsMiddleware, Middleware, TracingMiddleware};
use routeweave::request::{ROUTE_NAME_ATTR, ROUTE_PARAMS_ATTR, ROUTE_PATTERN_ATTR};
use routeweave::resolver::{AliasRegistry, MiddlewareResolver};
use routeweave::router::GroupAttributes;
use routeweave::{Request, ResolutionError, Response, Router, RoutingService};
use serde_json::json;

struct Fixture {
    service: RoutingService,
    metrics: Arc<MetricsMiddleware>,
}

fn fixture() -> Fixture {
    let mut router = Router::new();
    router
        .get("/posts/{id}", "PostController@show")
        .unwrap()
        .name("posts.show")
        .unwrap();
    router
        .group(GroupAttributes::new("/admin").middleware("auth"), |r| {
            r.get("/stats", "admin.stats")?;
            Ok(())
        })
        .unwrap();
    let _broken = router
        .get("/broken", "broken")
        .unwrap()
        .middleware("does.not.exist");

    let metrics = Arc::new(MetricsMiddleware::new());
    router.add_middleware(Arc::new(TracingMiddleware::new()));
    router.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>);

    let container = ServiceContainer::new();
    container.bind_middleware("jwt.auth", Arc::new(AuthMiddleware::new("secret")));
    let aliases = AliasRegistry::with_defaults();
    aliases.register_alias("auth", "jwt.auth");
    let resolver = MiddlewareResolver::new(Arc::new(container), aliases);

    let mut handlers = HandlerRegistry::new();
    handlers.register("PostController@show", |req: Request| {
        Response::json(
            200,
            &json!({
                "name": req.attribute(ROUTE_NAME_ATTR),
                "pattern": req.attribute(ROUTE_PATTERN_ATTR),
                "params": req.attribute(ROUTE_PARAMS_ATTR),
            }),
        )
    });
    handlers.register("admin.stats", |_req: Request| Response::text(200, "stats"));
    handlers.register("broken", |_req: Request| Response::text(200, "unreachable"));

    Fixture {
        service: RoutingService::new(router, resolver, Arc::new(handlers)),
        metrics,
    }
}

#[test]
fn test_matched_route_attributes_reach_the_handler() {
    let f = fixture();
    let resp = f
        .service
        .handle(Request::new(Method::GET, "/posts/42"))
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({"name": "posts.show", "pattern": "/posts/{id}", "params": {"id": "42"}})
    );
    assert!(resp.header("x-request-id").is_some());
}

#[test]
fn test_unknown_path_is_404_and_wrong_method_is_405() {
    let f = fixture();
    let resp = f.service.handle(Request::new(Method::GET, "/nope")).unwrap();
    assert_eq!(resp.status, 404);

    let resp = f
        .service
        .handle(Request::new(Method::DELETE, "/posts/42"))
        .unwrap();
    assert_eq!(resp.status, 405);
    assert_eq!(resp.header("allow"), Some("GET"));
}

#[test]
fn test_route_middleware_can_short_circuit() {
    let f = fixture();
    let resp = f
        .service
        .handle(Request::new(Method::GET, "/admin/stats"))
        .unwrap();
    assert_eq!(resp.status, 401);

    let resp = f
        .service
        .handle(
            Request::new(Method::GET, "/admin/stats").with_header("Authorization", "Bearer secret"),
        )
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_str(), Some("stats"));

    // global metrics wrap route middleware, so the 401 was observed too
    assert_eq!(f.metrics.request_count(), 2);
    assert_eq!(f.metrics.auth_failures(), 1);
}

#[test]
fn test_unresolvable_route_middleware_aborts_the_request() {
    let f = fixture();
    let err = f
        .service
        .handle(Request::new(Method::GET, "/broken"))
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Unresolved { .. }));
    assert_eq!(f.metrics.request_count(), 0);

    let resp = f.service.respond(Request::new(Method::GET, "/broken"));
    assert_eq!(resp.status, 500);
}

#[test]
fn test_unregistered_handler_is_500() {
    let mut router = Router::new();
    router.get("/x", "missing.handler").unwrap();
    let resolver = MiddlewareResolver::new(Arc::new(ServiceContainer::new()), AliasRegistry::new());
    let service = RoutingService::new(router, resolver, Arc::new(HandlerRegistry::new()));
    let resp = service.handle(Request::new(Method::GET, "/x")).unwrap();
    assert_eq!(resp.status, 500);
}
