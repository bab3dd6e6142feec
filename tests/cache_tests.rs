#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::time::Duration;

use http::Method;
use routeweave::{Request, RouteCache, Router};

fn routes(router: &mut Router) {
    router.get("/", "home").unwrap();
    router.get("/users/{id}", "users.show").unwrap();
    router.post("/users", "users.store").unwrap();
    router.get("/users/{id}/posts/{post}", "posts.show").unwrap();
}

fn requests() -> Vec<(Method, &'static str)> {
    vec![
        (Method::GET, "/"),
        (Method::GET, "/users/5"),
        (Method::POST, "/users"),
        (Method::GET, "/users/5/posts/abc"),
        (Method::DELETE, "/users/5"),
        (Method::GET, "/missing"),
    ]
}

fn outcome(router: &Router, method: Method, path: &str) -> Option<(String, Vec<(String, String)>)> {
    let result = router.dispatch(&Request::new(method, path));
    result.route().map(|route| {
        (
            route.handler().key(),
            result
                .params()
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    })
}

#[test]
fn test_cached_dispatch_matches_live_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("routes.json");

    let mut live = Router::new();
    routes(&mut live);
    let mut cached = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    routes(&mut cached);

    // cold: live match, then the table is written
    for (method, uri) in requests() {
        assert_eq!(outcome(&live, method.clone(), uri), outcome(&cached, method, uri));
    }
    assert!(path.exists());

    // warm: served from the stored table
    for (method, uri) in requests() {
        assert_eq!(outcome(&live, method.clone(), uri), outcome(&cached, method, uri));
    }
    let stats = cached.cache_stats().unwrap();
    assert!(stats.hits > 0);
    assert!(stats.size_bytes > 0);
}

#[test]
fn test_garbage_cache_degrades_to_live_matching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    fs::write(&path, "\u{0}\u{1}garbage").unwrap();

    let mut live = Router::new();
    routes(&mut live);
    let mut cached = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    routes(&mut cached);

    for (method, uri) in requests() {
        assert_eq!(outcome(&live, method.clone(), uri), outcome(&cached, method, uri));
    }
    assert!(cached.cache_stats().unwrap().misses >= 1);
}

#[test]
fn test_expired_cache_is_not_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    let mut router = Router::new().with_cache(RouteCache::new(&path, Duration::ZERO));
    routes(&mut router);
    assert!(router.warm_cache());

    std::thread::sleep(Duration::from_millis(1100));
    assert!(!router.cache().unwrap().is_valid());
    assert_eq!(
        outcome(&router, Method::GET, "/users/1").map(|(h, _)| h),
        Some("users.show".to_string())
    );
}

#[test]
fn test_routes_added_after_warming_are_matched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    let mut router = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    routes(&mut router);
    assert!(router.warm_cache());

    router.get("/late", "late").unwrap();
    assert_eq!(
        outcome(&router, Method::GET, "/late").map(|(h, _)| h),
        Some("late".to_string())
    );
}

#[test]
fn test_unusable_cache_counts_every_fallback_as_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let path = blocker.join("routes.json");

    let mut router = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    routes(&mut router);
    assert!(!router.warm_cache());

    for _ in 0..3 {
        assert_eq!(
            outcome(&router, Method::GET, "/users/7").map(|(h, _)| h),
            Some("users.show".to_string())
        );
    }
    let stats = router.cache_stats().unwrap();
    assert_eq!(stats.hits, 0);
    assert!(stats.misses >= 3, "{stats:?}");
    assert!(!path.exists());
}
