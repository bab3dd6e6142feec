#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde_json::json;

use super::{GroupAttributes, MiddlewareRef, PathTemplate, Route, Router};
use crate::cache::RouteCache;
use crate::error::{RegistrationError, UrlGenerationError};
use crate::request::Request;

fn req(method: Method, path: &str) -> Request {
    Request::new(method, path)
}

#[test]
fn test_root_path() {
    let route = Arc::new(Route::new(["GET"], "/", "root").unwrap());
    assert!(route.matches_path("/").is_matched());
    assert!(!route.matches_path("/x").is_matched());
    assert!(route.param_names().is_empty());
}

#[test]
fn test_parameterized_path() {
    let route = Arc::new(Route::new(["GET"], "/items/{id}", "items.show").unwrap());
    let result = route.matches_path("/items/123");
    assert_eq!(result.param("id"), Some("123"));
    assert_eq!(route.param_names(), ["id"]);
}

#[test]
fn test_placeholder_matches_one_non_empty_segment() {
    let route = Arc::new(Route::new(["GET"], "/a/{b}/c", "h").unwrap());
    assert!(route.matches_path("/a/1/c").is_matched());
    assert!(!route.matches_path("/a//c").is_matched());
    assert!(!route.matches_path("/a/1/2/c").is_matched());
    assert!(!route.matches_path("/a/1/d").is_matched());
    assert!(!route.matches_path("/a/1").is_matched());
}

#[test]
fn test_literals_are_escaped() {
    let route = Arc::new(Route::new(["GET"], "/files/{name}.json", "h").unwrap());
    assert_eq!(
        route.matches_path("/files/report.json").param("name"),
        Some("report")
    );
    assert!(!route.matches_path("/files/reportXjson").is_matched());
}

#[test]
fn test_duplicate_param_names_last_wins() {
    let route = Arc::new(Route::new(["GET"], "/org/{id}/user/{id}", "h").unwrap());
    let result = route.matches_path("/org/1/user/2");
    assert_eq!(result.param("id"), Some("2"));
    assert_eq!(result.params().len(), 2);
}

#[test]
fn test_compilation_is_memoized() {
    let route = Route::new(["GET"], "/posts/{id}", "h").unwrap();
    let first = route.compiled();
    let second = route.compiled();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.source(), r"^/posts/([^/]+)$");
}

#[test]
fn test_trailing_slash_is_significant() {
    let route = Arc::new(Route::new(["GET"], "/posts", "h").unwrap());
    assert!(route.matches_path("/posts").is_matched());
    assert!(!route.matches_path("/posts/").is_matched());
}

#[test]
fn test_methods_are_case_insensitive() {
    let route = Arc::new(Route::new(["get", "Post"], "/x", "h").unwrap());
    assert_eq!(route.methods(), [Method::GET, Method::POST]);
    assert!(route.matches_method("GET"));
    assert!(route.matches_method("post"));
    assert!(!route.matches_method("DELETE"));
}

#[test]
fn test_method_mismatch_fails_before_path() {
    let route = Arc::new(Route::new(["GET"], "/posts/{id}", "h").unwrap());
    assert!(!route.matches(&req(Method::POST, "/posts/42")).is_matched());
    assert!(route.matches(&req(Method::GET, "/posts/42")).is_matched());
}

#[test]
fn test_malformed_patterns_are_rejected() {
    for pattern in ["posts", "/posts/{id", "/posts/id}", "/posts/{}", "/posts/{1id}", "/{a-b}"] {
        let err = Route::new(["GET"], pattern, "h").unwrap_err();
        assert!(
            matches!(err, RegistrationError::MalformedPattern { .. }),
            "{pattern}: {err:?}"
        );
    }
    assert!(matches!(
        Route::new(Vec::<&str>::new(), "/x", "h").unwrap_err(),
        RegistrationError::EmptyMethods { .. }
    ));
    assert!(matches!(
        Route::new(["GE T"], "/x", "h").unwrap_err(),
        RegistrationError::InvalidMethod { .. }
    ));
}

#[test]
fn test_template_tokens() {
    let t = PathTemplate::parse("/a/{x}/b").unwrap();
    assert_eq!(t.tokens().len(), 3);
    assert_eq!(t.as_str(), "/a/{x}/b");
}

#[test]
fn test_generate_then_match_round_trip() {
    let route = Arc::new(Route::new(["GET"], "/a/{x}/b/{y}", "h").unwrap());
    let params = json!({"x": "1", "y": "2", "unused": "z"});
    let url = route.generate_url(params.as_object().unwrap(), None).unwrap();
    assert_eq!(url, "/a/1/b/2");

    let result = route.matches_path(&url);
    assert_eq!(result.param("x"), Some("1"));
    assert_eq!(result.param("y"), Some("2"));
}

#[test]
fn test_generate_url_encodes_values_and_query() {
    let route = Route::new(["GET"], "/search/{term}", "h").unwrap();
    let params = json!({"term": "a b/c"});
    let query = json!({"tag": ["x", "y"], "page": 2});
    let url = route
        .generate_url(params.as_object().unwrap(), query.as_object())
        .unwrap();
    assert!(url.starts_with("/search/a%20b%2Fc?"), "{url}");
    assert!(url.contains("tag=x&tag=y"), "{url}");
    assert!(url.contains("page=2"), "{url}");

    let route = Arc::new(route);
    let path = url.split('?').next().unwrap();
    assert_eq!(route.matches_path(path).param("term"), Some("a b/c"));
}

#[test]
fn test_generate_url_errors() {
    let route = Route::new(["GET"], "/posts/{id}", "h").unwrap();
    let missing = json!({});
    assert!(matches!(
        route.generate_url(missing.as_object().unwrap(), None),
        Err(UrlGenerationError::MissingParameter { .. })
    ));
    let nested = json!({"id": {"a": 1}});
    assert!(matches!(
        route.generate_url(nested.as_object().unwrap(), None),
        Err(UrlGenerationError::NonScalarParameter { .. })
    ));
    let empty = json!({"id": ""});
    assert!(matches!(
        route.generate_url(empty.as_object().unwrap(), None),
        Err(UrlGenerationError::EmptyParameter { .. })
    ));
}

#[test]
fn test_with_attributes_leaves_original_untouched() {
    let route = Route::new(["GET"], "/x", "h").unwrap();
    let named = route.to_builder().name("x").middleware("auth").build();
    assert_eq!(route.name(), None);
    assert!(route.middleware().is_empty());
    assert_eq!(named.name(), Some("x"));
    assert_eq!(named.middleware()[0].as_alias(), Some("auth"));
}

#[test]
fn test_posts_scenario() {
    let mut router = Router::new();
    router.get("/posts/{id}", "posts.show").unwrap();

    let ok = router.dispatch(&req(Method::GET, "/posts/42"));
    assert_eq!(ok.params_map().get("id").map(String::as_str), Some("42"));
    assert!(!router.dispatch(&req(Method::POST, "/posts/42")).is_matched());
    assert!(!router
        .dispatch(&req(Method::GET, "/posts/42/comments"))
        .is_matched());
}

#[test]
fn test_first_registered_match_wins() {
    let mut router = Router::new();
    router.get("/users/me", "users.me").unwrap();
    router.get("/users/{id}", "users.show").unwrap();

    let result = router.dispatch(&req(Method::GET, "/users/me"));
    assert_eq!(result.route().unwrap().handler().key(), "users.me");
    let result = router.dispatch(&req(Method::GET, "/users/9"));
    assert_eq!(result.route().unwrap().handler().key(), "users.show");
}

#[test]
fn test_verb_shortcuts_and_any() {
    let mut router = Router::new();
    router.post("/p", "p.post").unwrap();
    router.delete("/p", "p.delete").unwrap();
    router.any("/all", "all").unwrap();

    assert!(router.dispatch(&req(Method::POST, "/p")).is_matched());
    assert!(router.dispatch(&req(Method::DELETE, "/p")).is_matched());
    assert!(!router.dispatch(&req(Method::GET, "/p")).is_matched());
    for method in [Method::GET, Method::PATCH, Method::OPTIONS, Method::HEAD] {
        assert!(router.dispatch(&req(method, "/all")).is_matched());
    }
}

#[test]
fn test_allowed_methods() {
    let mut router = Router::new();
    router.get("/p/{id}", "a").unwrap();
    router.map(["PUT", "GET"], "/p/{id}", "b").unwrap();
    assert_eq!(router.allowed_methods("/p/1"), [Method::GET, Method::PUT]);
    assert!(router.allowed_methods("/q").is_empty());
}

#[test]
fn test_named_urls_and_duplicates() {
    let mut router = Router::new();
    router.get("/posts/{id}", "h").unwrap().name("posts.show").unwrap();
    let err = router
        .get("/other/{id}", "h")
        .unwrap()
        .name("posts.show")
        .err();
    assert_eq!(
        err,
        Some(RegistrationError::DuplicateName {
            name: "posts.show".to_string()
        })
    );
    assert_eq!(router.routes().len(), 1);
    assert!(!router
        .dispatch(&Request::new(Method::GET, "/other/1"))
        .is_matched());

    let params = json!({"id": 5});
    assert_eq!(
        router
            .url("posts.show", params.as_object().unwrap(), None)
            .unwrap(),
        "/posts/5"
    );
    assert!(matches!(
        router.url("nope", params.as_object().unwrap(), None),
        Err(UrlGenerationError::UnknownRoute { .. })
    ));
}

#[test]
fn test_renaming_the_same_route_is_allowed() {
    let mut router = Router::new();
    let reg = router.get("/x", "h").unwrap().name("x").unwrap();
    assert!(reg.name("x").is_ok());
}

#[test]
fn test_nested_groups_merge_scope() {
    let mut router = Router::new();
    router
        .group(
            GroupAttributes::new("/api/").name_prefix("api.").middleware("auth"),
            |r| {
                r.get("/", "api.index")?.name("index")?;
                r.group(
                    GroupAttributes::new("v1").name_prefix("v1.").middleware("metrics"),
                    |r| {
                        r.get("/users/{id}", "users.show")?
                            .name("users.show")?
                            .middleware("trace");
                        Ok(())
                    },
                )
            },
        )
        .unwrap();
    router.get("/outside", "outside").unwrap();

    let index = router.routes().find_by_name("api.index").unwrap();
    assert_eq!(index.pattern(), "/api");

    let users = router.routes().find_by_name("api.v1.users.show").unwrap();
    assert_eq!(users.pattern(), "/api/v1/users/{id}");
    let labels: Vec<&str> = users.middleware().iter().map(MiddlewareRef::label).collect();
    assert_eq!(labels, ["auth", "metrics", "trace"]);

    let outside = router.routes().get(2).unwrap();
    assert_eq!(outside.pattern(), "/outside");
    assert!(outside.middleware().is_empty());
}

#[test]
fn test_group_scope_is_popped_on_error() {
    let mut router = Router::new();
    let result = router.group(GroupAttributes::new("/api"), |r| {
        r.get("bad{", "h")?;
        Ok(())
    });
    assert!(result.is_err());
    router.get("/after", "h").unwrap();
    assert_eq!(router.routes().get(0).unwrap().pattern(), "/after");
}

#[test]
fn test_corrupt_cache_dispatches_like_no_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    fs::write(&path, b"{ not json").unwrap();

    let mut plain = Router::new();
    let mut cached = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    for router in [&mut plain, &mut cached] {
        router.get("/posts/{id}", "posts.show").unwrap();
        router.post("/posts", "posts.store").unwrap();
    }

    for (method, path) in [
        (Method::GET, "/posts/42"),
        (Method::POST, "/posts"),
        (Method::GET, "/posts"),
        (Method::GET, "/nothing"),
    ] {
        let a = plain.dispatch(&req(method.clone(), path));
        let b = cached.dispatch(&req(method, path));
        assert_eq!(a.is_matched(), b.is_matched(), "{path}");
        assert_eq!(a.params(), b.params(), "{path}");
        assert_eq!(
            a.route().map(|r| r.pattern().to_string()),
            b.route().map(|r| r.pattern().to_string())
        );
    }
}

#[test]
fn test_warm_cache_serves_from_table() {
    let dir = tempfile::tempdir().unwrap();
    let cache = RouteCache::new(dir.path().join("routes.json"), Duration::from_secs(60));
    let mut router = Router::new().with_cache(cache);
    router.get("/posts/{id}", "posts.show").unwrap();

    assert!(router.warm_cache());
    let result = router.dispatch(&req(Method::GET, "/posts/3"));
    assert_eq!(result.param("id"), Some("3"));
    let stats = router.cache_stats().unwrap();
    assert!(stats.hits >= 1);

    assert!(router.clear_cache());
    assert!(!dir.path().join("routes.json").exists());
}

#[test]
fn test_stale_cache_from_other_routes_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");

    let mut first = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    first.get("/old/{id}", "old").unwrap();
    assert!(first.warm_cache());

    let mut second = Router::new().with_cache(RouteCache::new(&path, Duration::from_secs(60)));
    second.get("/new/{id}", "new").unwrap();
    assert!(second.dispatch(&req(Method::GET, "/new/1")).is_matched());
    assert!(!second.dispatch(&req(Method::GET, "/old/1")).is_matched());
}
