use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::cache::RouteCache;
use crate::config::RouterConfig;
use crate::container::ServiceContainer;
use crate::echo::EchoInvoker;
use crate::logging::{init_logging, LogFormat};
use crate::manifest::RouteManifest;
use crate::middleware::{AuthMiddleware, MetricsMiddleware, Middleware, TracingMiddleware};
use crate::request::Request;
use crate::resolver::{AliasRegistry, MiddlewareResolver};
use crate::router::{MiddlewareRef, Router};
use crate::service::RoutingService;

/// Command-line interface for routeweave
///
/// Inspects a route manifest: list routes, match requests, generate URLs and
/// manage the compiled route cache.
#[derive(Parser, Debug)]
#[command(name = "routeweave")]
#[command(version, about = "routeweave route table tool", long_about = None)]
pub struct Cli {
    /// Router configuration file (TOML); environment variables override it
    #[arg(long, global = true, env = "ROUTEWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every route in a manifest
    Routes {
        /// Route manifest (.yaml, .yml, .json or .toml)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Print as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show which route a request matches
    Match {
        #[arg(short, long)]
        manifest: PathBuf,

        /// HTTP method
        method: String,

        /// Request path, optionally with a query string
        uri: String,
    },
    /// Run a request through the full pipeline with echo handlers
    Handle {
        #[arg(short, long)]
        manifest: PathBuf,

        method: String,

        uri: String,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Bearer token accepted by the `auth` middleware
        #[arg(long, env = "ROUTEWEAVE_AUTH_TOKEN")]
        auth_token: Option<String>,
    },
    /// Generate the URL of a named route
    Url {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Route name
        name: String,

        /// Path parameter as `key=value` (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Query parameter as `key=value` (repeatable; repeated keys become lists)
        #[arg(short, long = "query")]
        query: Vec<String>,
    },
    /// Inspect or manage the compiled route cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Load the stored table and print its entry count, hit/miss counters and file metadata
    Stats,
    /// Delete the cache file
    Clear,
    /// Compile a manifest and write its table to the cache
    Warm {
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - The configuration or manifest cannot be loaded
/// - A route in the manifest is invalid
/// - URL generation or middleware resolution fails
/// - A cache command is used while the cache is disabled
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

/// Execute an already parsed [`Cli`]
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)?.merge_env(),
        None => RouterConfig::from_env(),
    };
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    // a second initialisation (tests, embedding) is not an error for the CLI
    if let Err(e) = init_logging(config.log_format) {
        eprintln!("Warning: {e:#}");
    }

    match cli.command {
        Commands::Routes { manifest, json } => list_routes(&config, &manifest, json),
        Commands::Match {
            manifest,
            method,
            uri,
        } => match_request(&config, &manifest, &method, &uri),
        Commands::Handle {
            manifest,
            method,
            uri,
            headers,
            auth_token,
        } => handle_request(&config, &manifest, &method, &uri, &headers, auth_token),
        Commands::Url {
            manifest,
            name,
            params,
            query,
        } => generate_url(&config, &manifest, &name, &params, &query),
        Commands::Cache { action } => cache_command(&config, action),
    }
}

/// Build a router from a manifest, with the configured cache attached
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or registered.
pub fn load_router(config: &RouterConfig, manifest: &Path) -> anyhow::Result<Router> {
    let manifest = RouteManifest::load(manifest)?;
    let mut router = Router::new();
    router.set_cache(config.build_cache());
    let added = manifest
        .apply(&mut router)
        .context("invalid route in manifest")?;
    info!(routes = added, "Router built from manifest");
    Ok(router)
}

fn list_routes(config: &RouterConfig, manifest: &Path, as_json: bool) -> anyhow::Result<()> {
    let router = load_router(config, manifest)?;
    if !as_json {
        router.dump_routes();
        return Ok(());
    }
    let routes: Vec<Value> = router
        .routes()
        .iter()
        .map(|route| {
            json!({
                "methods": route.methods().iter().map(Method::as_str).collect::<Vec<_>>(),
                "pattern": route.pattern(),
                "handler": route.handler(),
                "name": route.name(),
                "middleware": route.middleware().iter().map(MiddlewareRef::label).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&routes)?);
    Ok(())
}

fn match_request(
    config: &RouterConfig,
    manifest: &Path,
    method: &str,
    uri: &str,
) -> anyhow::Result<()> {
    let router = load_router(config, manifest)?;
    let request = Request::new(parse_method(method)?, uri);
    let result = router.dispatch(&request);
    let output = match result.route() {
        Some(route) => json!({
            "matched": true,
            "pattern": route.pattern(),
            "name": route.name(),
            "handler": route.handler(),
            "params": result.params_map(),
        }),
        None => json!({
            "matched": false,
            "allowed_methods": router
                .allowed_methods(&request.path)
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn handle_request(
    config: &RouterConfig,
    manifest: &Path,
    method: &str,
    uri: &str,
    headers: &[String],
    auth_token: Option<String>,
) -> anyhow::Result<()> {
    let router = load_router(config, manifest)?;

    let container = ServiceContainer::new();
    let metrics: Arc<dyn Middleware> = Arc::new(MetricsMiddleware::new());
    let tracing_mw: Arc<dyn Middleware> = Arc::new(TracingMiddleware::new());
    container.bind_middleware("middleware.metrics", metrics);
    container.bind_middleware("middleware.tracing", tracing_mw);
    if let Some(token) = auth_token {
        container.bind_middleware("middleware.auth", Arc::new(AuthMiddleware::new(token)));
    }
    let resolver = MiddlewareResolver::new(Arc::new(container), AliasRegistry::with_defaults());
    let service = RoutingService::new(router, resolver, Arc::new(EchoInvoker));

    let mut request = Request::new(parse_method(method)?, uri);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header must be 'name: value', got '{header}'"))?;
        request = request.with_header(name.trim(), value.trim());
    }

    let response = service.handle(request)?;
    let body = response
        .body_json()
        .unwrap_or_else(|| Value::from(String::from_utf8_lossy(&response.body).into_owned()));
    let headers: Map<String, Value> = response
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(v.as_str())))
        .collect();
    let output = json!({ "status": response.status, "headers": headers, "body": body });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn generate_url(
    config: &RouterConfig,
    manifest: &Path,
    name: &str,
    params: &[String],
    query: &[String],
) -> anyhow::Result<()> {
    let router = load_router(config, manifest)?;
    let params = parse_pairs(params, false)?;
    let query = parse_pairs(query, true)?;
    let url = router.url(name, &params, Some(&query))?;
    println!("{url}");
    Ok(())
}

fn cache_command(config: &RouterConfig, action: CacheAction) -> anyhow::Result<()> {
    let Some(cache) = config.build_cache() else {
        bail!("route cache is disabled (set ROUTEWEAVE_CACHE=on or cache_enabled = true)");
    };
    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache_report(&cache))?);
        }
        CacheAction::Clear => {
            if !cache.clear() {
                bail!("failed to clear route cache at {}", cache.path().display());
            }
            println!("cleared {}", cache.path().display());
        }
        CacheAction::Warm { manifest } => {
            let router = load_router(config, &manifest)?;
            if !router.warm_cache() {
                bail!("failed to write route cache at {}", cache.path().display());
            }
            println!(
                "wrote {} routes to {}",
                router.routes().len(),
                cache.path().display()
            );
        }
    }
    Ok(())
}

/// Validity, stored entry count, counters and file metadata of a cache
fn cache_report(cache: &RouteCache) -> Value {
    let valid = cache.is_valid();
    let entries = cache.load().map(|table| table.entries.len());
    let stats = cache.stats();
    json!({
        "path": stats.path,
        "valid": valid,
        "entries": entries,
        "hits": stats.hits,
        "misses": stats.misses,
        "last_used": stats.last_used,
        "ttl_secs": stats.ttl_secs,
        "size_bytes": stats.size_bytes,
        "created_at": stats.created_at,
    })
}

fn parse_method(method: &str) -> anyhow::Result<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))
}

/// `key=value` pairs into a JSON object; with `repeat_as_list`, repeated keys collect into arrays
fn parse_pairs(pairs: &[String], repeat_as_list: bool) -> anyhow::Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{pair}'"))?;
        let value = Value::from(value);
        match map.get_mut(key) {
            Some(Value::Array(items)) if repeat_as_list => items.push(value),
            Some(existing) if repeat_as_list => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            _ => {
                map.insert(key.to_string(), value);
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = vec!["a=1".to_string(), "b=x=y".to_string(), "a=2".to_string()];
        let last_wins = parse_pairs(&pairs, false).unwrap();
        assert_eq!(last_wins["a"], "2");
        assert_eq!(last_wins["b"], "x=y");

        let lists = parse_pairs(&pairs, true).unwrap();
        assert_eq!(lists["a"], json!(["1", "2"]));
        assert!(parse_pairs(&["nope".to_string()], false).is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert!(parse_method("G T").is_err());
    }

    #[test]
    fn test_cache_report_includes_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let ttl = std::time::Duration::from_secs(60);

        let empty = cache_report(&RouteCache::new(&path, ttl));
        assert_eq!(empty["valid"], false);
        assert_eq!(empty["entries"], Value::Null);
        assert_eq!(empty["hits"], 0);
        assert_eq!(empty["misses"], 1);

        let mut router = Router::new().with_cache(RouteCache::new(&path, ttl));
        router.get("/a", "a").unwrap();
        assert!(router.warm_cache());

        let report = cache_report(&RouteCache::new(&path, ttl));
        assert_eq!(report["valid"], true);
        assert_eq!(report["entries"], 1);
        assert_eq!(report["hits"], 1);
        assert_eq!(report["misses"], 0);
        assert!(report["last_used"].is_u64());
    }
}
