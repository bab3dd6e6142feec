//! Unit tests for CLI argument parsing
#![allow(clippy::unwrap_used)]

use crate::cli::{CacheAction, Cli, Commands};
use crate::logging::LogFormat;
use clap::Parser;

#[test]
fn test_routes_command_exists() {
    let cli = Cli::try_parse_from(["routeweave", "routes", "--manifest", "routes.yaml"]).unwrap();

    match cli.command {
        Commands::Routes { manifest, json } => {
            assert_eq!(manifest.to_string_lossy(), "routes.yaml");
            assert!(!json);
        }
        _ => panic!("Expected Routes command"),
    }
}

#[test]
fn test_match_command_positionals() {
    let cli = Cli::try_parse_from(["routeweave", "match", "-m", "r.json", "GET", "/posts/1"]).unwrap();

    match cli.command {
        Commands::Match { method, uri, .. } => {
            assert_eq!(method, "GET");
            assert_eq!(uri, "/posts/1");
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_url_command_repeats_params() {
    let cli = Cli::try_parse_from([
        "routeweave",
        "url",
        "--manifest",
        "r.toml",
        "posts.show",
        "-p",
        "id=1",
        "-q",
        "tag=a",
        "-q",
        "tag=b",
    ])
    .unwrap();

    match cli.command {
        Commands::Url {
            name,
            params,
            query,
            ..
        } => {
            assert_eq!(name, "posts.show");
            assert_eq!(params, ["id=1"]);
            assert_eq!(query, ["tag=a", "tag=b"]);
        }
        _ => panic!("Expected Url command"),
    }
}

#[test]
fn test_cache_subcommands_and_global_flags() {
    let cli = Cli::try_parse_from(["routeweave", "cache", "stats", "--log-format", "json"]).unwrap();
    assert_eq!(cli.log_format, Some(LogFormat::Json));
    assert!(matches!(
        cli.command,
        Commands::Cache {
            action: CacheAction::Stats
        }
    ));

    let cli = Cli::try_parse_from(["routeweave", "cache", "warm", "-m", "r.yaml"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Cache {
            action: CacheAction::Warm { .. }
        }
    ));
}

#[test]
fn test_handle_command_headers() {
    let cli = Cli::try_parse_from([
        "routeweave",
        "handle",
        "-m",
        "r.yaml",
        "GET",
        "/x",
        "-H",
        "authorization: Bearer t",
        "--auth-token",
        "t",
    ])
    .unwrap();

    match cli.command {
        Commands::Handle {
            headers,
            auth_token,
            ..
        } => {
            assert_eq!(headers, ["authorization: Bearer t"]);
            assert_eq!(auth_token.as_deref(), Some("t"));
        }
        _ => panic!("Expected Handle command"),
    }
}

#[test]
fn test_missing_manifest_is_rejected() {
    assert!(Cli::try_parse_from(["routeweave", "routes"]).is_err());
}
