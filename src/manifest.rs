//! Declarative route manifests.
//!
//! A manifest lists routes and (nested) groups and is applied onto a [`Router`].
//! The same shape is accepted as YAML, JSON or TOML, chosen by file extension:
//!
//! ```yaml
//! routes:
//!   - name: home
//!     methods: [GET]
//!     path: /
//!     handler: HomeController@index
//! groups:
//!   - prefix: /api
//!     name_prefix: api.
//!     middleware: [auth]
//!     routes:
//!       - name: posts.show
//!         methods: [GET, HEAD]
//!         path: /posts/{id}
//!         handler: posts::show
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RegistrationError;
use crate::handler::HandlerRef;
use crate::router::{GroupAttributes, Router};

/// One route declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub methods: Vec<String>,
    pub path: String,
    /// `Type@method`, `a::b` or a closure id
    pub handler: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

/// A group of routes sharing a prefix, name prefix and middleware
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,
}

/// Top-level manifest document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

/// Serialization format of a manifest file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
    Toml,
}

impl ManifestFormat {
    /// Pick the format from a file extension (`.yaml`/`.yml`, `.json`, `.toml`)
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl RouteManifest {
    /// Parse manifest text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest in `format`.
    pub fn parse(text: &str, format: ManifestFormat) -> anyhow::Result<Self> {
        let manifest: Self = match format {
            ManifestFormat::Yaml => serde_yaml::from_str(text).context("invalid YAML manifest")?,
            ManifestFormat::Json => serde_json::from_str(text).context("invalid JSON manifest")?,
            ManifestFormat::Toml => toml::from_str(text).context("invalid TOML manifest")?,
        };
        Ok(manifest)
    }

    /// Read and parse a manifest file, choosing the format by extension
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown, the file cannot be read or
    /// its contents do not parse.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let Some(format) = ManifestFormat::from_path(path) else {
            bail!(
                "unsupported manifest extension for {} (expected .yaml, .yml, .json or .toml)",
                path.display()
            );
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&text, format).with_context(|| format!("in manifest {}", path.display()))
    }

    /// Total number of routes, groups included
    #[must_use]
    pub fn route_count(&self) -> usize {
        fn count(groups: &[GroupEntry]) -> usize {
            groups
                .iter()
                .map(|g| g.routes.len() + count(&g.groups))
                .sum()
        }
        self.routes.len() + count(&self.groups)
    }

    /// Register every route onto `router`, returning how many were added
    ///
    /// # Errors
    ///
    /// The first [`RegistrationError`]; routes registered before it stay registered.
    pub fn apply(&self, router: &mut Router) -> Result<usize, RegistrationError> {
        let before = router.routes().len();
        register_routes(router, &self.routes)?;
        register_groups(router, &self.groups)?;
        let added = router.routes().len() - before;
        info!(routes_added = added, "Route manifest applied");
        Ok(added)
    }
}

fn register_routes(router: &mut Router, routes: &[RouteEntry]) -> Result<(), RegistrationError> {
    for entry in routes {
        let registration = router
            .map(&entry.methods, &entry.path, HandlerRef::parse(&entry.handler))?
            .middlewares(entry.middleware.iter().map(String::as_str));
        if let Some(name) = &entry.name {
            registration.name(name)?;
        }
    }
    Ok(())
}

fn register_groups(router: &mut Router, groups: &[GroupEntry]) -> Result<(), RegistrationError> {
    for group in groups {
        let mut attrs = GroupAttributes::new(&group.prefix);
        if let Some(name_prefix) = &group.name_prefix {
            attrs = attrs.name_prefix(name_prefix.as_str());
        }
        for middleware in &group.middleware {
            attrs = attrs.middleware(middleware.as_str());
        }
        router.group(attrs, |r| {
            register_routes(r, &group.routes)?;
            register_groups(r, &group.groups)
        })?;
    }
    Ok(())
}
