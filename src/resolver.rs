//! Middleware alias resolution.
//!
//! Routes and manifests refer to middleware by short strings (`"auth"`). The
//! [`MiddlewareResolver`] turns those into instances: the string is mapped
//! through the [`AliasRegistry`], looked up in a [`Container`], and, when that
//! fails and the string looks like a Rust type path, looked up again under the
//! original string.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error};

use crate::container::{Container, Service};
use crate::error::ResolutionError;
use crate::middleware::Middleware;
use crate::router::MiddlewareRef;

/// `Ident(::Ident)*`, the shape of `std::any::type_name` for plain types
#[allow(clippy::expect_used)]
static TYPE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("type path regex should be valid")
});

/// Default aliases for the built-in middleware
pub const DEFAULT_ALIASES: [(&str, &str); 3] = [
    ("auth", "middleware.auth"),
    ("metrics", "middleware.metrics"),
    ("trace", "middleware.tracing"),
];

/// Shared, runtime-mutable alias table
///
/// Clones share the same table, so an alias registered through one handle is
/// seen by every resolver holding another.
#[derive(Clone, Default)]
pub struct AliasRegistry {
    aliases: Arc<DashMap<String, String>>,
}

impl AliasRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with [`DEFAULT_ALIASES`]
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (alias, target) in DEFAULT_ALIASES {
            registry.register_alias(alias, target);
        }
        registry
    }

    /// Map `alias` to a container id, replacing an earlier mapping
    pub fn register_alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        let (alias, target) = (alias.into(), target.into());
        debug!(alias = %alias, target = %target, "Middleware alias registered");
        self.aliases.insert(alias, target);
    }

    /// Target of `alias`, or `None` if it is not an alias
    #[must_use]
    pub fn resolve_alias(&self, alias: &str) -> Option<String> {
        self.aliases.get(alias).map(|target| target.value().clone())
    }

    /// Snapshot of every alias, sorted by alias
    #[must_use]
    pub fn aliases(&self) -> Vec<(String, String)> {
        let mut all: Vec<(String, String)> = self
            .aliases
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort();
        all
    }
}

impl fmt::Debug for AliasRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.aliases()).finish()
    }
}

/// Turns [`MiddlewareRef`]s into middleware instances
#[derive(Clone)]
pub struct MiddlewareResolver {
    container: Arc<dyn Container>,
    aliases: AliasRegistry,
}

impl MiddlewareResolver {
    pub fn new(container: Arc<dyn Container>, aliases: AliasRegistry) -> Self {
        Self { container, aliases }
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Resolve one reference; instances pass through untouched
    ///
    /// # Errors
    ///
    /// [`ResolutionError`] when the name is unbound or bound to something else.
    pub fn resolve(&self, middleware: &MiddlewareRef) -> Result<Arc<dyn Middleware>, ResolutionError> {
        match middleware {
            MiddlewareRef::Instance(mw) => Ok(Arc::clone(mw)),
            MiddlewareRef::Alias(value) => self.resolve_name(value),
        }
    }

    /// Resolve a string: alias target first, then the original string as a type path
    ///
    /// # Errors
    ///
    /// [`ResolutionError`] when the name is unbound or bound to something else.
    pub fn resolve_name(&self, value: &str) -> Result<Arc<dyn Middleware>, ResolutionError> {
        let resolved = self
            .aliases
            .resolve_alias(value)
            .unwrap_or_else(|| value.to_string());

        let found = match self.container.get(&resolved) {
            Some(service) => Some((resolved.as_str(), service)),
            None if resolved != value && TYPE_PATH.is_match(value) => {
                self.container.get(value).map(|service| (value, service))
            }
            None => None,
        };

        let Some((id, service)) = found else {
            error!(middleware = %value, resolved = %resolved, "Middleware could not be resolved");
            return Err(ResolutionError::Unresolved {
                value: value.to_string(),
                resolved: resolved.clone(),
            });
        };

        match downcast_middleware(&service) {
            Some(mw) => {
                debug!(middleware = %value, id = %id, resolved_name = %mw.name(), "Middleware resolved");
                Ok(mw)
            }
            None => {
                error!(middleware = %value, id = %id, "Container entry is not a middleware");
                Err(ResolutionError::NotMiddleware {
                    value: value.to_string(),
                    id: id.to_string(),
                })
            }
        }
    }

    /// Resolve a list in order; the first failure aborts the whole list
    ///
    /// # Errors
    ///
    /// The first [`ResolutionError`] encountered.
    pub fn resolve_multiple(
        &self,
        middleware: &[MiddlewareRef],
    ) -> Result<Vec<Arc<dyn Middleware>>, ResolutionError> {
        middleware.iter().map(|m| self.resolve(m)).collect()
    }
}

impl fmt::Debug for MiddlewareResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareResolver")
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

fn downcast_middleware(service: &Service) -> Option<Arc<dyn Middleware>> {
    service.downcast_ref::<Arc<dyn Middleware>>().map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceContainer;
    use crate::middleware::{AuthMiddleware, MetricsMiddleware};

    fn resolver() -> (ServiceContainer, MiddlewareResolver) {
        let container = ServiceContainer::new();
        let resolver = MiddlewareResolver::new(
            Arc::new(container.clone()),
            AliasRegistry::with_defaults(),
        );
        (container, resolver)
    }

    #[test]
    fn test_alias_resolves_through_container() {
        let (container, resolver) = resolver();
        container.bind_middleware("jwt.auth", Arc::new(AuthMiddleware::new("secret")));
        resolver.aliases().register_alias("auth", "jwt.auth");

        let mw = resolver.resolve_name("auth").unwrap();
        assert_eq!(mw.name(), "auth");
    }

    #[test]
    fn test_unknown_name_fails() {
        let (_container, resolver) = resolver();
        let err = resolver.resolve_name("nope").err().unwrap();
        assert_eq!(
            err,
            ResolutionError::Unresolved {
                value: "nope".to_string(),
                resolved: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_type_path_fallback() {
        let (container, resolver) = resolver();
        let id = container.bind_middleware_type(MetricsMiddleware::new());
        resolver.aliases().register_alias(id, "not.bound");

        let mw = resolver.resolve_name(id).unwrap();
        assert_eq!(mw.name(), "metrics");
    }

    #[test]
    fn test_non_middleware_entry_fails() {
        let (container, resolver) = resolver();
        container.bind("middleware.metrics", "just a string");
        let err = resolver.resolve_name("metrics").err().unwrap();
        assert!(matches!(err, ResolutionError::NotMiddleware { ref id, .. } if id == "middleware.metrics"));
    }

    #[test]
    fn test_resolve_multiple_is_all_or_nothing() {
        let (container, resolver) = resolver();
        container.bind_middleware("middleware.metrics", Arc::new(MetricsMiddleware::new()));
        let refs = [
            MiddlewareRef::from("metrics"),
            MiddlewareRef::from("missing"),
        ];
        assert!(resolver.resolve_multiple(&refs).is_err());
        assert_eq!(resolver.resolve_multiple(&refs[..1]).unwrap().len(), 1);
    }

    #[test]
    fn test_instances_pass_through() {
        let (_container, resolver) = resolver();
        let instance: Arc<dyn Middleware> = Arc::new(MetricsMiddleware::new());
        let resolved = resolver
            .resolve(&MiddlewareRef::Instance(Arc::clone(&instance)))
            .unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
    }
}
