//! Dependency container surface used to resolve middleware by id.
//!
//! The resolver only needs `get` and `has`. Entries are type-erased; middleware
//! are stored as `Arc<dyn Middleware>` inside the `Any` so the resolver can
//! downcast them back.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::middleware::Middleware;

/// Type-erased container entry
pub type Service = Arc<dyn Any + Send + Sync>;

/// Read-only view of a dependency container
pub trait Container: Send + Sync {
    /// Look up an entry by id
    fn get(&self, id: &str) -> Option<Service>;

    fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// In-memory [`Container`] backed by a concurrent map
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    entries: Arc<DashMap<String, Service>>,
}

impl ServiceContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind any value under `id`, replacing an earlier binding
    pub fn bind<T: Any + Send + Sync>(&self, id: impl Into<String>, value: T) {
        let id = id.into();
        debug!(service = %id, "Service bound");
        self.entries.insert(id, Arc::new(value));
    }

    /// Bind a middleware under `id` so the resolver can find it
    pub fn bind_middleware(&self, id: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.bind(id, middleware);
    }

    /// Bind a middleware under its Rust type path (`std::any::type_name`)
    ///
    /// Returns the id it was bound under.
    pub fn bind_middleware_type<M: Middleware + 'static>(&self, middleware: M) -> &'static str {
        let id = std::any::type_name::<M>();
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.bind_middleware(id, middleware);
        id
    }

    /// Remove a binding, returning whether it existed
    pub fn unbind(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Container for ServiceContainer {
    fn get(&self, id: &str) -> Option<Service> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("ServiceContainer").field("ids", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_get_has() {
        let container = ServiceContainer::new();
        container.bind("answer", 42u32);
        assert!(container.has("answer"));
        assert!(!container.has("question"));
        let value = container.get("answer").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));

        let shared = container.clone();
        assert!(shared.unbind("answer"));
        assert!(container.is_empty());
    }
}
