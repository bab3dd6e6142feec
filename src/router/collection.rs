use std::sync::{Arc, OnceLock};

use sha2::{Digest, Sha256};

use super::route::Route;
use super::table::{CompiledEntry, CompiledTable};

/// Ordered registry of routes
///
/// Registration order is match order. The collection is owned by a
/// [`Router`](super::Router); routes are stored behind `Arc` so match results
/// can hand them out without copying.
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: Vec<Arc<Route>>,
    fingerprint: OnceLock<String>,
}

impl RouteCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route, returning its index
    pub fn add(&mut self, route: Route) -> usize {
        self.routes.push(Arc::new(route));
        self.fingerprint = OnceLock::new();
        self.routes.len() - 1
    }

    /// Replace the route at `index` with a new value
    ///
    /// Returns `false` if the index is out of range.
    pub fn replace(&mut self, index: usize, route: Route) -> bool {
        match self.routes.get_mut(index) {
            Some(slot) => {
                *slot = Arc::new(route);
                self.fingerprint = OnceLock::new();
                true
            }
            None => false,
        }
    }

    /// Remove the route at `index`; later routes move up one position
    pub fn remove(&mut self, index: usize) -> Option<Arc<Route>> {
        if index >= self.routes.len() {
            return None;
        }
        self.fingerprint = OnceLock::new();
        Some(self.routes.remove(index))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Route>> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Linear scan for a named route
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.name() == Some(name))
    }

    /// Index of a named route
    #[must_use]
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.name() == Some(name))
    }

    /// Content hash of everything that affects matching (order, methods, patterns)
    ///
    /// Used to detect a cached table built from a different route set.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            let mut hasher = Sha256::new();
            for (index, route) in self.routes.iter().enumerate() {
                hasher.update(index.to_le_bytes());
                hasher.update(route.signature().as_bytes());
                hasher.update([0u8]);
            }
            hasher
                .finalize()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect()
        })
    }

    /// Compile every route and snapshot the result
    #[must_use]
    pub fn compile(&self) -> CompiledTable {
        let entries = self
            .routes
            .iter()
            .enumerate()
            .map(|(index, route)| {
                let compiled = route.compiled();
                CompiledEntry {
                    index,
                    methods: route.methods().iter().map(|m| m.to_string()).collect(),
                    pattern: route.pattern().to_string(),
                    regex: compiled.source().to_string(),
                    params: route.param_names().to_vec(),
                }
            })
            .collect();
        CompiledTable {
            fingerprint: self.fingerprint().to_string(),
            entries,
        }
    }
}
