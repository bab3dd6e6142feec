use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Configurable, Middleware};
use crate::dispatcher::MiddlewareDispatcher;
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;

/// Global middleware, keyed by name
///
/// Adding a middleware whose name is already present replaces the earlier one
/// in place, keeping its insertion position. Ordering for execution is by
/// ascending priority with ties broken by insertion order.
#[derive(Clone, Default)]
pub struct MiddlewareManager {
    entries: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a middleware
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        let name = middleware.name().to_string();
        match self.entries.iter_mut().find(|m| m.name() == name) {
            Some(slot) => {
                *slot = middleware;
                debug!(middleware = %name, "Replaced global middleware");
            }
            None => {
                self.entries.push(middleware);
                debug!(
                    middleware = %name,
                    total_middleware = self.entries.len(),
                    "Global middleware registered"
                );
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Middleware>> {
        let pos = self.entries.iter().position(|m| m.name() == name)?;
        Some(self.entries.remove(pos))
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|m| m.name() == name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.iter().find(|m| m.name() == name).cloned()
    }

    /// All middleware in insertion order
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn Middleware>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending priority, stable on ties
    #[must_use]
    pub fn sorted(&self) -> Vec<Arc<dyn Middleware>> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|m| m.priority());
        sorted
    }

    /// Sorted middleware whose `should_process` accepts this request
    #[must_use]
    pub fn active(&self, request: &Request) -> Vec<Arc<dyn Middleware>> {
        self.sorted()
            .into_iter()
            .filter(|m| m.should_process(request))
            .collect()
    }

    /// Run the request through the active middleware and then `final_handler`
    pub fn process(&self, request: Request, final_handler: &dyn RequestHandler) -> Response {
        let active = self.active(&request);
        debug!(
            request_id = %request.request_id,
            registered = self.entries.len(),
            active = active.len(),
            "Global middleware selected"
        );
        MiddlewareDispatcher::dispatch(&active, final_handler, request)
    }

    /// Change priorities by name
    ///
    /// Unknown names and middleware without runtime configuration are skipped.
    /// Returns the number of middleware updated.
    pub fn set_priorities(&self, priorities: &HashMap<String, i32>) -> usize {
        let mut applied = 0;
        for (name, priority) in priorities {
            match self.configurable(name) {
                Some(config) => {
                    config.set_priority(*priority);
                    applied += 1;
                }
                None => debug!(middleware = %name, "Skipping priority update"),
            }
        }
        applied
    }

    /// Enable or disable by name, with the same skipping rules as [`set_priorities`](Self::set_priorities)
    pub fn set_states(&self, states: &HashMap<String, bool>) -> usize {
        let mut applied = 0;
        for (name, enabled) in states {
            match self.configurable(name) {
                Some(config) => {
                    config.set_enabled(*enabled);
                    applied += 1;
                }
                None => debug!(middleware = %name, "Skipping state update"),
            }
        }
        applied
    }

    fn configurable(&self, name: &str) -> Option<&dyn Configurable> {
        self.entries
            .iter()
            .find(|m| m.name() == name)
            .and_then(|m| m.configurable())
    }
}

impl fmt::Debug for MiddlewareManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|m| (m.name(), m.priority(), m.is_enabled())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareBase;
    use std::sync::Mutex;

    struct Recorder {
        base: MiddlewareBase,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &str, priority: i32, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                base: MiddlewareBase::new(name).priority_of(priority),
                log: Arc::clone(log),
            })
        }
    }

    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.base.name()
        }
        fn priority(&self) -> i32 {
            self.base.priority()
        }
        fn is_enabled(&self) -> bool {
            self.base.is_enabled()
        }
        fn configurable(&self) -> Option<&dyn Configurable> {
            Some(&self.base)
        }
        fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
            self.log.lock().unwrap().push(self.base.name().to_string());
            next.handle(request)
        }
    }

    struct Fixed(&'static str, i32);

    impl Middleware for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
            next.handle(request)
        }
    }

    fn names(list: &[Arc<dyn Middleware>]) -> Vec<&str> {
        list.iter().map(|m| m.name()).collect()
    }

    #[test]
    fn test_sorted_is_stable_on_ties() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = MiddlewareManager::new();
        manager.add(Recorder::new("A", 10, &log));
        manager.add(Recorder::new("B", 5, &log));
        manager.add(Recorder::new("C", 5, &log));
        assert_eq!(names(&manager.sorted()), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_re_adding_a_name_overwrites_in_place() {
        let mut manager = MiddlewareManager::new();
        manager.add(Arc::new(Fixed("first", 1)));
        manager.add(Arc::new(Fixed("second", 2)));
        manager.add(Arc::new(Fixed("first", 50)));
        assert_eq!(manager.len(), 2);
        assert_eq!(names(manager.all()), vec!["first", "second"]);
        assert_eq!(manager.get("first").unwrap().priority(), 50);
    }

    #[test]
    fn test_keyed_collection_api() {
        let mut manager = MiddlewareManager::new();
        assert!(manager.is_empty());
        manager.add(Arc::new(Fixed("x", 1)));
        assert!(manager.has("x"));
        assert!(!manager.has("y"));
        assert!(manager.remove("x").is_some());
        assert!(manager.remove("x").is_none());
        assert!(manager.get("x").is_none());
    }

    #[test]
    fn test_process_runs_in_priority_order_and_skips_disabled() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = MiddlewareManager::new();
        manager.add(Recorder::new("outer", 1, &log));
        manager.add(Recorder::new("off", 2, &log));
        manager.add(Recorder::new("inner", 3, &log));

        let states = HashMap::from([("off".to_string(), false)]);
        assert_eq!(manager.set_states(&states), 1);

        let req = Request::new(http::Method::GET, "/");
        let resp = manager.process(req, &|_req: Request| Response::text(200, "done"));
        assert_eq!(resp.status, 200);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_batch_updates_skip_unconfigurable_and_unknown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = MiddlewareManager::new();
        manager.add(Recorder::new("tunable", 10, &log));
        manager.add(Arc::new(Fixed("fixed", 20)));

        let priorities = HashMap::from([
            ("tunable".to_string(), 30),
            ("fixed".to_string(), 1),
            ("missing".to_string(), 0),
        ]);
        assert_eq!(manager.set_priorities(&priorities), 1);
        assert_eq!(manager.get("fixed").unwrap().priority(), 20);
        assert_eq!(names(&manager.sorted()), vec!["fixed", "tunable"]);
    }
}
