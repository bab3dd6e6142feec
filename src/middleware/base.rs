use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use super::core::Configurable;

/// Priority given to middleware that do not choose one
pub const DEFAULT_PRIORITY: i32 = 100;

/// Priority and enabled state of a middleware
///
/// An immutable record: changes produce a new value that is swapped in whole,
/// so readers never observe a half-applied update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiddlewareSettings {
    pub priority: i32,
    pub enabled: bool,
}

impl Default for MiddlewareSettings {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            enabled: true,
        }
    }
}

impl MiddlewareSettings {
    #[must_use]
    pub fn with_priority(self, priority: i32) -> Self {
        Self { priority, ..self }
    }

    #[must_use]
    pub fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }
}

/// Shared name/priority/enabled bookkeeping for concrete middleware
///
/// Embed it and forward `name`, `priority`, `is_enabled` and `configurable`
/// from the [`Middleware`](super::Middleware) impl:
///
/// ```rust
/// use routeweave::handler::RequestHandler;
/// use routeweave::middleware::{Configurable, Middleware, MiddlewareBase};
/// use routeweave::{Request, Response};
///
/// struct Noop {
///     base: MiddlewareBase,
/// }
///
/// impl Middleware for Noop {
///     fn name(&self) -> &str { self.base.name() }
///     fn priority(&self) -> i32 { self.base.priority() }
///     fn is_enabled(&self) -> bool { self.base.is_enabled() }
///     fn configurable(&self) -> Option<&dyn Configurable> { Some(&self.base) }
///     fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
///         next.handle(request)
///     }
/// }
/// ```
pub struct MiddlewareBase {
    name: String,
    settings: ArcSwap<MiddlewareSettings>,
}

impl MiddlewareBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, MiddlewareSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: MiddlewareSettings) -> Self {
        Self {
            name: name.into(),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Builder-style priority for construction time
    #[must_use]
    pub fn priority_of(self, priority: i32) -> Self {
        self.replace(self.settings().with_priority(priority));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.settings.load().priority
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.load().enabled
    }

    #[must_use]
    pub fn settings(&self) -> MiddlewareSettings {
        **self.settings.load()
    }

    /// Swap in a whole new settings record
    pub fn replace(&self, settings: MiddlewareSettings) {
        self.settings.store(Arc::new(settings));
    }
}

impl Configurable for MiddlewareBase {
    fn set_priority(&self, priority: i32) {
        self.settings.rcu(|current| current.with_priority(priority));
        debug!(middleware = %self.name, priority, "Middleware priority updated");
    }

    fn set_enabled(&self, enabled: bool) {
        self.settings.rcu(|current| current.with_enabled(enabled));
        debug!(middleware = %self.name, enabled, "Middleware state updated");
    }
}

impl fmt::Debug for MiddlewareBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareBase")
            .field("name", &self.name)
            .field("settings", &self.settings())
            .finish()
    }
}
