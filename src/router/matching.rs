use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use super::route::Route;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage, in capture order.
///
/// Param names use `Arc<str>`: they come from the compiled route and are
/// shared by every match, while values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Outcome of matching a request against a route or a route table
///
/// A match always carries the route and its parameters; a failure carries
/// neither. Failure does not say whether the path or the method was wrong.
#[derive(Debug, Clone)]
pub enum RouteMatchResult {
    /// The request matched `route`
    Matched {
        /// The matched route
        route: Arc<Route>,
        /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
        params: ParamVec,
    },
    /// Nothing matched
    NotMatched,
}

impl RouteMatchResult {
    #[must_use]
    pub fn matched(route: Arc<Route>, params: ParamVec) -> Self {
        RouteMatchResult::Matched { route, params }
    }

    #[must_use]
    pub fn not_matched() -> Self {
        RouteMatchResult::NotMatched
    }

    #[inline]
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, RouteMatchResult::Matched { .. })
    }

    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        match self {
            RouteMatchResult::Matched { route, .. } => Some(route),
            RouteMatchResult::NotMatched => None,
        }
    }

    /// Extracted parameters; empty for a failed match
    #[must_use]
    pub fn params(&self) -> &[(Arc<str>, String)] {
        match self {
            RouteMatchResult::Matched { params, .. } => params,
            RouteMatchResult::NotMatched => &[],
        }
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if a pattern repeats a name
    /// (e.g., `/org/{id}/user/{id}`), returns the last capture.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params()
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert params to a HashMap (last capture wins for repeated names)
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn into_parts(self) -> Option<(Arc<Route>, ParamVec)> {
        match self {
            RouteMatchResult::Matched { route, params } => Some((route, params)),
            RouteMatchResult::NotMatched => None,
        }
    }
}
