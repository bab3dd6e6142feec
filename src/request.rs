//! Request value consumed by the router and the middleware chain.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>` so repeated names (content-type, authorization)
/// are cheap to clone between request and response.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Attribute key holding the matched route name (or null for unnamed routes)
pub const ROUTE_NAME_ATTR: &str = "route.name";
/// Attribute key holding the matched route pattern
pub const ROUTE_PATTERN_ATTR: &str = "route.pattern";
/// Attribute key holding the extracted path parameters as a JSON object
pub const ROUTE_PARAMS_ATTR: &str = "route.params";

/// An incoming HTTP request as seen by routing and middleware
///
/// Carries the method, the path and query split from the URI, headers and an
/// extensible attribute bag. Middleware use the attribute bag to pass data
/// (route name, authenticated principal, ...) further down the chain.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    /// HTTP headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    attributes: HashMap<String, Value>,
}

impl Request {
    /// Create a request from a method and a URI path with an optional query string
    ///
    /// ```rust
    /// use routeweave::request::Request;
    /// use http::Method;
    ///
    /// let req = Request::new(Method::GET, "/posts/42?page=2");
    /// assert_eq!(req.path, "/posts/42");
    /// assert_eq!(req.query_param("page").as_deref(), Some("2"));
    /// ```
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path,
            query,
            headers: HeaderVec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Add a header, returning the request for chaining
    ///
    /// An `x-request-id` header holding a valid ULID also becomes the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            if let Some(id) = RequestId::adopt(&value) {
                self.request_id = id;
            }
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a decoded query parameter by name
    ///
    /// Uses "last write wins" semantics for repeated keys.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(k, _)| k == name)
            .last()
            .map(|(_, v)| v.into_owned())
    }

    /// Read an attribute set by routing or by an earlier middleware
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Builder form of [`Request::set_attribute`]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// All attributes attached so far
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }
}
