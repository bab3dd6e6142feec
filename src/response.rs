//! Response value produced by handlers and middleware.

use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::request::HeaderVec;

/// HTTP response produced by a handler or by a short-circuiting middleware
///
/// Passed back through the chain unmodified unless a middleware chooses to
/// decorate it on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Raw response body
    pub body: Vec<u8>,
}

impl Response {
    /// Create an empty response with the given status
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Create a JSON response
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        let mut resp = Self::new(status);
        resp.set_header("content-type", "application/json".to_string());
        resp.body = body.to_string().into_bytes();
        resp
    }

    /// Create a plain text response
    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        let mut resp = Self::new(status);
        resp.set_header("content-type", "text/plain; charset=utf-8".to_string());
        resp.body = body.as_bytes().to_vec();
        resp
    }

    /// Create a JSON error response of the form `{"error": message}`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// 404 for a path no route matches
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::json(
            404,
            &serde_json::json!({ "error": "Not Found", "path": path }),
        )
    }

    /// 405 with an `Allow` header listing the methods the path accepts
    #[must_use]
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let mut resp = Self::error(405, "Method Not Allowed");
        resp.set_header("allow", allow);
        resp
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body as UTF-8 text, if it is valid UTF-8
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Body parsed as JSON, if it is valid JSON
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
