//! Route values: method set + path template + handler, with optional name and middleware.
//!
//! Routes are immutable. Naming a route or attaching middleware produces a new
//! value through [`Route::with_attributes`] or a [`RouteBuilder`], so a group or
//! decorator can specialise a route without touching the original.

use std::fmt;
use std::sync::{Arc, OnceLock};

use http::Method;
use regex::Regex;
use serde_json::{Map, Value};

use super::matching::{ParamVec, RouteMatchResult};
use super::pattern::{PathTemplate, Token};
use crate::error::{RegistrationError, UrlGenerationError};
use crate::handler::HandlerRef;
use crate::middleware::Middleware;
use crate::request::Request;

/// Middleware attached to a route
///
/// Either a concrete instance or a string alias. Aliases are resolved at
/// dispatch time by the [`MiddlewareResolver`](crate::resolver::MiddlewareResolver),
/// which keeps routes free of any container dependency.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// A ready-to-run middleware
    Instance(Arc<dyn Middleware>),
    /// An alias, container id or type path
    Alias(String),
}

impl MiddlewareRef {
    /// Name of the instance or the alias string
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            MiddlewareRef::Instance(mw) => mw.name(),
            MiddlewareRef::Alias(alias) => alias,
        }
    }

    #[must_use]
    pub fn as_alias(&self) -> Option<&str> {
        match self {
            MiddlewareRef::Alias(alias) => Some(alias),
            MiddlewareRef::Instance(_) => None,
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Instance(mw) => f.debug_tuple("Instance").field(&mw.name()).finish(),
            MiddlewareRef::Alias(alias) => f.debug_tuple("Alias").field(alias).finish(),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(alias: &str) -> Self {
        MiddlewareRef::Alias(alias.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(alias: String) -> Self {
        MiddlewareRef::Alias(alias)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(mw: Arc<dyn Middleware>) -> Self {
        MiddlewareRef::Instance(mw)
    }
}

/// Mutable attributes of a route, applied with [`Route::with_attributes`]
#[derive(Debug, Clone, Default)]
pub struct RouteAttributes {
    /// Route name used for URL generation
    pub name: Option<String>,
    /// Route middleware, outermost first
    pub middleware: Vec<MiddlewareRef>,
}

/// Compiled matcher for a route pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    param_names: Arc<[Arc<str>]>,
}

impl CompiledPattern {
    #[allow(clippy::expect_used)]
    fn compile(template: &PathTemplate) -> Self {
        let regex = Regex::new(&template.regex_source())
            .expect("escaped route template is always a valid regex");
        Self {
            regex,
            param_names: template
                .param_names()
                .iter()
                .map(|n| Arc::from(n.as_str()))
                .collect(),
        }
    }

    /// Rebuild a matcher from a stored regex source (used by the route cache)
    pub(crate) fn from_source(source: &str, param_names: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(source)?,
            param_names: param_names.iter().map(|n| Arc::from(n.as_str())).collect(),
        })
    }

    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    #[must_use]
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match a path, zipping captures to parameter names in order
    ///
    /// Captured segments are percent-decoded; a segment that does not decode to
    /// UTF-8 is kept as it appeared in the path.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                let raw = m.as_str();
                let value = urlencoding::decode(raw)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                params.push((Arc::clone(name), value));
            }
        }
        Some(params)
    }
}

/// A registered route
#[derive(Debug, Clone)]
pub struct Route {
    methods: Vec<Method>,
    template: Arc<PathTemplate>,
    handler: HandlerRef,
    name: Option<String>,
    middleware: Vec<MiddlewareRef>,
    compiled: OnceLock<Arc<CompiledPattern>>,
}

impl Route {
    /// Create a route
    ///
    /// Methods are normalised to upper case and de-duplicated. The template is
    /// parsed and validated here; the regex itself is compiled on first use.
    ///
    /// # Errors
    ///
    /// [`RegistrationError`] for an empty method set, an invalid method token or a
    /// malformed pattern.
    pub fn new<I, S>(
        methods: I,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = parse_methods(methods)?;
        if methods.is_empty() {
            return Err(RegistrationError::EmptyMethods {
                pattern: pattern.to_string(),
            });
        }
        let template = PathTemplate::parse(pattern)?;
        Ok(Self {
            methods,
            template: Arc::new(template),
            handler: handler.into(),
            name: None,
            middleware: Vec::new(),
            compiled: OnceLock::new(),
        })
    }

    /// Start a [`RouteBuilder`] for a new route
    pub fn builder<I, S>(
        methods: I,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<RouteBuilder, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Route::new(methods, pattern, handler).map(RouteBuilder::from)
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.template.as_str()
    }

    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Parameter names in pattern order
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        self.template.param_names()
    }

    /// The compiled matcher, built once per route
    #[must_use]
    pub fn compiled(&self) -> &CompiledPattern {
        self.compiled
            .get_or_init(|| Arc::new(CompiledPattern::compile(&self.template)))
    }

    /// Case-insensitive method membership
    #[inline]
    #[must_use]
    pub fn matches_method(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method))
    }

    /// Match a path against this route's pattern
    #[must_use]
    pub fn matches_path(self: &Arc<Self>, path: &str) -> RouteMatchResult {
        match self.compiled().captures(path) {
            Some(params) => RouteMatchResult::matched(Arc::clone(self), params),
            None => RouteMatchResult::not_matched(),
        }
    }

    /// Match a request: the method is checked before any regex work
    #[must_use]
    pub fn matches(self: &Arc<Self>, request: &Request) -> RouteMatchResult {
        if !self.matches_method(request.method.as_str()) {
            return RouteMatchResult::not_matched();
        }
        self.matches_path(&request.path)
    }

    /// Build a URL for this route
    ///
    /// Each placeholder is replaced by the percent-encoded value of the parameter
    /// with the same name. Parameters not named in the pattern are ignored. A
    /// non-empty `query` is appended form-encoded; arrays in the query repeat the key.
    ///
    /// # Errors
    ///
    /// [`UrlGenerationError`] for a missing, empty or non-scalar parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use routeweave::router::Route;
    /// use serde_json::json;
    ///
    /// let route = Route::new(["GET"], "/posts/{id}", "posts.show").unwrap();
    /// let params = json!({"id": 42});
    /// let url = route.generate_url(params.as_object().unwrap(), None).unwrap();
    /// assert_eq!(url, "/posts/42");
    /// ```
    pub fn generate_url(
        &self,
        params: &Map<String, Value>,
        query: Option<&Map<String, Value>>,
    ) -> Result<String, UrlGenerationError> {
        let mut url = String::with_capacity(self.pattern().len() + 16);
        for token in self.template.tokens() {
            match token {
                Token::Literal(text) => url.push_str(text),
                Token::Param(name) => {
                    let value = params.get(name).ok_or_else(|| {
                        UrlGenerationError::MissingParameter {
                            pattern: self.pattern().to_string(),
                            parameter: name.clone(),
                        }
                    })?;
                    let value = scalar_to_string(name, value)?;
                    if value.is_empty() {
                        return Err(UrlGenerationError::EmptyParameter {
                            parameter: name.clone(),
                        });
                    }
                    url.push_str(&urlencoding::encode(&value));
                }
            }
        }

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in query {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            serializer.append_pair(key, &scalar_to_string(key, item)?);
                        }
                    }
                    other => {
                        serializer.append_pair(key, &scalar_to_string(key, other)?);
                    }
                }
            }
            url.push('?');
            url.push_str(&serializer.finish());
        }

        Ok(url)
    }

    /// A copy of this route with name and middleware replaced
    #[must_use]
    pub fn with_attributes(&self, attributes: RouteAttributes) -> Route {
        Route {
            name: attributes.name,
            middleware: attributes.middleware,
            ..self.clone()
        }
    }

    /// Current name and middleware as attributes
    #[must_use]
    pub fn attributes(&self) -> RouteAttributes {
        RouteAttributes {
            name: self.name.clone(),
            middleware: self.middleware.clone(),
        }
    }

    /// Builder seeded with this route
    #[must_use]
    pub fn to_builder(&self) -> RouteBuilder {
        RouteBuilder::from(self.clone())
    }

    /// `GET|HEAD /users/{id}` style description
    #[must_use]
    pub fn signature(&self) -> String {
        let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        format!("{} {}", methods.join("|"), self.pattern())
    }
}

/// Produces new [`Route`] values with a different name or middleware list
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    route: Route,
    attributes: RouteAttributes,
}

impl From<Route> for RouteBuilder {
    fn from(route: Route) -> Self {
        let attributes = route.attributes();
        Self { route, attributes }
    }
}

impl RouteBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.attributes.name = Some(name.into());
        self
    }

    /// Append a middleware (runs inside any previously attached one)
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.attributes.middleware.push(middleware.into());
        self
    }

    /// Replace the whole middleware list
    #[must_use]
    pub fn replace_middleware(mut self, middleware: Vec<MiddlewareRef>) -> Self {
        self.attributes.middleware = middleware;
        self
    }

    #[must_use]
    pub fn build(self) -> Route {
        self.route.with_attributes(self.attributes)
    }
}

fn parse_methods<I, S>(methods: I) -> Result<Vec<Method>, RegistrationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<Method> = Vec::new();
    for method in methods {
        let token = method.as_ref().trim().to_ascii_uppercase();
        let m = Method::from_bytes(token.as_bytes()).map_err(|_| {
            RegistrationError::InvalidMethod {
                method: method.as_ref().to_string(),
            }
        })?;
        if !parsed.contains(&m) {
            parsed.push(m);
        }
    }
    Ok(parsed)
}

fn scalar_to_string(name: &str, value: &Value) -> Result<String, UrlGenerationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(UrlGenerationError::NonScalarParameter {
                parameter: name.to_string(),
            })
        }
    }
}
