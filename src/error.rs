//! Error taxonomy for registration, middleware resolution, URL generation and the route cache.
//!
//! Registration and URL generation errors are programmer errors and surface immediately.
//! Resolution errors abort the request being handled. Cache errors never leave the
//! [`cache`](crate::cache) module: they are logged and counted as a miss.

use std::fmt;

/// Route registration error
///
/// Returned by [`Route::new`](crate::router::Route::new) and the registration methods on
/// [`Router`](crate::router::Router). Registration errors are raised when the route is
/// added, never at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The route was declared without any HTTP method
    EmptyMethods {
        /// Pattern of the offending route
        pattern: String,
    },
    /// A method token is not a valid HTTP method
    InvalidMethod {
        /// The rejected method string
        method: String,
    },
    /// The path template could not be parsed
    MalformedPattern {
        /// The rejected pattern
        pattern: String,
        /// Human readable explanation
        reason: String,
    },
    /// Another route already uses this name
    DuplicateName {
        /// The duplicated route name
        name: String,
    },
}

impl RegistrationError {
    pub(crate) fn malformed(pattern: &str, reason: impl Into<String>) -> Self {
        RegistrationError::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::EmptyMethods { pattern } => {
                write!(f, "route '{}' must declare at least one HTTP method", pattern)
            }
            RegistrationError::InvalidMethod { method } => {
                write!(f, "'{}' is not a valid HTTP method", method)
            }
            RegistrationError::MalformedPattern { pattern, reason } => {
                write!(f, "malformed route pattern '{}': {}", pattern, reason)
            }
            RegistrationError::DuplicateName { name } => {
                write!(f, "a route named '{}' is already registered", name)
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Middleware resolution error
///
/// Fatal for the request being handled: a route never runs with a partially
/// resolved middleware chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Neither the alias target nor the original name is bound in the container
    Unresolved {
        /// The string attached to the route
        value: String,
        /// The name it resolved to through the alias registry
        resolved: String,
    },
    /// The container returned a service that is not a middleware
    NotMiddleware {
        /// The string attached to the route
        value: String,
        /// The container id that was queried
        id: String,
    },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::Unresolved { value, resolved } if value == resolved => {
                write!(f, "middleware '{}' could not be resolved", value)
            }
            ResolutionError::Unresolved { value, resolved } => {
                write!(
                    f,
                    "middleware '{}' (alias for '{}') could not be resolved",
                    value, resolved
                )
            }
            ResolutionError::NotMiddleware { value, id } => {
                write!(
                    f,
                    "container entry '{}' resolved for '{}' is not a middleware",
                    id, value
                )
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

/// URL generation error
///
/// Returned instead of ever producing a malformed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlGenerationError {
    /// No route is registered under this name
    UnknownRoute {
        /// The requested route name
        name: String,
    },
    /// A placeholder in the pattern has no value
    MissingParameter {
        /// Pattern being expanded
        pattern: String,
        /// Name of the placeholder left unsubstituted
        parameter: String,
    },
    /// Arrays, objects and null cannot be substituted into a URL
    NonScalarParameter {
        /// The offending parameter
        parameter: String,
    },
    /// An empty value would produce a path the route itself cannot match
    EmptyParameter {
        /// The offending parameter
        parameter: String,
    },
}

impl fmt::Display for UrlGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlGenerationError::UnknownRoute { name } => {
                write!(f, "no route named '{}'", name)
            }
            UrlGenerationError::MissingParameter { pattern, parameter } => {
                write!(
                    f,
                    "missing required parameter '{}' for route '{}'",
                    parameter, pattern
                )
            }
            UrlGenerationError::NonScalarParameter { parameter } => {
                write!(f, "parameter '{}' must be a string, number or boolean", parameter)
            }
            UrlGenerationError::EmptyParameter { parameter } => {
                write!(f, "parameter '{}' must not be empty", parameter)
            }
        }
    }
}

impl std::error::Error for UrlGenerationError {}

/// Route cache failure
///
/// Always recoverable. The cache downgrades every variant to a miss.
#[derive(Debug)]
pub enum CacheError {
    /// Reading, writing or renaming the cache file failed
    Io(std::io::Error),
    /// The cache file does not contain a valid record
    Serde(serde_json::Error),
    /// The record was written by an incompatible format version
    Version {
        /// Version found in the file
        found: u32,
    },
    /// The record is older than its TTL
    Expired {
        /// Age of the record in seconds
        age_secs: u64,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "route cache I/O error: {}", e),
            CacheError::Serde(e) => write!(f, "route cache record is invalid: {}", e),
            CacheError::Version { found } => {
                write!(f, "route cache format version {} is not supported", found)
            }
            CacheError::Expired { age_secs } => {
                write!(f, "route cache record expired ({}s old)", age_secs)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(e) => Some(e),
            CacheError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serde(e)
    }
}
