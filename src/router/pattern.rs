//! Path template parsing.
//!
//! A template is a path with `{name}` placeholders, e.g. `/users/{id}/posts/{post_id}`.
//! Parsing validates the template once at registration and produces the token list
//! used both for regex compilation and for URL generation.

use crate::error::RegistrationError;

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text matched verbatim
    Literal(String),
    /// A `{name}` placeholder matching one or more non-slash characters
    Param(String),
}

/// Validated path template with its parameter names in left-to-right order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    tokens: Vec<Token>,
    param_names: Vec<String>,
}

impl PathTemplate {
    /// Parse and validate a template
    ///
    /// Rejects templates that do not start with `/`, unbalanced braces and
    /// placeholder names that are not identifiers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use routeweave::router::PathTemplate;
    ///
    /// let t = PathTemplate::parse("/users/{id}/posts/{post_id}").unwrap();
    /// assert_eq!(t.param_names(), ["id", "post_id"]);
    /// assert_eq!(t.regex_source(), r"^/users/([^/]+)/posts/([^/]+)$");
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        if !pattern.starts_with('/') {
            return Err(RegistrationError::malformed(pattern, "pattern must start with '/'"));
        }

        let mut tokens = Vec::new();
        let mut param_names = Vec::with_capacity(pattern.matches('{').count());
        let mut rest = pattern;

        while !rest.is_empty() {
            let Some(pos) = rest.find(['{', '}']) else {
                tokens.push(Token::Literal(rest.to_string()));
                break;
            };
            if rest[pos..].starts_with('}') {
                return Err(RegistrationError::malformed(pattern, "unmatched '}'"));
            }
            if pos > 0 {
                tokens.push(Token::Literal(rest[..pos].to_string()));
            }

            let after = &rest[pos + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| RegistrationError::malformed(pattern, "unclosed '{'"))?;
            let name = &after[..close];
            if name.is_empty() {
                return Err(RegistrationError::malformed(pattern, "empty placeholder '{}'"));
            }
            if !is_param_name(name) {
                return Err(RegistrationError::malformed(
                    pattern,
                    format!("invalid placeholder name '{}'", name),
                ));
            }
            tokens.push(Token::Param(name.to_string()));
            param_names.push(name.to_string());
            rest = &after[close + 1..];
        }

        Ok(Self {
            raw: pattern.to_string(),
            tokens,
            param_names,
        })
    }

    /// The template as written at registration
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Placeholder names, left to right. Duplicates are kept.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Anchored regex: literals escaped, each placeholder a `([^/]+)` capture
    #[must_use]
    pub fn regex_source(&self) -> String {
        let mut source = String::with_capacity(self.raw.len() + 8 * self.param_names.len() + 2);
        source.push('^');
        for token in &self.tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Param(_) => source.push_str("([^/]+)"),
            }
        }
        source.push('$');
        source
    }
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
