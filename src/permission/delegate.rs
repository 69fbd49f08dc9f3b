//! Capability interface for the permission component.

use async_trait::async_trait;
use axum::http::Method;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Authorization rule attached to a (method, pattern) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Anyone, with or without a token.
    All,
    /// Only requests carrying an accepted token.
    Token,
    /// Nobody.
    Deny,
}

impl FromStr for Rule {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "token" => Ok(Self::Token),
            "deny" | "none" => Ok(Self::Deny),
            other => Err(PermissionError::UnknownRule(other.to_string())),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Token => "token",
            Self::Deny => "deny",
        };
        f.write_str(name)
    }
}

/// What the delegate gets to see of a request.
///
/// Built after unpacking, so `token` is whatever the body or query carried.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub method: Method,
    pub path: String,
    pub token: Option<String>,
}

/// Outcome of [`PermissionDelegate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Errors raised while registering rules.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown permission rule '{0}'")]
    UnknownRule(String),
}

/// External component deciding per-route authorization.
///
/// The bootstrap never inspects or mutates the delegate's rule table beyond
/// [`register_route`](PermissionDelegate::register_route).
///
/// # Implementations
///
/// - [`crate::permission::RuleTable`] - in-memory regex rule table
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionDelegate: Send + Sync {
    /// Registers `rule` for requests with `method` whose path matches the
    /// regular expression `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidPattern`] if `pattern` does not compile.
    fn register_route(&self, method: Method, pattern: &str, rule: Rule)
    -> Result<(), PermissionError>;

    /// Decides whether `request` may proceed to the route handlers.
    async fn authorize(&self, request: &AccessRequest) -> Decision;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_str() {
        assert_eq!("all".parse::<Rule>().unwrap(), Rule::All);
        assert_eq!(" Token ".parse::<Rule>().unwrap(), Rule::Token);
        assert_eq!("none".parse::<Rule>().unwrap(), Rule::Deny);
        assert!(matches!(
            "maybe".parse::<Rule>(),
            Err(PermissionError::UnknownRule(ref r)) if r == "maybe"
        ));
    }

    #[test]
    fn test_rule_display_round_trips() {
        for rule in [Rule::All, Rule::Token, Rule::Deny] {
            assert_eq!(rule.to_string().parse::<Rule>().unwrap(), rule);
        }
    }
}
