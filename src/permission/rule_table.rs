//! In-memory permission delegate.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use axum::http::Method;
use regex::Regex;

use crate::config::PermissionConfig;
use crate::permission::{AccessRequest, Decision, PermissionDelegate, PermissionError, Rule};

struct RouteRule {
    method: Method,
    pattern: Regex,
    rule: Rule,
}

impl RouteRule {
    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_matches =
            self.method == *method || (self.method == Method::GET && *method == Method::HEAD);
        method_matches && self.pattern.is_match(path)
    }
}

/// Regex rule table with a fixed set of accepted tokens.
///
/// Rules are checked in registration order; the first match decides.
/// Requests matching no rule fall under `default_rule`.
pub struct RuleTable {
    rules: RwLock<Vec<RouteRule>>,
    tokens: HashSet<String>,
    default_rule: Rule,
}

impl RuleTable {
    pub fn new<I, T>(default_rule: Rule, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            rules: RwLock::new(Vec::new()),
            tokens: tokens.into_iter().map(Into::into).collect(),
            default_rule,
        }
    }

    pub fn from_config(config: &PermissionConfig) -> Self {
        Self::new(config.default_rule, config.tokens.iter().cloned())
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rule_for(&self, method: &Method, path: &str) -> Rule {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.matches(method, path))
            .map(|r| r.rule)
            .unwrap_or(self.default_rule)
    }
}

#[async_trait]
impl PermissionDelegate for RuleTable {
    fn register_route(
        &self,
        method: Method,
        pattern: &str,
        rule: Rule,
    ) -> Result<(), PermissionError> {
        let compiled = Regex::new(pattern).map_err(|source| PermissionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        tracing::debug!(%method, pattern, %rule, "permission rule registered");

        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RouteRule {
                method,
                pattern: compiled,
                rule,
            });
        Ok(())
    }

    async fn authorize(&self, request: &AccessRequest) -> Decision {
        match self.rule_for(&request.method, &request.path) {
            Rule::All => Decision::Allow,
            Rule::Deny => Decision::Deny(format!("access to {} is denied", request.path)),
            Rule::Token => match request.token.as_deref() {
                None => Decision::Deny("missing token".to_string()),
                Some(token) if self.tokens.contains(token) => Decision::Allow,
                Some(_) => Decision::Deny("invalid token".to_string()),
            },
        }
    }
}
