//! Server configuration.
//!
//! Configuration is loaded once at startup and validated before any network
//! resource is acquired. Two sources are supported.
//!
//! ## Method 1: nested object (JSON file or in-process value)
//!
//! ```json
//! {
//!   "webInit": {
//!     "port": 8080,
//!     "htmlFilePath": ["/srv/html", "/srv/media"],
//!     "name": "frontdesk"
//!   },
//!   "system": { "name": "acme" },
//!   "permissions": { "tokens": ["s3cret"], "defaultRule": "token" }
//! }
//! ```
//!
//! ## Method 2: environment variables
//!
//! ```bash
//! export WEB_INIT_PORT=8080
//! export WEB_INIT_HTML_FILE_PATH="/srv/html,/srv/media"
//! export WEB_INIT_NAME="frontdesk"
//! ```
//!
//! ## Required
//!
//! - `webInit.port` / `WEB_INIT_PORT`
//!
//! ## Optional
//!
//! - `webInit.htmlFilePath` / `WEB_INIT_HTML_FILE_PATH` - static roots, in order
//! - `webInit.name` / `WEB_INIT_NAME` - display name
//! - `system.name` / `SYSTEM_NAME` - fallback display name
//! - `webInit.host` / `WEB_INIT_HOST` - bind address (default: `::`)
//! - `webInit.bodyLimit` / `WEB_INIT_BODY_LIMIT` - max body bytes (default: 102400)
//! - `permissions.tokens` / `WEB_INIT_TOKENS` - accepted tokens, comma-separated in env form
//! - `permissions.defaultRule` / `WEB_INIT_DEFAULT_RULE` - `all`, `token` or `deny` (default: `token`)
//! - `logging.level` / `RUST_LOG` - log filter (default: `info`)
//! - `logging.format` / `LOG_FORMAT` - `text` or `json` (default: `text`)

use crate::permission::Rule;
use serde_json::{Map, Value};
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Display name used when neither `webInit.name` nor `system.name` is set.
pub const DEFAULT_NAME: &str = "web-init";

/// Wildcard address the server binds to unless told otherwise.
pub const DEFAULT_HOST: &str = "::";

/// Matches the 100kb default of the usual body parsers.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub web_init: WebInitConfig,
    pub system: SystemConfig,
    pub permissions: PermissionConfig,
    pub log_level: String,
    pub log_format: String,
}

/// The `webInit` section.
#[derive(Debug, Clone)]
pub struct WebInitConfig {
    pub port: u16,
    pub host: String,
    /// Static roots, mounted in this order.
    pub html_file_path: Vec<PathBuf>,
    pub name: Option<String>,
    pub body_limit: usize,
}

/// The `system` section. Only the name is of interest here.
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub name: Option<String>,
}

/// Settings for the built-in [`crate::permission::RuleTable`] delegate.
#[derive(Debug, Clone)]
pub struct PermissionConfig {
    pub tokens: Vec<String>,
    /// Rule applied to requests no registered pattern matches.
    pub default_rule: Rule,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            default_rule: Rule::Token,
        }
    }
}

impl Config {
    /// Minimal configuration listening on `port` with every optional field defaulted.
    pub fn with_port(port: u16) -> Self {
        Self {
            web_init: WebInitConfig {
                port,
                host: DEFAULT_HOST.to_string(),
                html_file_path: Vec::new(),
                name: None,
                body_limit: DEFAULT_BODY_LIMIT,
            },
            system: SystemConfig::default(),
            permissions: PermissionConfig::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }

    /// Builds configuration from the nested object form.
    ///
    /// Required fields are checked section by section (`webInit`, then
    /// `webInit.port`) so the first missing one is reported by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] naming the dotted path of
    /// an absent required field, or [`ConfigError::InvalidField`] when a
    /// present field has the wrong shape.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let web_init = required(value, "webInit", "webInit")?;
        let port = parse_port(required(web_init, "port", "webInit.port")?)?;

        let mut config = Self::with_port(port);

        if let Some(paths) = optional(web_init, "htmlFilePath") {
            config.web_init.html_file_path = parse_path_list(paths)?;
        }
        config.web_init.name = optional_string(web_init, "name", "webInit.name")?;
        if let Some(host) = optional_string(web_init, "host", "webInit.host")? {
            config.web_init.host = host;
        }
        if let Some(limit) = optional(web_init, "bodyLimit") {
            config.web_init.body_limit = limit
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| ConfigError::invalid("webInit.bodyLimit", "expected a byte count"))?;
        }

        if let Some(system) = optional(value, "system") {
            config.system.name = optional_string(system, "name", "system.name")?;
        }

        if let Some(permissions) = optional(value, "permissions") {
            if let Some(tokens) = optional(permissions, "tokens") {
                config.permissions.tokens = parse_string_list(tokens, "permissions.tokens")?;
            }
            if let Some(rule) =
                optional_string(permissions, "defaultRule", "permissions.defaultRule")?
            {
                config.permissions.default_rule = Rule::from_str(&rule)
                    .map_err(|e| ConfigError::invalid("permissions.defaultRule", e.to_string()))?;
            }
        }

        if let Some(logging) = optional(value, "logging") {
            if let Some(level) = optional_string(logging, "level", "logging.level")? {
                config.log_level = level;
            }
            if let Some(format) = optional_string(logging, "format", "logging.format")? {
                config.log_format = format;
            }
        }

        Ok(config)
    }

    /// Reads a JSON file in the nested object form.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not JSON, or fails
    /// [`Config::from_value`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(&value)
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `WEB_INIT_PORT` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("WEB_INIT_PORT")
            .map_err(|_| ConfigError::MissingRequiredField("WEB_INIT_PORT".to_string()))?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::invalid("WEB_INIT_PORT", e.to_string()))?;

        let mut config = Self::with_port(port);

        if let Ok(paths) = env::var("WEB_INIT_HTML_FILE_PATH") {
            config.web_init.html_file_path = split_list(&paths).map(PathBuf::from).collect();
        }
        config.web_init.name = env::var("WEB_INIT_NAME").ok().filter(|v| !v.is_empty());
        config.system.name = env::var("SYSTEM_NAME").ok().filter(|v| !v.is_empty());

        if let Ok(host) = env::var("WEB_INIT_HOST") {
            config.web_init.host = host;
        }
        if let Ok(limit) = env::var("WEB_INIT_BODY_LIMIT") {
            config.web_init.body_limit = limit
                .parse()
                .map_err(|_| ConfigError::invalid("WEB_INIT_BODY_LIMIT", "expected a byte count"))?;
        }

        if let Ok(tokens) = env::var("WEB_INIT_TOKENS") {
            config.permissions.tokens = split_list(&tokens).map(str::to_string).collect();
        }
        if let Ok(rule) = env::var("WEB_INIT_DEFAULT_RULE") {
            config.permissions.default_rule = Rule::from_str(&rule)
                .map_err(|e| ConfigError::invalid("WEB_INIT_DEFAULT_RULE", e.to_string()))?;
        }

        config.log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        config.log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `host` is not an IP address
    /// - `body_limit` is zero
    /// - `log_format` is not `text` or `json`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.web_init.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::invalid(
                "webInit.host",
                format!("expected an IP address, got '{}'", self.web_init.host),
            ));
        }

        if self.web_init.body_limit == 0 {
            return Err(ConfigError::invalid(
                "webInit.bodyLimit",
                "must be greater than 0",
            ));
        }

        if self.log_format != "text" && self.log_format != "json" {
            return Err(ConfigError::invalid(
                "logging.format",
                format!("must be 'text' or 'json', got '{}'", self.log_format),
            ));
        }

        Ok(())
    }

    /// Name shown in logs and in the liveness text.
    ///
    /// `webInit.name` wins over `system.name`; [`DEFAULT_NAME`] otherwise.
    pub fn display_name(&self) -> &str {
        self.web_init
            .name
            .as_deref()
            .or(self.system.name.as_deref())
            .unwrap_or(DEFAULT_NAME)
    }

    /// Prints configuration summary (without tokens).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Name: {}", self.display_name());
        tracing::info!("  Listen: {}:{}", self.web_init.host, self.web_init.port);
        if self.web_init.html_file_path.is_empty() {
            tracing::info!("  Static roots: none");
        }
        for path in &self.web_init.html_file_path {
            tracing::info!("  Static root: {}", path.display());
        }
        tracing::info!("  Body limit: {} bytes", self.web_init.body_limit);
        tracing::info!(
            "  Permissions: {} token(s), default rule '{}'",
            self.permissions.tokens.len(),
            self.permissions.default_rule
        );
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

/// Loads and validates configuration, from `path` when given, else from the environment.
///
/// # Errors
///
/// Returns an error if required fields are missing, validation fails, or
/// the port is 0. An ephemeral port is only available to callers that build
/// a [`Config`] themselves.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;
    if config.web_init.port == 0 {
        return Err(ConfigError::invalid("webInit.port", "must be greater than 0"));
    }
    Ok(config)
}

fn optional<'a>(subject: &'a Value, name: &str) -> Option<&'a Value> {
    subject.get(name).filter(|v| !v.is_null())
}

fn required<'a>(subject: &'a Value, name: &str, path: &str) -> Result<&'a Value, ConfigError> {
    optional(subject, name).ok_or_else(|| ConfigError::MissingRequiredField(path.to_string()))
}

fn optional_string(subject: &Value, name: &str, path: &str) -> Result<Option<String>, ConfigError> {
    match optional(subject, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::invalid(path, "expected a string")),
    }
}

fn parse_port(value: &Value) -> Result<u16, ConfigError> {
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    port.ok_or_else(|| ConfigError::invalid("webInit.port", format!("expected a port number, got {value}")))
}

/// Accepts one path, a list of paths, or an object keyed `"0"`, `"1"`, ...
fn parse_path_list(value: &Value) -> Result<Vec<PathBuf>, ConfigError> {
    let field = "webInit.htmlFilePath";
    match value {
        Value::Object(map) => Ok(numeric_object_values(map, field)?
            .into_iter()
            .map(PathBuf::from)
            .collect()),
        other => Ok(parse_string_list(other, field)?
            .into_iter()
            .map(PathBuf::from)
            .collect()),
    }
}

fn parse_string_list(value: &Value, field: &str) -> Result<Vec<String>, ConfigError> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::invalid(field, "expected a list of strings"))
            })
            .collect(),
        _ => Err(ConfigError::invalid(field, "expected a string or a list of strings")),
    }
}

fn numeric_object_values(map: &Map<String, Value>, field: &str) -> Result<Vec<String>, ConfigError> {
    let mut entries = map
        .iter()
        .map(|(key, value)| {
            let index = key
                .parse::<usize>()
                .map_err(|_| ConfigError::invalid(field, format!("unexpected key '{key}'")))?;
            let value = value
                .as_str()
                .ok_or_else(|| ConfigError::invalid(field, "expected string values"))?;
            Ok((index, value.to_string()))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, value)| value).collect())
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
