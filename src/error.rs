//! Error types and the error normalizer.
//!
//! Every error that reaches a client goes through [`normalize`], which
//! produces exactly one response of the form:
//!
//! ```json
//! {"errorSource": "web-init", "errorText": "<message>"}
//! ```
//!
//! with the error's own `code` as status when it is a valid HTTP status,
//! `500` otherwise.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::ConfigError;
use crate::permission::PermissionError;
use crate::utils::value::{to_text, truthy};

/// Value of `errorSource` in every normalized error body.
pub const ERROR_SOURCE: &str = "web-init";

/// Message used when nothing better can be extracted.
pub const UNEXPECTED_ERROR: &str = "unexpected error";

/// JSON body of a normalized error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_source: String,
    pub error_text: String,
}

/// A normalized error, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl IntoResponse for NormalizedError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Turns an arbitrary error value into a status and an `{errorSource, errorText}` body.
///
/// Message precedence:
/// 1. `errorObject` (stands in for `errorText` when present)
/// 2. `errorText.errorText`
/// 3. `message`
/// 4. top-level `errorText`
/// 5. `"unexpected error"`
///
/// A bare string is its own message. `null`, `false`, `0` and `""` count as absent.
pub fn normalize(error: Option<&Value>) -> NormalizedError {
    let error = error.unwrap_or(&Value::Null);

    let (status, text) = match error {
        Value::String(message) if !message.is_empty() => {
            (StatusCode::INTERNAL_SERVER_ERROR, Some(message.clone()))
        }
        Value::Object(_) => (status_of(error), message_of(error)),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };

    NormalizedError {
        status,
        body: ErrorBody {
            error_source: ERROR_SOURCE.to_string(),
            error_text: text.unwrap_or_else(|| UNEXPECTED_ERROR.to_string()),
        },
    }
}

fn status_of(error: &Value) -> StatusCode {
    let code = match error.get("code") {
        Some(Value::Number(n)) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
        Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    code.and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn message_of(error: &Value) -> Option<String> {
    let error_text = truthy(error.get("errorObject")).or_else(|| truthy(error.get("errorText")));
    let nested = error_text.and_then(|text| truthy(text.get("errorText")));

    nested
        .or_else(|| truthy(error.get("message")))
        .or(error_text)
        .map(to_text)
}

/// Errors surfaced by handlers and middleware while serving a request.
///
/// Converted to a response through [`normalize`], so the client always sees
/// the same body shape.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    PayloadTooLarge { message: String },

    #[error("{message}")]
    Internal { message: String },

    /// Loosely shaped error, e.g. one forwarded from another service.
    #[error("{0}")]
    Raw(Value),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
        }
    }
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Raw(value) => status_of(value),
        }
    }

    /// The error in the loose `{code, message}` shape [`normalize`] consumes.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Raw(value) => value.clone(),
            other => json!({
                "code": other.status().as_u16(),
                "message": other.to_string(),
            }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let normalized = normalize(Some(&self.to_value()));
        if normalized.status.is_server_error() {
            tracing::error!(
                status = normalized.status.as_u16(),
                error = %normalized.body.error_text,
                "request failed"
            );
        }
        normalized.into_response()
    }
}

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("init callback failed: {0}")]
    Callback(String),
}
