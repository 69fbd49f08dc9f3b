//! Request body decoding.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::qs;

/// Decoded request body, left in the request extensions for
/// [`crate::api::middleware::unpack`].
#[derive(Debug, Clone)]
pub struct DecodedBody(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        Some(BodyKind::Json)
    } else if essence == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Decodes JSON and urlencoded bodies.
///
/// The raw bytes are put back into the request so later stages can still
/// read them. Other content types pass through untouched.
///
/// # Errors
///
/// - `413 Payload Too Large` if the body exceeds [`AppState::body_limit`]
/// - `400 Bad Request` if a JSON body does not parse
pub async fn layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(kind) = body_kind(req.headers()) else {
        return Ok(next.run(req).await);
    };

    if content_length(req.headers()).is_some_and(|len| len > state.body_limit) {
        return Err(AppError::payload_too_large("request entity too large"));
    }

    let (mut parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|_| AppError::payload_too_large("request entity too large"))?;

    if !bytes.is_empty() {
        let decoded = match kind {
            BodyKind::Json => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))?,
            BodyKind::Form => Value::Object(qs::parse(&String::from_utf8_lossy(&bytes))),
        };
        parts.extensions.insert(DecodedBody(decoded));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
