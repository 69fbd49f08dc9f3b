//! Permission-path check.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::permission::{AccessRequest, Decision};
use crate::state::AppState;

/// Asks the permission delegate whether the request may proceed.
///
/// Runs after [`crate::api::middleware::unpack`], so the token is the one
/// taken from the body or query.
///
/// # Errors
///
/// Returns `401 Unauthorized` carrying the delegate's reason when access is denied.
pub async fn layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access = AccessRequest {
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        token: req
            .extensions()
            .get::<Envelope>()
            .and_then(Envelope::token_str),
    };

    match state.permissions.authorize(&access).await {
        Decision::Allow => Ok(next.run(req).await),
        Decision::Deny(reason) => {
            tracing::debug!(method = %access.method, path = %access.path, %reason, "access denied");
            Err(AppError::unauthorized(reason))
        }
    }
}
