//! Fallback for requests no route matched.

use axum::http::Uri;

use crate::error::AppError;

/// Answers `404` in the normalized error shape.
pub async fn not_found_handler(uri: Uri) -> AppError {
    AppError::not_found(format!("no route for {}", uri.path()))
}
