//! Pipeline assembly.
//!
//! # Request flow
//!
//! ```text
//! tracing -> catch panic -> error normalizer -> body decoding -> counter
//!   -> header filter -> static roots (in order) -> unpack -> /ping
//!   -> permission check -> application routes -> 404 fallback
//! ```
//!
//! Static roots sit in front of unpacking and the permission check, so
//! anything served from them needs no token.

use std::path::PathBuf;

use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use crate::api::handlers::{not_found_handler, ping};
use crate::api::middleware::{body, errors, headers, permission, tracing, transactions, unpack};
use crate::state::AppState;

/// Constructs the complete application router.
///
/// # Arguments
///
/// - `state` - shared state injected into middleware and handlers
/// - `static_roots` - directories served as static files, first match wins
/// - `routes` - application routes; they run behind unpacking and the permission check
pub fn app_router(state: AppState, static_roots: &[PathBuf], routes: Router<AppState>) -> Router {
    let protected = routes
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            permission::layer,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), ping::layer))
        .layer(middleware::from_fn(unpack::layer))
        .with_state(state.clone());

    mount_static(static_roots, protected)
        .layer(middleware::from_fn(headers::layer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            transactions::layer,
        ))
        .layer(middleware::from_fn_with_state(state, body::layer))
        .layer(middleware::from_fn(errors::layer))
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(tracing::layer())
}

/// Puts one static responder per root in front of `next`.
///
/// A request that names no existing file under a root (or is not a `GET`/
/// `HEAD`) falls through to the next root and finally to `next`.
pub fn mount_static(roots: &[PathBuf], next: Router) -> Router {
    roots.iter().rev().fold(next, |next, root| {
        Router::new().fallback_service(
            ServeDir::new(root)
                .call_fallback_on_method_not_allowed(true)
                .fallback(next),
        )
    })
}
