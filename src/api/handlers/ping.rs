//! Liveness route.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Path pattern the liveness route answers, as registered with the permission delegate.
pub const PING_PATTERN: &str = "/ping$";

/// Answers liveness requests ahead of the permission check.
///
/// `GET` (or `HEAD`) of any path ending in `/ping` gets `200 OK`, `text/plain`:
///
/// ```text
/// webInit() says, <name> is up and running at /ping
/// ```
///
/// The route is registered with the delegate as allowed for everyone, but
/// answering it here keeps it reachable whatever rules the delegate holds.
pub async fn layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if is_ping(req.method(), req.uri().path()) {
        return ping_text(&state.name, req.uri().path()).into_response();
    }
    next.run(req).await
}

fn is_ping(method: &Method, path: &str) -> bool {
    (*method == Method::GET || *method == Method::HEAD) && path.ends_with("/ping")
}

fn ping_text(name: &str, path: &str) -> String {
    format!("webInit() says, {name} is up and running at {path}")
}
