//! Per-instance transaction counter.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Counts every request that enters the pipeline.
///
/// The count lives in [`AppState::transactions`]; it is also exported as the
/// `web_init_transactions_total` counter.
pub async fn layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let transaction = state.transactions.increment();
    metrics::counter!("web_init_transactions_total").increment(1);
    tracing::trace!(transaction, "transaction started");

    next.run(req).await
}
