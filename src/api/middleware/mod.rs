//! Request pipeline middleware, listed in the order a request meets them.
//!
//! 1. [`tracing`] - request/response spans
//! 2. [`errors`] - error normalization and panic capture
//! 3. [`body`] - JSON / urlencoded body decoding
//! 4. [`transactions`] - per-instance request counter
//! 5. [`headers`] - `x-*` / `host*` header removal
//! 6. static roots (see [`crate::api::routes`])
//! 7. [`unpack`] - token / data separation
//! 8. liveness route ([`crate::api::handlers::ping`])
//! 9. [`permission`] - delegate check

pub mod body;
pub mod errors;
pub mod headers;
pub mod permission;
pub mod tracing;
pub mod transactions;
pub mod unpack;
