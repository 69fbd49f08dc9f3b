//! HTTP layer: the request pipeline and the handlers owned by the bootstrap.
//!
//! # Modules
//!
//! - [`handlers`] - liveness route and the not-found fallback
//! - [`middleware`] - body decoding, counting, header scrubbing, unpacking,
//!   permission checking, error normalization, tracing
//! - [`routes`] - pipeline assembly

pub mod handlers;
pub mod middleware;
pub mod routes;
