//! Handlers owned by the bootstrap itself.

pub mod fallback;
pub mod ping;

pub use fallback::not_found_handler;
