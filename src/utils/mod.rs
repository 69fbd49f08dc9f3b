//! Utility functions shared across modules.
//!
//! - [`qs`] - nested query-string / form decoding and encoding
//! - [`value`] - loose JSON value helpers

pub mod qs;
pub mod value;
