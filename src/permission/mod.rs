//! Per-route authorization.
//!
//! The bootstrap only talks to a [`PermissionDelegate`]: it registers the
//! routes it owns and asks for a [`Decision`] on every request that reaches
//! the permission check. [`RuleTable`] is the in-memory delegate used when
//! the caller does not supply one.

pub mod delegate;
pub mod rule_table;

pub use delegate::{AccessRequest, Decision, PermissionDelegate, PermissionError, Rule};
pub use rule_table::RuleTable;

#[cfg(test)]
pub use delegate::MockPermissionDelegate;
