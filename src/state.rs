//! Shared state handed to every middleware and handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::permission::PermissionDelegate;

/// Per-instance request counter.
///
/// Incremented once per request and never reset. Diagnostic only.
#[derive(Debug, Clone, Default)]
pub struct TransactionCounter(Arc<AtomicU64>);

impl TransactionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one request and returns its transaction number, starting at 1.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    /// Display name used in logs and the liveness text.
    pub name: Arc<str>,
    pub transactions: TransactionCounter,
    pub permissions: Arc<dyn PermissionDelegate>,
    /// Largest request body the decoder accepts, in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(
        name: impl Into<Arc<str>>,
        permissions: Arc<dyn PermissionDelegate>,
        body_limit: usize,
    ) -> Self {
        Self {
            name: name.into(),
            transactions: TransactionCounter::new(),
            permissions,
            body_limit,
        }
    }
}
