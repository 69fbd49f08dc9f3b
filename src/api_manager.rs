//! Registry of named diagnostic functions.
//!
//! An embedding application can hand an [`ApiManager`] to
//! [`crate::server::WebInit`]; the server registers `listPaths` on it.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A registered diagnostic function.
pub type ApiFn = Arc<dyn Fn() + Send + Sync>;

/// Named function registry shared between components.
#[derive(Default)]
pub struct ApiManager {
    apis: RwLock<BTreeMap<String, ApiFn>>,
}

impl ApiManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `api` under `name`, replacing any earlier registration.
    pub fn register_api<F>(&self, name: impl Into<String>, api: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(api = %name, "api registered");
        self.apis
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(api));
    }

    /// Invokes the function registered under `name`.
    ///
    /// Returns `false` when nothing is registered under that name.
    pub fn call(&self, name: &str) -> bool {
        let api = self
            .apis
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        match api {
            Some(api) => {
                api();
                true
            }
            None => false,
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.apis
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
