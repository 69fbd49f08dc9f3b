//! # web-init
//!
//! Bootstrap for an Axum HTTP server.
//!
//! ## What it sets up
//!
//! - **Body decoding** - JSON and urlencoded (bracket-nested) bodies
//! - **Transaction counting** - one increment per request, per instance
//! - **Header scrubbing** - `x-*` and `host*` headers never reach handlers
//! - **Static roots** - served ahead of any token or permission check
//! - **Unpacking** - `{data, token}` envelopes split into payload and credential
//! - **Permission checks** - delegated to a [`permission::PermissionDelegate`]
//! - **Liveness** - `GET /ping`
//! - **Error normalization** - every error answers `{errorSource, errorText}`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::routing::get;
//! use web_init::prelude::*;
//!
//! # async fn run() -> Result<(), InitError> {
//! let config = Config::with_port(8080);
//! let server = WebInit::new(InitArgs::new(config), |server| {
//!     server.route("/hello", get(|| async { "hello" }));
//!     Ok(())
//! })?;
//! server.start_server().await
//! # }
//! ```
//!
//! ## Configuration
//!
//! See [`config`] for the nested object form and the environment variables.

pub mod api;
pub mod api_manager;
pub mod config;
pub mod envelope;
pub mod error;
pub mod permission;
pub mod server;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use server::WebInit;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::api_manager::ApiManager;
    pub use crate::config::Config;
    pub use crate::envelope::Envelope;
    pub use crate::error::{AppError, InitError};
    pub use crate::permission::{AccessRequest, Decision, PermissionDelegate, Rule, RuleTable};
    pub use crate::server::{InitArgs, WebInit};
    pub use crate::state::AppState;
}
