#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use mockall::mock;
use serde_json::{Value, json};
use tower::ServiceExt;
use web_init::permission::PermissionError;
use web_init::prelude::*;

mock! {
    pub Delegate {}

    #[async_trait]
    impl PermissionDelegate for Delegate {
        fn register_route(&self, method: Method, pattern: &str, rule: Rule) -> Result<(), PermissionError>;
        async fn authorize(&self, request: &AccessRequest) -> Decision;
    }
}

/// Delegate that accepts the liveness registration and nothing else matters.
pub fn mock_delegate() -> MockDelegate {
    let mut delegate = MockDelegate::new();
    delegate
        .expect_register_route()
        .returning(|_, _, _| Ok(()));
    delegate
}

/// Rule table letting every request through.
pub fn open_table() -> Arc<RuleTable> {
    Arc::new(RuleTable::new(Rule::All, Vec::<String>::new()))
}

pub fn test_config() -> Config {
    Config::with_port(0)
}

/// Echoes what unpacking produced.
pub async fn echo_handler(envelope: Envelope) -> Json<Value> {
    Json(json!({
        "token": envelope.token,
        "query": envelope.query,
        "body": envelope.body,
    }))
}

/// Server with `/echo` (GET and POST) behind the given delegate.
pub fn create_test_server(config: Config, permissions: Arc<dyn PermissionDelegate>) -> WebInit {
    WebInit::new(
        InitArgs::new(config).with_permissions(permissions),
        |server| {
            server.route("/echo", get(echo_handler).post(echo_handler));
            Ok(())
        },
    )
    .unwrap()
}

pub fn create_test_app(permissions: Arc<dyn PermissionDelegate>) -> Router {
    create_test_server(test_config(), permissions).into_router()
}

/// Sends one request through the router without a network socket.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
