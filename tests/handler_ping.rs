mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use web_init::prelude::*;

#[tokio::test]
async fn test_ping_with_default_rule_table() {
    let mut config = common::test_config();
    config.web_init.name = Some("frontdesk".to_string());

    let server = WebInit::new(InitArgs::new(config), |_| Ok(())).unwrap();
    let server = TestServer::new(server.into_router()).unwrap();

    let response = server.get("/ping").await;

    response.assert_status_ok();
    assert_eq!(
        response.text(),
        "webInit() says, frontdesk is up and running at /ping"
    );
}

#[tokio::test]
async fn test_ping_ignores_deny_all_delegate() {
    let mut delegate = common::mock_delegate();
    delegate.expect_authorize().never();

    let app = common::create_test_app(Arc::new(delegate));
    let server = TestServer::new(app).unwrap();

    let response = server.get("/ping").await;

    response.assert_status_ok();
    assert!(response.text().contains("is up and running at /ping"));
}

#[tokio::test]
async fn test_ping_matches_path_suffix() {
    let app = common::create_test_app(common::open_table());
    let server = TestServer::new(app).unwrap();

    let response = server.get("/status/ping").await;

    response.assert_status_ok();
    assert!(response.text().ends_with("is up and running at /status/ping"));
}

#[tokio::test]
async fn test_ping_only_answers_get() {
    let table = Arc::new(RuleTable::new(Rule::Token, ["secret"]));
    let app = common::create_test_app(table);
    let server = TestServer::new(app).unwrap();

    let response = server.post("/ping").expect_failure().await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ping_falls_back_to_system_name() {
    let mut config = common::test_config();
    config.system.name = Some("acme".to_string());

    let server = WebInit::new(InitArgs::new(config), |_| Ok(())).unwrap();
    let server = TestServer::new(server.into_router()).unwrap();

    let response = server.get("/ping").await;

    assert!(response.text().starts_with("webInit() says, acme is up"));
}
