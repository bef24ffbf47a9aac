mod common;

use common::TestContext;

#[tokio::test]
async fn login_mints_a_bearer_token() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/api/v1/auth/login")
        .json(&serde_json::json!({ "user_id": "alice", "superuser": false }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/api/v1/cells").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn malformed_bearer_token_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/api/v1/cells")
        .add_header("authorization", "Bearer not-a-real-token")
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn health_is_reachable_without_a_token() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/api/v1/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn valid_token_reaches_protected_routes() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    let response = ctx
        .server
        .get("/api/v1/cells")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
}
