mod common;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use common::TestContext;

#[tokio::test]
async fn rotating_a_cell_key_advances_the_version_and_keeps_old_secrets_readable() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    let created: serde_json::Value = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "rotatable", "rotation_period_days": 30 }))
        .await
        .json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();

    ctx.server
        .post(&format!("/api/v1/cells/{cell_id}/secrets/k"))
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "value": STANDARD.encode(b"v1") }))
        .await
        .assert_status_ok();

    let rotate = ctx
        .server
        .post(&format!("/api/v1/cells/{cell_id}/rotate"))
        .authorization_bearer(&token)
        .await;
    rotate.assert_status_ok();
    let body: serde_json::Value = rotate.json();
    assert_eq!(body["data"]["old_version"], 1);
    assert_eq!(body["data"]["new_version"], 2);

    let read = ctx
        .server
        .get(&format!("/api/v1/cells/{cell_id}/secrets/k"))
        .authorization_bearer(&token)
        .await;
    read.assert_status_ok();
    let body: serde_json::Value = read.json();
    assert_eq!(STANDARD.decode(body["data"]["value"].as_str().unwrap()).unwrap(), b"v1");
}

#[tokio::test]
async fn non_admin_cannot_rotate_or_schedule_rotation() {
    let ctx = TestContext::new();
    let su_token = ctx.superuser_token();

    let created: serde_json::Value = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&su_token)
        .json(&serde_json::json!({ "name": "guarded", "rotation_period_days": 30 }))
        .await
        .json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();

    let writer_token = ctx.user_token("writer");
    ctx.server
        .post(&format!("/api/v1/cells/{cell_id}/permissions"))
        .authorization_bearer(&su_token)
        .json(&serde_json::json!({ "user_id": "writer", "grant": "write" }))
        .await
        .assert_status_ok();

    ctx.server
        .post(&format!("/api/v1/cells/{cell_id}/rotate"))
        .authorization_bearer(&writer_token)
        .await
        .assert_status_forbidden();

    ctx.server
        .post(&format!("/api/v1/cells/{cell_id}/rotation-schedule"))
        .authorization_bearer(&writer_token)
        .json(&serde_json::json!({ "interval_days": 7 }))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn schedule_rotation_accepts_an_interval() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    let created: serde_json::Value = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "scheduled", "rotation_period_days": 30 }))
        .await
        .json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();

    ctx.server
        .post(&format!("/api/v1/cells/{cell_id}/rotation-schedule"))
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "interval_days": 7 }))
        .await
        .assert_status_ok();
}
