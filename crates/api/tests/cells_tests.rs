mod common;

use common::TestContext;

#[tokio::test]
async fn superuser_can_create_and_fetch_a_cell() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    let create = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "payments", "rotation_period_days": 14 }))
        .await;
    create.assert_status_ok();
    let created: serde_json::Value = create.json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["rotation_period_days"], 14);

    let fetched = ctx
        .server
        .get(&format!("/api/v1/cells/{cell_id}"))
        .authorization_bearer(&token)
        .await;
    fetched.assert_status_ok();
    let body: serde_json::Value = fetched.json();
    assert_eq!(body["data"]["name"], "payments");
}

#[tokio::test]
async fn non_superuser_cannot_create_a_cell() {
    let ctx = TestContext::new();
    let token = ctx.user_token("alice");

    let response = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "payments", "rotation_period_days": 14 }))
        .await;
    response.assert_status_forbidden();
}

#[tokio::test]
async fn list_cells_includes_created_cells() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    ctx.server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "one", "rotation_period_days": 30 }))
        .await
        .assert_status_ok();
    ctx.server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "two", "rotation_period_days": 30 }))
        .await
        .assert_status_ok();

    let response = ctx.server.get("/api/v1/cells").authorization_bearer(&token).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"one"));
    assert!(names.contains(&"two"));
}

#[tokio::test]
async fn admin_can_update_and_delete_a_cell() {
    let ctx = TestContext::new();
    let token = ctx.superuser_token();

    let created: serde_json::Value = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "name": "scratch", "rotation_period_days": 30 }))
        .await
        .json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();

    let updated = ctx
        .server
        .patch(&format!("/api/v1/cells/{cell_id}"))
        .authorization_bearer(&token)
        .json(&serde_json::json!({ "description": "now with a description" }))
        .await;
    updated.assert_status_ok();
    let body: serde_json::Value = updated.json();
    assert_eq!(body["data"]["description"], "now with a description");

    ctx.server
        .delete(&format!("/api/v1/cells/{cell_id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    ctx.server
        .get(&format!("/api/v1/cells/{cell_id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn non_admin_cannot_update_a_cell() {
    let ctx = TestContext::new();
    let su_token = ctx.superuser_token();
    let user_token = ctx.user_token("bob");

    let created: serde_json::Value = ctx
        .server
        .post("/api/v1/cells")
        .authorization_bearer(&su_token)
        .json(&serde_json::json!({ "name": "scratch", "rotation_period_days": 30 }))
        .await
        .json();
    let cell_id = created["data"]["id"].as_str().unwrap().to_string();

    ctx.server
        .patch(&format!("/api/v1/cells/{cell_id}"))
        .authorization_bearer(&user_token)
        .json(&serde_json::json!({ "description": "should not work" }))
        .await
        .assert_status_forbidden();
}
