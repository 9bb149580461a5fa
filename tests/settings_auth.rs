#[macro_use]
mod common;

use actix_web::test;
use crm_backend::db::Filter;
use serde_json::{json, Value};

#[actix_web::test]
async fn first_read_creates_defaults() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/settings").to_request();
    let settings: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(settings["_id"], "settings");
    assert_eq!(settings["user_name"], "CRM User");
    assert!(settings["sectors"].as_array().unwrap().contains(&json!("Technology")));
    assert_eq!(
        settings["activity_types"],
        json!(["call", "email", "visit", "meeting"])
    );
}

#[actix_web::test]
async fn repeated_writes_keep_one_document() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::put()
        .uri("/settings")
        .set_json(json!({ "user_name": "Dana", "user_email": "Dana@Acme.IO" }))
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["user_name"], "Dana");
    assert_eq!(first["user_email"], "dana@acme.io");
    assert_eq!(first["activity_types"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::post()
        .uri("/settings")
        .set_json(json!({ "sectors": ["Logistics"] }))
        .to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second["user_name"], "Dana");
    assert_eq!(second["sectors"], json!(["Logistics"]));
    assert_eq!(second["created_at"], first["created_at"]);

    let count = state.store().count("settings", &Filter::All).await.unwrap();
    assert_eq!(count, 1);
}

#[actix_web::test]
async fn blank_user_name_is_rejected() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::put()
        .uri("/settings")
        .set_json(json!({ "user_name": "  " }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

fn register(email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": "Dana", "email": email, "password": "s3cret" }))
}

#[actix_web::test]
async fn register_issues_a_token() {
    let state = common::state().await;
    let app = test_app!(state);

    let resp = test::call_service(&app, register("Dana@Acme.io").to_request()).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["name"], "Dana");
    assert_eq!(body["user"]["email"], "dana@acme.io");
    assert!(body["user"]["id"].is_string());
    assert!(body["user"].get("password").is_none());

    let resp = test::call_service(&app, register("dana@acme.io").to_request()).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User already exists");
}

#[actix_web::test]
async fn login_checks_the_password() {
    let state = common::state().await;
    let app = test_app!(state);
    test::call_service(&app, register("dana@acme.io").to_request()).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "DANA@acme.io", "password": "s3cret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    for (email, password) in [("dana@acme.io", "wrong"), ("nobody@acme.io", "s3cret")] {
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid credentials");
    }

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["email"], "dana@acme.io");
    assert_eq!(me["role"], "user");
    assert!(me.get("password").is_none());
}

#[actix_web::test]
async fn health_reports_the_store() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["database"], "up");
}
