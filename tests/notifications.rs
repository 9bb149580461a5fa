#[macro_use]
mod common;

use actix_web::test;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

fn parse_time(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/notifications").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No token, authorization denied");

    let req = test::TestRequest::get()
        .uri("/notifications")
        .insert_header(("Authorization", "Bearer garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Token is not valid");
}

#[actix_web::test]
async fn priority_sets_default_expiry() {
    let state = common::state().await;
    let app = test_app!(state);
    let auth = common::bearer(&state, "u1");

    let before = Utc::now();
    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(auth.clone())
        .set_json(json!({ "title": "Digest", "message": "Weekly", "priority": "low" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let low: Value = test::read_body_json(resp).await;
    assert_eq!(low["user_id"], "u1");
    assert_eq!(low["is_read"], false);
    let expires = parse_time(&low["expires_at"]);
    assert!(expires >= before + Duration::days(7) - Duration::seconds(1));
    assert!(expires <= Utc::now() + Duration::days(7));

    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(auth)
        .set_json(json!({ "title": "Outage", "message": "DB down", "priority": "high" }))
        .to_request();
    let high: Value = test::call_and_read_body_json(&app, req).await;
    assert!(high.get("expires_at").is_none());
}

#[actix_web::test]
async fn other_users_notifications_are_off_limits() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(common::bearer(&state, "u2"))
        .set_json(json!({ "title": "Private", "message": "for u2" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["_id"].as_str().unwrap();
    let intruder = common::bearer(&state, "u1");

    let req = test::TestRequest::put()
        .uri(&format!("/notifications/{id}/read"))
        .insert_header(intruder.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Access denied");

    let req = test::TestRequest::delete()
        .uri(&format!("/notifications/{id}"))
        .insert_header(intruder)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/notifications/{id}"))
        .insert_header(common::bearer(&state, "u2"))
        .to_request();
    let unchanged: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unchanged, created);
}

#[actix_web::test]
async fn mark_as_read_stamps_once() {
    let state = common::state().await;
    let app = test_app!(state);
    let auth = common::bearer(&state, "u1");

    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(auth.clone())
        .set_json(json!({ "title": "Ping", "message": "pong" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/notifications/{}/read", created["_id"].as_str().unwrap());

    let req = test::TestRequest::put().uri(&uri).insert_header(auth.clone()).to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["is_read"], true);
    assert!(first["read_at"].is_string());

    let req = test::TestRequest::put().uri(&uri).insert_header(auth).to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second["read_at"], first["read_at"]);
}

#[actix_web::test]
async fn expired_notifications_are_hidden() {
    let state = common::state().await;
    let app = test_app!(state);
    let auth = common::bearer(&state, "u1");

    for (title, expires_at) in [("Old", Some("2020-01-01T00:00:00Z")), ("Fresh", None)] {
        let mut body = json!({ "title": title, "message": "m", "priority": "urgent" });
        if let Some(at) = expires_at {
            body["expires_at"] = json!(at);
        }
        let req = test::TestRequest::post()
            .uri("/notifications")
            .insert_header(auth.clone())
            .set_json(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let req = test::TestRequest::get()
        .uri("/notifications")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Fresh"]);
    assert_eq!(body["pagination"]["total"], 1);

    let req = test::TestRequest::get()
        .uri("/notifications/count")
        .insert_header(auth)
        .to_request();
    let counts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(counts, json!({ "total": 1, "unread": 1 }));
}

#[actix_web::test]
async fn mark_all_read_reports_changes() {
    let state = common::state().await;
    let app = test_app!(state);
    let auth = common::bearer(&state, "u1");

    for title in ["One", "Two", "Three"] {
        let req = test::TestRequest::post()
            .uri("/notifications")
            .insert_header(auth.clone())
            .set_json(json!({ "title": title, "message": "m" }))
            .to_request();
        test::call_service(&app, req).await;
    }
    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(common::bearer(&state, "u2"))
        .set_json(json!({ "title": "Theirs", "message": "m" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri("/notifications/mark-all-read")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({ "message": "3 notifications marked as read", "modifiedCount": 3 })
    );

    let req = test::TestRequest::get()
        .uri("/notifications/count")
        .insert_header(auth)
        .to_request();
    let counts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(counts, json!({ "total": 3, "unread": 0 }));

    let req = test::TestRequest::get()
        .uri("/notifications/count")
        .insert_header(common::bearer(&state, "u2"))
        .to_request();
    let counts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(counts["unread"], 1);
}

#[actix_web::test]
async fn related_entity_must_exist() {
    let state = common::state().await;
    let app = test_app!(state);
    let auth = common::bearer(&state, "u1");

    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(auth.clone())
        .set_json(json!({
            "title": "Deal moved",
            "message": "m",
            "related_entity": { "type": "opportunity", "entity_id": "missing" },
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/opportunities")
        .set_json(json!({ "title": "Renewal" }))
        .to_request();
    let deal: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/notifications")
        .insert_header(auth)
        .set_json(json!({
            "title": "Deal moved",
            "message": "m",
            "related_entity": { "type": "opportunity", "entity_id": deal["_id"] },
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}
