#[macro_use]
mod common;

use actix_web::test;
use serde_json::{json, Value};

#[actix_web::test]
async fn created_company_reads_back_unchanged() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/companies")
        .set_json(json!({ "name": "  Acme ", "industry": "Retail", "email": "Sales@Acme.IO" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["name"], "Acme");
    assert_eq!(created["email"], "sales@acme.io");

    let id = created["_id"].as_str().unwrap();
    let req = test::TestRequest::get().uri(&format!("/companies/{id}")).to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);
}

#[actix_web::test]
async fn contact_expands_its_company() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/companies")
        .set_json(json!({ "name": "Acme" }))
        .to_request();
    let company: Value = test::call_and_read_body_json(&app, req).await;
    let company_id = company["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/contacts")
        .set_json(json!({ "first_name": "Jo", "last_name": "Doe", "company_id": company_id }))
        .to_request();
    let contact: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/contacts/{}", contact["_id"].as_str().unwrap()))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["company_id"], json!({ "_id": company_id, "name": "Acme" }));
    assert_eq!(fetched["full_name"], "Jo Doe");
}

#[actix_web::test]
async fn missing_required_fields_are_listed() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/activities")
        .set_json(json!({ "description": "no title" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.contains(&json!("title is required")));
    assert!(errors.contains(&json!("start_time is required")));
}

#[actix_web::test]
async fn enum_violations_are_rejected() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/opportunities")
        .set_json(json!({ "title": "Renewal", "status": "maybe" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri("/opportunities")
        .set_json(json!({ "title": "Renewal", "probability": 140 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn free_text_dates_are_rejected() {
    let state = common::state().await;
    let app = test_app!(state);

    for (uri, body) in [
        ("/activities", json!({ "title": "Call", "type": "call", "start_time": "banana" })),
        ("/expenses", json!({ "description": "Taxi", "amount": 5.0, "date": "whenever" })),
        ("/opportunities", json!({ "title": "Renewal", "close_date": "Q5 2099" })),
        ("/leads", json!({ "name": "Alice", "next_followup": "next week" })),
    ] {
        let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Validation failed");
    }

    let req = test::TestRequest::get().uri("/activities").to_request();
    let activities: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(activities.is_empty());
}

#[actix_web::test]
async fn dates_are_stored_in_one_format() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/activities")
        .set_json(json!({
            "title": "Call",
            "type": "call",
            "start_time": "2026-03-01T11:30:00+02:00",
            "end_time": "2026-03-01T10:00:00Z",
        }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["start_time"], "2026-03-01T09:30:00.000Z");
    assert_eq!(created["end_time"], "2026-03-01T10:00:00.000Z");

    let req = test::TestRequest::put()
        .uri(&format!("/activities/{}", created["_id"].as_str().unwrap()))
        .set_json(json!({ "start_time": "2026-03-02", "end_time": "2026-03-01" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/expenses")
        .set_json(json!({ "description": "Taxi", "amount": 5.0, "date": "2024-03-01" }))
        .to_request();
    let expense: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(expense["date"], "2024-03-01T00:00:00.000Z");
}

#[actix_web::test]
async fn negative_expense_is_rejected() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/expenses")
        .set_json(json!({ "description": "Taxi", "amount": -5.0, "date": "2024-03-01" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn update_merges_fields_and_stamps_time() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/opportunities")
        .set_json(json!({ "title": "Renewal", "amount": 1000.0 }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["_id"].as_str().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/opportunities/{id}"))
        .set_json(json!({ "status": "won" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["status"], "won");
    assert_eq!(updated["amount"], 1000.0);
    assert_eq!(updated["title"], "Renewal");
    assert!(updated["updated_at"].as_str() >= created["updated_at"].as_str());
}

#[actix_web::test]
async fn unknown_ids_are_not_found() {
    let state = common::state().await;
    let app = test_app!(state);

    for (method, uri) in [
        (actix_web::http::Method::GET, "/companies/nope"),
        (actix_web::http::Method::PUT, "/companies/nope"),
        (actix_web::http::Method::DELETE, "/companies/nope"),
    ] {
        let req = test::TestRequest::default()
            .method(method)
            .uri(uri)
            .set_json(json!({ "name": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Company not found");
    }
}

#[actix_web::test]
async fn delete_confirms_and_removes() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/expenses")
        .set_json(json!({ "description": "Taxi", "amount": 12.5, "date": "2024-03-01" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/expenses/{}", created["_id"].as_str().unwrap());

    let req = test::TestRequest::delete().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "message": "Expense deleted" }));

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn lists_are_newest_first() {
    let state = common::state().await;
    let app = test_app!(state);

    for name in ["First", "Second", "Third"] {
        let req = test::TestRequest::post()
            .uri("/companies")
            .set_json(json!({ "name": name }))
            .to_request();
        test::call_service(&app, req).await;
        tokio::time::sleep(std::time::Duration::from_millis(3)).await;
    }

    let req = test::TestRequest::get().uri("/companies").to_request();
    let companies: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = companies.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Third", "Second", "First"]);
}

#[actix_web::test]
async fn bulk_create_is_all_or_nothing() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/contacts/bulk")
        .set_json(json!([
            { "first_name": "Ann", "last_name": "Lee" },
            { "first_name": "Bob" },
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"], json!(["[1] last_name is required"]));

    let req = test::TestRequest::get().uri("/contacts").to_request();
    let contacts: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(contacts.is_empty());

    let req = test::TestRequest::post()
        .uri("/contacts/bulk")
        .set_json(json!([
            { "first_name": "Ann", "last_name": "Lee" },
            { "first_name": "Bob", "last_name": "Ray" },
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(created.len(), 2);
}

#[actix_web::test]
async fn malformed_json_is_a_validation_error() {
    let state = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/companies")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
}
