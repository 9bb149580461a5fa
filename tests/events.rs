#[macro_use]
mod common;

use actix::prelude::*;
use actix_web::test;
use crm_backend::event_hub::{EventHub, ServerEvent, Subscribe, Unsubscribe};
use serde_json::{json, Value};

#[derive(Default)]
struct Listener {
    seen: Vec<ServerEvent>,
}

impl Actor for Listener {
    type Context = Context<Self>;
}

impl Handler<ServerEvent> for Listener {
    type Result = ();

    fn handle(&mut self, msg: ServerEvent, _: &mut Context<Self>) {
        self.seen.push(msg);
    }
}

#[derive(Message)]
#[rtype(result = "Vec<ServerEvent>")]
struct Drain;

impl Handler<Drain> for Listener {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.seen))
    }
}

async fn listen(hub: &Addr<EventHub>, rooms: &[&str]) -> Addr<Listener> {
    let listener = Listener::default().start();
    for room in rooms {
        hub.send(Subscribe {
            session_id: "listener".to_string(),
            room: room.to_string(),
            addr: listener.clone().recipient(),
        })
        .await
        .unwrap();
    }
    listener
}

/// Waits until the hub has fanned out everything queued so far, then takes
/// what the listener received.
async fn drain(hub: &Addr<EventHub>, listener: &Addr<Listener>) -> Vec<ServerEvent> {
    hub.send(Unsubscribe {
        session_id: "nobody".to_string(),
        room: "nowhere".to_string(),
    })
    .await
    .unwrap();
    listener.send(Drain).await.unwrap()
}

#[actix_web::test]
async fn lead_changes_are_published_to_the_leads_room() {
    let (state, hub) = common::state_with_hub().await;
    let app = test_app!(state);
    let listener = listen(&hub, &["leads"]).await;

    let req = test::TestRequest::post()
        .uri("/leads")
        .set_json(json!({ "name": "Alice" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/leads/{id}"))
        .set_json(json!({ "lead_status": "Hot" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::delete().uri(&format!("/leads/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let events = drain(&hub, &listener).await;
    let names: Vec<&str> = events.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(names, ["lead-created", "lead-updated", "lead-deleted"]);
    assert_eq!(events[0].payload, created);
    assert_eq!(events[1].payload, updated);
    assert_eq!(events[1].payload["lead_status"], "Hot");
    assert_eq!(events[2].payload, json!(id));
}

#[actix_web::test]
async fn bulk_insert_publishes_one_event() {
    let (state, hub) = common::state_with_hub().await;
    let app = test_app!(state);
    let listener = listen(&hub, &["companies", "leads"]).await;

    let req = test::TestRequest::post()
        .uri("/companies/bulk")
        .set_json(json!([{ "name": "Acme" }, { "name": "Globex" }]))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let events = drain(&hub, &listener).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "companies-bulk-created");
    assert_eq!(events[0].payload.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn failed_writes_publish_nothing() {
    let (state, hub) = common::state_with_hub().await;
    let app = test_app!(state);
    let listener = listen(&hub, &["leads"]).await;

    let req = test::TestRequest::post()
        .uri("/leads")
        .set_json(json!({ "email": "no-name@acme.io" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::delete().uri("/leads/missing").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    assert!(drain(&hub, &listener).await.is_empty());
}

#[actix_web::test]
async fn notifications_reach_only_their_owner() {
    let (state, hub) = common::state_with_hub().await;
    let app = test_app!(state);
    let listener = listen(&hub, &["user-u1"]).await;

    for (owner, title) in [("u1", "Yours"), ("u2", "Someone else's")] {
        let req = test::TestRequest::post()
            .uri("/notifications")
            .insert_header(common::bearer(&state, owner))
            .set_json(json!({ "title": title, "message": "m" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let events = drain(&hub, &listener).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "notification-created");
    assert_eq!(events[0].payload["title"], "Yours");
    assert_eq!(events[0].payload["user_id"], "u1");
}
