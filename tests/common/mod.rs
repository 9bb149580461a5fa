#![allow(dead_code)]

use std::sync::Arc;

use actix_web::http::header;
use actix_web::web;
use crm_backend::app_state::AppState;
use crm_backend::auth::create_jwt;
use crm_backend::config::Config;
use crm_backend::db::{ensure_indexes, MemoryStore};
use actix::{Actor, Addr};
use crm_backend::event_hub::{EventHub, EventPublisher};

/// Builds the full application around `$state` for `actix_web::test` calls.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(crm_backend::configure),
        )
        .await
    };
}

async fn state_with(events: EventPublisher) -> web::Data<AppState> {
    let store = Arc::new(MemoryStore::new());
    ensure_indexes(store.as_ref()).await.unwrap();
    web::Data::new(AppState::new(store, events, Config::default()))
}

pub async fn state() -> web::Data<AppState> {
    state_with(EventPublisher::disabled()).await
}

/// State whose handlers publish to a running hub.
pub async fn state_with_hub() -> (web::Data<AppState>, Addr<EventHub>) {
    let hub = EventHub::new().start();
    (state_with(EventPublisher::new(hub.clone())).await, hub)
}

pub fn bearer(state: &AppState, user_id: &str) -> (header::HeaderName, String) {
    let token = create_jwt(user_id, &state.config.jwt_secret, 1).unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}
