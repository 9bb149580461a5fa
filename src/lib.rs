//! CRM backend: REST handlers over a document store plus live change events.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod emails;
pub mod error;
pub mod event_hub;
pub mod leads;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod resource;
pub mod settings;
pub mod web_socket_server;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::{json_error_handler, query_error_handler};
use crate::middleware::RequireAuth;
use crate::models::{
    Activity, ActivityPatch, Company, CompanyPatch, Contact, ContactPatch, EmailLog,
    EmailLogPatch, Expense, ExpensePatch, Lead, LeadPatch, NewActivity, NewCompany, NewContact,
    NewEmailLog, NewExpense, NewLead, NewOpportunity, Opportunity, OpportunityPatch,
};

async fn health(data: web::Data<AppState>) -> HttpResponse {
    match data.store().ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok", "database": "up" })),
        Err(e) => HttpResponse::ServiceUnavailable()
            .json(json!({ "status": "degraded", "database": "down", "error": e.to_string() })),
    }
}

/// Route table for the whole API. Static segments such as `/stats` are
/// registered ahead of `/{id}` so they are not captured as ids.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/health", web::get().to(health))
        .route("/ws", web::get().to(web_socket_server::ws_index))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/me")
                        .wrap(RequireAuth)
                        .route(web::get().to(auth::me)),
                ),
        )
        .service(
            web::scope("/companies")
                .route("", web::get().to(resource::list::<Company>))
                .route("", web::post().to(resource::create::<NewCompany>))
                .route("/bulk", web::post().to(resource::create_bulk::<NewCompany>))
                .route("/{id}", web::get().to(resource::get::<Company>))
                .route("/{id}", web::put().to(resource::update::<Company, CompanyPatch>))
                .route("/{id}", web::delete().to(resource::delete::<Company>)),
        )
        .service(
            web::scope("/contacts")
                .route("", web::get().to(resource::list::<Contact>))
                .route("", web::post().to(resource::create::<NewContact>))
                .route("/bulk", web::post().to(resource::create_bulk::<NewContact>))
                .route("/{id}", web::get().to(resource::get::<Contact>))
                .route("/{id}", web::put().to(resource::update::<Contact, ContactPatch>))
                .route("/{id}", web::delete().to(resource::delete::<Contact>)),
        )
        .service(
            web::scope("/opportunities")
                .route("", web::get().to(resource::list::<Opportunity>))
                .route("", web::post().to(resource::create::<NewOpportunity>))
                .route("/bulk", web::post().to(resource::create_bulk::<NewOpportunity>))
                .route("/{id}", web::get().to(resource::get::<Opportunity>))
                .route(
                    "/{id}",
                    web::put().to(resource::update::<Opportunity, OpportunityPatch>),
                )
                .route("/{id}", web::delete().to(resource::delete::<Opportunity>)),
        )
        .service(
            web::scope("/activities")
                .route("", web::get().to(resource::list::<Activity>))
                .route("", web::post().to(resource::create::<NewActivity>))
                .route("/{id}", web::get().to(resource::get::<Activity>))
                .route("/{id}", web::put().to(resource::update::<Activity, ActivityPatch>))
                .route("/{id}", web::delete().to(resource::delete::<Activity>)),
        )
        .service(
            web::scope("/expenses")
                .route("", web::get().to(resource::list::<Expense>))
                .route("", web::post().to(resource::create::<NewExpense>))
                .route("/{id}", web::get().to(resource::get::<Expense>))
                .route("/{id}", web::put().to(resource::update::<Expense, ExpensePatch>))
                .route("/{id}", web::delete().to(resource::delete::<Expense>)),
        )
        .service(
            web::scope("/leads")
                .route("", web::get().to(leads::list_leads))
                .route("", web::post().to(resource::create::<NewLead>))
                .route("/stats", web::get().to(leads::lead_stats))
                .route("/bulk", web::post().to(resource::create_bulk::<NewLead>))
                .route("/{id}", web::get().to(resource::get::<Lead>))
                .route("/{id}", web::put().to(resource::update::<Lead, LeadPatch>))
                .route("/{id}", web::delete().to(resource::delete::<Lead>)),
        )
        .service(
            web::scope("/emails")
                .route("", web::get().to(emails::list_emails))
                .route("", web::post().to(resource::create::<NewEmailLog>))
                .route("/stats", web::get().to(emails::email_stats))
                .route("/{id}", web::get().to(resource::get::<EmailLog>))
                .route("/{id}", web::put().to(resource::update::<EmailLog, EmailLogPatch>))
                .route("/{id}", web::delete().to(resource::delete::<EmailLog>)),
        )
        .service(
            web::scope("/notifications")
                .wrap(RequireAuth)
                .route("", web::get().to(notifications::list_notifications))
                .route("", web::post().to(notifications::create_notification))
                .route("/count", web::get().to(notifications::notification_count))
                .route("/mark-all-read", web::put().to(notifications::mark_all_as_read))
                .route("/{id}", web::get().to(notifications::get_notification))
                .route("/{id}", web::delete().to(notifications::delete_notification))
                .route("/{id}/read", web::put().to(notifications::mark_as_read)),
        )
        .service(
            web::scope("/settings")
                .route("", web::get().to(settings::get_settings))
                .route("", web::put().to(settings::update_settings))
                .route("", web::post().to(settings::update_settings)),
        );
}
