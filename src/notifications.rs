use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{Filter, SortOrder, Store};
use crate::error::{ApiError, ApiResult};
use crate::event_hub::EventPublisher;
use crate::middleware::AuthenticatedUser;
use crate::models::notification::{NotificationType, Priority, RelatedEntity};
use crate::models::{timestamp, Entity, NewNotification, Notification};
use crate::repository::{self, PageRequest};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub priority: Option<Priority>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

/// The requester's notifications that have not lapsed.
fn active_for(user_id: &str) -> Vec<Filter> {
    vec![
        Filter::eq("user_id", user_id),
        Notification::active_filter(Utc::now()),
    ]
}

fn owned(id: &str, user_id: &str) -> Filter {
    Filter::all_of(vec![Filter::id(id), Filter::eq("user_id", user_id)])
}

/// Loads a notification and checks it belongs to `user_id`.
async fn load_owned(store: &dyn Store, id: &str, user_id: &str) -> ApiResult<Notification> {
    let notification = repository::find_by_id::<Notification>(store, id).await?;
    if !notification.is_owned_by(user_id) {
        return Err(ApiError::AccessDenied);
    }
    Ok(notification)
}

async fn ensure_related_exists(store: &dyn Store, related: &RelatedEntity) -> ApiResult<()> {
    let found = store
        .find_one(related.collection(), &Filter::id(related.entity_id()))
        .await?;
    if found.is_none() {
        return Err(ApiError::Validation(vec![format!(
            "related_entity {} {} does not exist",
            related.collection(),
            related.entity_id()
        )]));
    }
    Ok(())
}

/// Persists a notification and pushes it to its owner's room.
pub async fn deliver(
    store: &dyn Store,
    events: &EventPublisher,
    notification: &Notification,
) -> ApiResult<Notification> {
    if let Some(related) = &notification.related_entity {
        ensure_related_exists(store, related).await?;
    }
    let notification = repository::insert(store, notification).await?;
    info!("Notification {} created for {}", notification.id, notification.user_id);
    events.emit(
        &Notification::room_for(&notification.user_id),
        format!("{}-created", Notification::EVENT),
        &notification,
    );
    Ok(notification)
}

/// Server-side notification for automated events, addressed to `user_id`.
#[allow(clippy::too_many_arguments)]
pub async fn create_system_notification(
    store: &dyn Store,
    events: &EventPublisher,
    user_id: &str,
    title: &str,
    message: &str,
    kind: NotificationType,
    priority: Priority,
    related_entity: Option<RelatedEntity>,
) -> ApiResult<Notification> {
    let draft = NewNotification {
        title: Some(title.to_string()),
        message: Some(message.to_string()),
        kind: Some(kind),
        priority: Some(priority),
        user_id: Some(user_id.to_string()),
        related_entity,
        expires_at: None,
        metadata: None,
    };
    let notification = draft.into_notification(user_id, Utc::now())?;
    deliver(store, events, &notification).await
}

pub async fn list_notifications(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<NotificationQuery>,
) -> ApiResult<HttpResponse> {
    let request = PageRequest::new(
        query.page,
        query.limit,
        query.sort_by.as_deref(),
        "created_at",
        query.sort_order,
    )?;
    let mut clauses = active_for(user.id());
    if let Some(is_read) = query.is_read {
        clauses.push(Filter::eq("is_read", is_read));
    }
    if let Some(kind) = query.kind {
        clauses.push(Filter::eq("type", kind.as_str()));
    }
    if let Some(priority) = query.priority {
        clauses.push(Filter::eq("priority", priority.as_str()));
    }

    let (notifications, pagination) =
        repository::page::<Notification>(data.store(), &Filter::all_of(clauses), &request).await?;
    Ok(HttpResponse::Ok().json(json!({
        "notifications": notifications,
        "pagination": pagination,
    })))
}

pub async fn notification_count(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let active = active_for(user.id());
    let total = data
        .store()
        .count(Notification::COLLECTION, &Filter::all_of(active.clone()))
        .await?;
    let mut unread = active;
    unread.push(Filter::eq("is_read", false));
    let unread = data
        .store()
        .count(Notification::COLLECTION, &Filter::all_of(unread))
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "total": total, "unread": unread })))
}

pub async fn get_notification(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let notification = load_owned(data.store(), &path, user.id()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

pub async fn create_notification(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<NewNotification>,
) -> ApiResult<HttpResponse> {
    let notification = body.into_inner().into_notification(user.id(), Utc::now())?;
    let notification = deliver(data.store(), &data.events, &notification).await?;
    Ok(HttpResponse::Created().json(notification))
}

pub async fn mark_as_read(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let notification = load_owned(data.store(), &path, user.id()).await?;
    if notification.is_read {
        return Ok(HttpResponse::Ok().json(notification));
    }

    let now = timestamp::format(&Utc::now());
    let updated: Notification = repository::apply(
        data.store(),
        &owned(&path, user.id()),
        doc! { "is_read": true, "read_at": now.as_str(), "updated_at": now.as_str() },
    )
    .await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn mark_all_as_read(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let now = timestamp::format(&Utc::now());
    let filter = Filter::all_of(vec![
        Filter::eq("user_id", user.id()),
        Filter::eq("is_read", false),
    ]);
    let modified = data
        .store()
        .update_many(
            Notification::COLLECTION,
            &filter,
            doc! { "is_read": true, "read_at": now.as_str(), "updated_at": now.as_str() },
        )
        .await?;

    info!("{} notification(s) marked read for {}", modified, user.id());
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{modified} notifications marked as read"),
        "modifiedCount": modified,
    })))
}

pub async fn delete_notification(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    load_owned(data.store(), &path, user.id()).await?;
    repository::delete_where::<Notification>(data.store(), &owned(&path, user.id())).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Notification deleted" })))
}
