//! Handlers shared by the plain CRUD families (companies, contacts,
//! opportunities, activities, expenses) and reused by leads and e-mail logs.

use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{Filter, FindOptions, SortOrder};
use crate::error::{ApiError, ApiResult};
use crate::models::{Draft, Entity, Patch};
use crate::repository;

pub fn created_event<E: Entity>() -> String {
    format!("{}-created", E::EVENT)
}

pub fn updated_event<E: Entity>() -> String {
    format!("{}-updated", E::EVENT)
}

pub fn deleted_event<E: Entity>() -> String {
    format!("{}-deleted", E::EVENT)
}

pub fn bulk_created_event<E: Entity>() -> String {
    format!("{}-bulk-created", E::ROOM)
}

/// Every document, newest first.
pub async fn list<E: Entity>(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let items = repository::list::<E>(
        data.store(),
        &Filter::All,
        &FindOptions::sorted("created_at", SortOrder::Desc),
    )
    .await?;
    Ok(HttpResponse::Ok().json(repository::expand(data.store(), &items).await?))
}

pub async fn get<E: Entity>(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let entity = repository::find_by_id::<E>(data.store(), &path).await?;
    Ok(HttpResponse::Ok().json(repository::expand_one(data.store(), &entity).await?))
}

pub async fn create<D: Draft>(
    data: web::Data<AppState>,
    body: web::Json<D>,
) -> ApiResult<HttpResponse> {
    let entity = repository::insert(data.store(), &body.into_inner().build()?).await?;
    let view = repository::expand_one(data.store(), &entity).await?;

    info!("{} created", D::Entity::LABEL);
    data.events
        .emit(D::Entity::ROOM, created_event::<D::Entity>(), &view);
    Ok(HttpResponse::Created().json(view))
}

/// Validates every draft before inserting any, so a bad element rejects the batch.
pub async fn create_bulk<D: Draft>(
    data: web::Data<AppState>,
    body: web::Json<Vec<D>>,
) -> ApiResult<HttpResponse> {
    let mut entities = Vec::new();
    let mut errors = Vec::new();
    for (index, draft) in body.into_inner().into_iter().enumerate() {
        match draft.build() {
            Ok(entity) => entities.push(entity),
            Err(ApiError::Validation(found)) => {
                errors.extend(found.into_iter().map(|e| format!("[{index}] {e}")));
            }
            Err(e) => return Err(e),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let entities = repository::insert_many(data.store(), &entities).await?;
    let views = repository::expand(data.store(), &entities).await?;

    info!("{} {} record(s) bulk created", views.len(), D::Entity::LABEL);
    data.events
        .emit(D::Entity::ROOM, bulk_created_event::<D::Entity>(), &views);
    Ok(HttpResponse::Created().json(views))
}

pub async fn update<E: Entity, P: Patch + serde::de::DeserializeOwned>(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<P>,
) -> ApiResult<HttpResponse> {
    let entity = repository::update::<E, P>(data.store(), &path, &body).await?;
    let view = repository::expand_one(data.store(), &entity).await?;

    data.events.emit(E::ROOM, updated_event::<E>(), &view);
    Ok(HttpResponse::Ok().json(view))
}

pub async fn delete<E: Entity>(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    repository::delete::<E>(data.store(), &id).await?;

    info!("{} {} deleted", E::LABEL, id);
    data.events.emit(E::ROOM, deleted_event::<E>(), &id);
    Ok(HttpResponse::Ok().json(json!({ "message": format!("{} deleted", E::LABEL) })))
}
