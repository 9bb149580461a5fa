use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use mongodb::bson::{from_document, Document};

use crate::app_state::AppState;
use crate::db::{Filter, StoreError};
use crate::error::ApiResult;
use crate::models::settings::SETTINGS_ID;
use crate::models::{set_document, Entity, Settings, SettingsPatch};

/// Reads or creates the single settings document in one atomic write.
async fn upsert(data: &AppState, set: Document) -> ApiResult<Settings> {
    let on_insert = Settings::defaults_without(Utc::now(), &set);
    let filter = Filter::id(SETTINGS_ID);
    let store = data.store();
    let document = match store
        .upsert_one(Settings::COLLECTION, &filter, set.clone(), on_insert.clone())
        .await
    {
        // two first writers raced on the fixed id; the loser now finds the document
        Err(StoreError::Duplicate { .. }) => {
            store
                .upsert_one(Settings::COLLECTION, &filter, set, on_insert)
                .await?
        }
        other => other?,
    };
    Ok(from_document(document)?)
}

pub async fn get_settings(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let settings = upsert(&data, Document::new()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// Serves both `PUT` and `POST`; a first write creates the document.
pub async fn update_settings(
    data: web::Data<AppState>,
    body: web::Json<SettingsPatch>,
) -> ApiResult<HttpResponse> {
    let set = set_document::<Settings, _>(&body.into_inner())?;
    let settings = upsert(&data, set).await?;
    info!("Settings updated");
    Ok(HttpResponse::Ok().json(settings))
}
