use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{Filter, StoreError};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::user::User;
use crate::models::{check, new_id, require, required};
use crate::repository;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn create_jwt(user_id: &str, secret: &str, ttl_hours: i64) -> ApiResult<String> {
    let expiration = Utc::now() + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[derive(Debug, Deserialize)]
pub struct RegisterInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInfo {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    web::block(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Error hashing password: {e}")))
}

async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    web::block(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Error verifying password: {e}")))
}

fn issue(data: &AppState, user: &User) -> ApiResult<serde_json::Value> {
    let token = create_jwt(&user.id, &data.config.jwt_secret, data.config.jwt_ttl_hours)?;
    Ok(json!({ "token": token, "user": user.summary() }))
}

pub async fn register(
    data: web::Data<AppState>,
    info: web::Json<RegisterInfo>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    let mut errors = Vec::new();
    require(&mut errors, "name", info.name.as_deref());
    require(&mut errors, "email", info.email.as_deref());
    require(&mut errors, "password", info.password.as_deref());
    check(errors)?;

    let email = normalize_email(&required(info.email));
    let taken = repository::find_one::<User>(data.store(), &Filter::eq("email", email.as_str()))
        .await?
        .is_some();
    if taken {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password = hash_password(required(info.password), data.config.bcrypt_cost).await?;
    let now = Utc::now();
    let user = User {
        id: new_id(),
        name: required(info.name),
        email,
        password,
        avatar: String::new(),
        role: "user".to_string(),
        created_at: now,
        updated_at: now,
    };

    let user = match repository::insert(data.store(), &user).await {
        Ok(user) => user,
        // a concurrent registration won the unique index
        Err(ApiError::Store(StoreError::Duplicate { .. })) => {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }
        Err(e) => return Err(e),
    };
    info!("User registered: {}", user.id);
    Ok(HttpResponse::Created().json(issue(&data, &user)?))
}

pub async fn login(
    data: web::Data<AppState>,
    info: web::Json<LoginInfo>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    let (Some(email), Some(password)) = (info.email, info.password) else {
        return Err(ApiError::InvalidCredentials);
    };

    let email = normalize_email(&email);
    let user = repository::find_one::<User>(data.store(), &Filter::eq("email", email.as_str()))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(password, user.password.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    info!("User logged in: {}", user.id);
    Ok(HttpResponse::Ok().json(issue(&data, &user)?))
}

pub async fn me(data: web::Data<AppState>, user: AuthenticatedUser) -> ApiResult<HttpResponse> {
    let user = repository::find_by_id::<User>(data.store(), user.id()).await?;
    Ok(HttpResponse::Ok().json(user.profile()))
}
