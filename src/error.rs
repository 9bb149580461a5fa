use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse, ResponseError,
};
use log::error;
use serde_json::json;

use crate::db::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can report, mapped onto one HTTP status each.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Access denied")]
    AccessDenied,

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("failed to build response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(_)
            | ApiError::Encode(_)
            | ApiError::Decode(_)
            | ApiError::Json(_)
            | ApiError::Token(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => {
                json!({ "message": self.to_string(), "errors": errors })
            }
            _ if status.is_server_error() => {
                error!("Request failed: {}", self);
                json!({ "message": "Server error", "error": self.to_string() })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}

/// Malformed or mistyped JSON bodies become validation failures.
pub fn json_error_handler(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(vec![err.to_string()]).into()
}

pub fn query_error_handler(err: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(vec![err.to_string()]).into()
}
