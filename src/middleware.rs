use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use log::debug;

use crate::app_state::AppState;
use crate::auth::validate_jwt;
use crate::error::ApiError;

/// Identity attached to a request once its bearer token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<AuthenticatedUser>().cloned().ok_or_else(|| {
            ApiError::Unauthorized("No token, authorization denied".to_string())
        }))
    }
}

/// Rejects requests without a valid `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuth;

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = RequireAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireAuthMiddleware { service })
    }
}

pub struct RequireAuthMiddleware<S> {
    service: S,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, ApiError> {
    let token = bearer_token(req)
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state is not configured".to_string()))?;
    validate_jwt(&token, &state.config.jwt_secret)
        .map(|claims| AuthenticatedUser(claims.sub))
        .map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::Unauthorized("Token is not valid".to_string())
        })
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_boxed_body())
                })
            }
            Err(e) => {
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response)) })
            }
        }
    }
}
