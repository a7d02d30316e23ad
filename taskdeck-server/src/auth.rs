//! Authentication gate and account routes.
//!
//! [`Authenticated`] is an extractor: listing it as the first handler
//! argument guarantees that the bearer token is resolved before any body or
//! query parsing happens, so an anonymous request is answered with 401 even
//! when its payload is also invalid.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use taskdeck_proto::account::{AuthResponse, LoginRequest, RegisterRequest, UserEnvelope};
use taskdeck_proto::task::UserId;

use crate::error::ApiError;
use crate::server::AppState;

/// The resolved identity of the caller.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Owner id that scopes every task operation.
    pub user_id: UserId,
    /// The bearer token that was presented.
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user_id = state
            .accounts
            .resolve(token)
            .await
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self {
            user_id,
            token: token.to_string(),
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = body?;
    let (token, user) = state.accounts.register(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user,
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = body?;
    let (token, user) = state.accounts.login(&request).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// `GET /api/auth/me`
pub async fn me(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = state
        .accounts
        .user(&auth.user_id)
        .await
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(UserEnvelope { user }))
}

/// `POST /api/auth/logout`
pub async fn logout(auth: Authenticated, State(state): State<Arc<AppState>>) -> Json<Value> {
    state.accounts.revoke(&auth.token).await;
    tracing::info!(user_id = %auth.user_id, "user logged out");
    Json(json!({ "message": "Logged out" }))
}
