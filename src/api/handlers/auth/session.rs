//! Authenticated session endpoints: whoami and logout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::{ApiError, ErrorBody};
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{actions, insert_activity, lookup_account_by_id, ActivityEntry};
use super::types::{AccountResponse, MessageResponse};
use super::utils::{extract_client_ip, extract_user_agent};

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated account", body = AccountResponse),
        (status = 401, description = "Missing/invalid token or unusable account", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match lookup_account_by_id(&pool, principal.account_id).await {
        Ok(Some(account)) => {
            (StatusCode::OK, Json(AccountResponse::from(account))).into_response()
        }
        Ok(None) => ApiError::UserNotFound.into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout recorded", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    // Tokens are stateless and stay structurally valid until expiry; logout
    // only records the event, the client discards its session.
    let result = insert_activity(
        &pool,
        &ActivityEntry {
            action: actions::LOGOUT,
            account_id: principal.account_id,
            description: "Signed out",
            ip: extract_client_ip(&headers),
            user_agent: extract_user_agent(&headers),
        },
    )
    .await;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Signed out".to_string(),
            }),
        )
            .into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}
