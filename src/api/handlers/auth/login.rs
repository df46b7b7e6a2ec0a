//! Login endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::{ApiError, ErrorBody};
use super::password::verify_password;
use super::state::AuthState;
use super::storage::{actions, insert_activity, lookup_account_by_email, ActivityEntry};
use super::token::TokenLifetime;
use super::types::{AccountStatus, AuthResponse, LoginRequest};
use super::utils::{extract_client_ip, extract_user_agent, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Invalid credentials or disabled account", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return ApiError::Validation("Missing payload".to_string()).into_response(),
    };

    match authenticate(&headers, &pool, &state, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
    request: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    // Validation runs before any database access.
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }
    if request.password.chars().count() < state.config().min_password_length() {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let account = lookup_account_by_email(pool, &email)
        .await
        .map_err(ApiError::Internal)?;

    // Unknown emails fall through to the same error as wrong passwords.
    let Some(account) = account else {
        return Err(ApiError::InvalidCredentials);
    };

    if account.status != AccountStatus::Active {
        return Err(ApiError::AccountDisabled);
    }

    if !verify_password(&request.password, &account.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens()
        .issue(
            account.id,
            &account.email,
            account.role,
            TokenLifetime::from_remember_me(request.remember_me),
        )
        .map_err(|err| ApiError::Internal(err.into()))?;

    insert_activity(
        pool,
        &ActivityEntry {
            action: actions::LOGIN,
            account_id: account.id,
            description: "Signed in",
            ip: extract_client_ip(headers),
            user_agent: extract_user_agent(headers),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok(AuthResponse {
        account: account.into(),
        token,
    })
}
