//! Registration endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::{ApiError, ErrorBody};
use super::password::hash_password;
use super::state::AuthState;
use super::storage::{actions, insert_account, ActivityEntry, NewAccount, RegisterOutcome};
use super::token::TokenLifetime;
use super::types::{AccountStatus, AuthResponse, RegisterRequest, Role};
use super::utils::{extract_client_ip, extract_user_agent, normalize_email, valid_email};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return ApiError::Validation("Missing payload".to_string()).into_response(),
    };

    match create_account(&headers, &pool, &state, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn create_account(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
    request: RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    // Validation runs before any database access.
    let name = request.name.trim().to_string();
    let (min_name, max_name) = state.config().name_length_range();
    let name_length = name.chars().count();
    if name_length < min_name || name_length > max_name {
        return Err(ApiError::Validation(
            "Name must be between 2 and 50 characters".to_string(),
        ));
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    if request.password.chars().count() < state.config().min_password_length() {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password, state.config().bcrypt_cost())
        .map_err(|err| ApiError::Internal(err.into()))?;

    // The account insert and its audit row commit together; the unique index
    // on email arbitrates concurrent registrations.
    let outcome = insert_account(
        pool,
        NewAccount {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: Role::User,
            status: AccountStatus::Active,
        },
        ActivityEntry {
            action: actions::REGISTER,
            account_id: Uuid::nil(),
            description: "Account registered",
            ip: extract_client_ip(headers),
            user_agent: extract_user_agent(headers),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    let account = match outcome {
        RegisterOutcome::Created(record) => record,
        RegisterOutcome::EmailTaken => return Err(ApiError::EmailExists),
    };

    let token = state
        .tokens()
        .issue(
            account.id,
            &account.email,
            account.role,
            TokenLifetime::Standard,
        )
        .map_err(|err| ApiError::Internal(err.into()))?;

    Ok(AuthResponse {
        account: account.into(),
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{AuthConfig, TokenService};
    use anyhow::Result;
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:5173".to_string()).with_bcrypt_cost(4);
        let tokens = TokenService::new(&SecretString::from("test-secret".to_string()), 60, 120);
        Arc::new(AuthState::new(config, tokens))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@127.0.0.1:1/unreachable")?)
    }

    async fn body_json(response: axum::response::Response) -> Result<serde_json::Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn register_missing_payload() -> Result<()> {
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_short_name() -> Result<()> {
        let payload = RegisterRequest {
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
        };
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(payload)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_invalid_email_before_database() -> Result<()> {
        let payload = RegisterRequest {
            name: "Alice".to_string(),
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(payload)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_short_password() -> Result<()> {
        let payload = RegisterRequest {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            password: "short".to_string(),
        };
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(payload)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "Password must be at least 6 characters");
        Ok(())
    }
}
