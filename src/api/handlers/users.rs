//! Role-gated account management endpoints.
//!
//! Flow Overview:
//! 1) Authenticate the bearer token and re-check live account status.
//! 2) Enforce role requirements (admin for mutations and listings).
//! 3) Perform reads or allow-listed updates on the requested account.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::auth::{
    error::{ApiError, ErrorBody},
    password::{hash_password, verify_password},
    principal::{require_auth, require_role, Principal},
    state::AuthState,
    storage::{
        account_from_row, actions, insert_account, insert_activity, AccountRecord, ActivityEntry,
        NewAccount, RegisterOutcome, ACCOUNT_COLUMNS,
    },
    types::{AccountResponse, AccountStatus, MessageResponse, Role},
    utils::{extract_client_ip, extract_user_agent, normalize_email, normalize_optional, valid_email},
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsersListResponse {
    pub users: Vec<AccountResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "oldPassword")]
    pub old_password: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "USER_NOT_FOUND".to_string(),
            message: "Account not found".to_string(),
        }),
    )
        .into_response()
}

fn clamp_paging(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[utoipa::path(
    get,
    path = "/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated account listing (admin)", body = UsersListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = require_role(&principal, Role::Admin) {
        return err.into_response();
    }

    let (page, limit) = clamp_paging(query.page, query.limit);
    match fetch_accounts_page(&pool, &query, page, limit).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account detail (admin or self)", body = AccountResponse),
        (status = 400, description = "Invalid account id", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not allowed to read this account", body = ErrorBody),
        (status = 404, description = "Account not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let Ok(account_id) = Uuid::parse_str(id.trim()) else {
        return ApiError::Validation("Invalid account id".to_string()).into_response();
    };

    // Admins can read anyone; everyone else only themselves.
    if principal.role != Role::Admin && principal.account_id != account_id {
        return ApiError::Forbidden.into_response();
    }

    match super::auth::storage::lookup_account_by_id(&pool, account_id).await {
        Ok(Some(account)) => {
            (StatusCode::OK, Json(AccountResponse::from(account))).into_response()
        }
        Ok(None) => not_found(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created (admin)", body = AccountResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn create_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateUserRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = require_role(&principal, Role::Admin) {
        return err.into_response();
    }

    let request: CreateUserRequest = match payload {
        Some(Json(payload)) => payload,
        None => return ApiError::Validation("Missing payload".to_string()).into_response(),
    };

    match create_account(&headers, &pool, &state, request).await {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn create_account(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
    request: CreateUserRequest,
) -> Result<AccountResponse, ApiError> {
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

    let outcome = insert_account(
        pool,
        NewAccount {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: request.role,
            status: request.status,
        },
        ActivityEntry {
            action: actions::CREATE_USER,
            account_id: Uuid::nil(),
            description: "Account created by administrator",
            ip: extract_client_ip(headers),
            user_agent: extract_user_agent(headers),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    match outcome {
        RegisterOutcome::Created(record) => Ok(record.into()),
        RegisterOutcome::EmailTaken => Err(ApiError::EmailExists),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account updated (admin)", body = AccountResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Account not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateUserRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = require_role(&principal, Role::Admin) {
        return err.into_response();
    }

    let Ok(account_id) = Uuid::parse_str(id.trim()) else {
        return ApiError::Validation("Invalid account id".to_string()).into_response();
    };

    let request: UpdateUserRequest = match payload {
        Some(Json(payload)) => payload,
        None => return ApiError::Validation("Missing payload".to_string()).into_response(),
    };

    let name = normalize_optional(request.name);
    let avatar = normalize_optional(request.avatar);
    if name.is_none() && avatar.is_none() && request.role.is_none() && request.status.is_none() {
        return ApiError::Validation("No updates provided".to_string()).into_response();
    }

    if let Some(ref name) = name {
        let (min_name, max_name) = state.config().name_length_range();
        let name_length = name.chars().count();
        if name_length < min_name || name_length > max_name {
            return ApiError::Validation("Name must be between 2 and 50 characters".to_string())
                .into_response();
        }
    }

    match apply_account_update(&pool, account_id, name, request.role, request.status, avatar).await
    {
        Ok(Some(record)) => {
            let entry = ActivityEntry {
                action: actions::UPDATE_USER,
                account_id: record.id,
                description: "Account updated by administrator",
                ip: extract_client_ip(&headers),
                user_agent: extract_user_agent(&headers),
            };
            if let Err(err) = insert_activity(&pool, &entry).await {
                return ApiError::Internal(err).into_response();
            }
            (StatusCode::OK, Json(AccountResponse::from(record))).into_response()
        }
        Ok(None) => not_found(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted (admin, not self)", body = MessageResponse),
        (status = 400, description = "Invalid account id or self-delete", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Account not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = require_role(&principal, Role::Admin) {
        return err.into_response();
    }

    let Ok(account_id) = Uuid::parse_str(id.trim()) else {
        return ApiError::Validation("Invalid account id".to_string()).into_response();
    };
    if account_id == principal.account_id {
        return ApiError::Validation("Cannot delete your own account".to_string()).into_response();
    }

    match delete_account(&pool, account_id).await {
        Ok(Some(email)) => {
            // The deleted row is gone, so the audit entry hangs off the
            // acting administrator.
            let description = format!("Deleted account {email}");
            let entry = ActivityEntry {
                action: actions::DELETE_USER,
                account_id: principal.account_id,
                description: &description,
                ip: extract_client_ip(&headers),
                user_agent: extract_user_agent(&headers),
            };
            if let Err(err) = insert_activity(&pool, &entry).await {
                return ApiError::Internal(err).into_response();
            }
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: "Account deleted".to_string(),
                }),
            )
                .into_response()
        }
        Ok(None) => not_found(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}/password",
    request_body = ChangePasswordRequest,
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Password changed (self with old password, or admin)", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing token or wrong old password", body = ErrorBody),
        (status = 403, description = "Not allowed to change this password", body = ErrorBody),
        (status = 404, description = "Account not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn change_password(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let Ok(account_id) = Uuid::parse_str(id.trim()) else {
        return ApiError::Validation("Invalid account id".to_string()).into_response();
    };

    let request: ChangePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return ApiError::Validation("Missing payload".to_string()).into_response(),
    };

    match apply_password_change(&headers, &pool, &state, &principal, account_id, request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Password changed".to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn apply_password_change(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
    principal: &Principal,
    account_id: Uuid,
    request: ChangePasswordRequest,
) -> Result<(), ApiError> {
    let is_self = principal.account_id == account_id;
    if !is_self && principal.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    if request.new_password.chars().count() < state.config().min_password_length() {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let account = super::auth::storage::lookup_account_by_id(pool, account_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::UserNotFound)?;

    // Self-service changes prove knowledge of the current password; admins
    // reset without it.
    if is_self {
        let old_password = request
            .old_password
            .as_deref()
            .ok_or_else(|| ApiError::Validation("Current password is required".to_string()))?;
        if !verify_password(old_password, &account.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }
    }

    let password_hash = hash_password(&request.new_password, state.config().bcrypt_cost())
        .map_err(|err| ApiError::Internal(err.into()))?;

    update_password_hash(pool, account_id, &password_hash)
        .await
        .map_err(ApiError::Internal)?;

    insert_activity(
        pool,
        &ActivityEntry {
            action: actions::CHANGE_PASSWORD,
            account_id,
            description: "Password changed",
            ip: extract_client_ip(headers),
            user_agent: extract_user_agent(headers),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok(())
}

async fn fetch_accounts_page(
    pool: &PgPool,
    query: &ListUsersQuery,
    page: i64,
    limit: i64,
) -> anyhow::Result<UsersListResponse> {
    use anyhow::Context;

    let role = query.role.map(Role::as_str);
    let status = query.status.map(AccountStatus::as_str);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("%{value}%"));

    let list_query = format!(
        r"
        SELECT {ACCOUNT_COLUMNS}
        FROM accounts
        WHERE ($1::text IS NULL OR role = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = list_query.as_str()
    );
    let rows = sqlx::query(&list_query)
        .bind(role)
        .bind(status)
        .bind(search.as_deref())
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list accounts")?;

    let users = rows
        .iter()
        .map(|row| account_from_row(row).map(AccountResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let count_query = r"
        SELECT COUNT(*) AS total
        FROM accounts
        WHERE ($1::text IS NULL OR role = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = count_query
    );
    let total: i64 = sqlx::query(count_query)
        .bind(role)
        .bind(status)
        .bind(search.as_deref())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count accounts")?
        .get("total");

    Ok(UsersListResponse {
        users,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        },
    })
}

async fn apply_account_update(
    pool: &PgPool,
    account_id: Uuid,
    name: Option<String>,
    role: Option<Role>,
    status: Option<AccountStatus>,
    avatar: Option<String>,
) -> anyhow::Result<Option<AccountRecord>> {
    use anyhow::Context;

    let query = format!(
        r"
        UPDATE accounts
        SET name = COALESCE($1, name),
            role = COALESCE($2, role),
            status = COALESCE($3, status),
            avatar = COALESCE($4, avatar),
            updated_at = NOW()
        WHERE id = $5
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(name)
        .bind(role.map(Role::as_str))
        .bind(status.map(AccountStatus::as_str))
        .bind(avatar)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update account")?;

    row.as_ref().map(account_from_row).transpose()
}

async fn delete_account(pool: &PgPool, account_id: Uuid) -> anyhow::Result<Option<String>> {
    use anyhow::Context;

    let query = "DELETE FROM accounts WHERE id = $1 RETURNING email";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to delete account")?;
    Ok(row.map(|row| row.get("email")))
}

async fn update_password_hash(
    pool: &PgPool,
    account_id: Uuid,
    password_hash: &str,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let query = "UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(password_hash)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{AuthConfig, TokenService};
    use anyhow::Result;
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

    #[test]
    fn clamp_paging_defaults_and_bounds() {
        assert_eq!(clamp_paging(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(clamp_paging(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_paging(Some(-3), Some(1000)), (1, MAX_PAGE_SIZE));
        assert_eq!(clamp_paging(Some(7), Some(25)), (7, 25));
    }

    #[test]
    fn change_password_request_accepts_camel_case() -> Result<()> {
        let request: ChangePasswordRequest = serde_json::from_value(serde_json::json!({
            "oldPassword": "before1",
            "newPassword": "after12",
        }))?;
        assert_eq!(request.old_password.as_deref(), Some("before1"));
        assert_eq!(request.new_password, "after12");
        Ok(())
    }

    #[tokio::test]
    async fn list_users_without_token_is_unauthorized() -> Result<()> {
        let response = list_users(
            HeaderMap::new(),
            Query(ListUsersQuery {
                page: None,
                limit: None,
                role: None,
                status: None,
                search: None,
            }),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn create_user_without_token_is_unauthorized() -> Result<()> {
        let response = create_user(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn get_user_without_token_is_unauthorized() -> Result<()> {
        let response = get_user(
            Path("b9e7f3a0-0000-0000-0000-000000000000".to_string()),
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
