//! Admin dashboard endpoints: aggregate stats and the audit listing.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::{IntoParams, ToSchema};

use super::auth::{
    error::{ApiError, ErrorBody},
    principal::{require_auth, require_role},
    state::AuthState,
    storage::actions,
    types::Role,
};
use super::users::Pagination;

const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
    pub new_this_month: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityAccount {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecentActivity {
    pub id: String,
    pub action: String,
    pub description: String,
    pub account: Option<ActivityAccount>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityStats {
    pub today_logins: i64,
    pub today_registrations: i64,
    pub recent: Vec<RecentActivity>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub users: UserStats,
    pub activities: ActivityStats,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListActivitiesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityRow {
    pub id: String,
    pub action: String,
    pub account_id: String,
    pub description: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivitiesListResponse {
    pub activities: Vec<ActivityRow>,
    pub pagination: Pagination,
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Aggregate account and activity stats (admin)", body = StatsResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn stats(
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

    match fetch_stats(&pool).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/admin/activities",
    params(ListActivitiesQuery),
    responses(
        (status = 200, description = "Paginated audit listing (admin)", body = ActivitiesListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn list_activities(
    headers: HeaderMap,
    Query(query): Query<ListActivitiesQuery>,
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

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    match fetch_activities_page(&pool, page, limit).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

async fn count_where(pool: &PgPool, query: &'static str, action: Option<&str>) -> anyhow::Result<i64> {
    use anyhow::Context;

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let mut q = sqlx::query(query);
    if let Some(action) = action {
        q = q.bind(action.to_string());
    }
    let row = q
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to run count query")?;
    Ok(row.get("total"))
}

async fn fetch_stats(pool: &PgPool) -> anyhow::Result<StatsResponse> {
    // The counters run concurrently on the pool, mirroring the dashboard's
    // single round-trip expectation.
    let (total, active, admins, new_this_month, today_logins, today_registrations, recent) = tokio::try_join!(
        count_where(pool, "SELECT COUNT(*) AS total FROM accounts", None),
        count_where(
            pool,
            "SELECT COUNT(*) AS total FROM accounts WHERE status = 'active'",
            None
        ),
        count_where(
            pool,
            "SELECT COUNT(*) AS total FROM accounts WHERE role = 'admin'",
            None
        ),
        count_where(
            pool,
            "SELECT COUNT(*) AS total FROM accounts WHERE created_at >= date_trunc('month', NOW())",
            None
        ),
        count_where(
            pool,
            "SELECT COUNT(*) AS total FROM activities WHERE action = $1 AND created_at >= date_trunc('day', NOW())",
            Some(actions::LOGIN)
        ),
        count_where(
            pool,
            "SELECT COUNT(*) AS total FROM activities WHERE action = $1 AND created_at >= date_trunc('day', NOW())",
            Some(actions::REGISTER)
        ),
        fetch_recent_activities(pool),
    )?;

    Ok(StatsResponse {
        users: UserStats {
            total,
            active,
            admins,
            new_this_month,
        },
        activities: ActivityStats {
            today_logins,
            today_registrations,
            recent,
        },
    })
}

async fn fetch_recent_activities(pool: &PgPool) -> anyhow::Result<Vec<RecentActivity>> {
    use anyhow::Context;

    // Accounts can be deleted out from under their audit rows, hence the LEFT
    // JOIN and the optional account in the response.
    let query = r#"
        SELECT
            activities.id::text AS id,
            activities.action,
            activities.description,
            accounts.id::text AS account_id,
            accounts.name AS account_name,
            to_char(activities.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM activities
        LEFT JOIN accounts ON accounts.id = activities.account_id
        ORDER BY activities.created_at DESC
        LIMIT $1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(RECENT_ACTIVITY_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch recent activities")?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let account_id: Option<String> = row.get("account_id");
            let account_name: Option<String> = row.get("account_name");
            RecentActivity {
                id: row.get("id"),
                action: row.get("action"),
                description: row.get("description"),
                account: account_id.zip(account_name).map(|(id, name)| ActivityAccount { id, name }),
                created_at: row.get("created_at"),
            }
        })
        .collect())
}

async fn fetch_activities_page(
    pool: &PgPool,
    page: i64,
    limit: i64,
) -> anyhow::Result<ActivitiesListResponse> {
    use anyhow::Context;

    let query = r#"
        SELECT
            id::text AS id,
            action,
            account_id::text AS account_id,
            description,
            ip,
            user_agent,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM activities
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list activities")?;

    let activities = rows
        .into_iter()
        .map(|row| ActivityRow {
            id: row.get("id"),
            action: row.get("action"),
            account_id: row.get("account_id"),
            description: row.get("description"),
            ip: row.get("ip"),
            user_agent: row.get("user_agent"),
            created_at: row.get("created_at"),
        })
        .collect();

    let total = count_where(pool, "SELECT COUNT(*) AS total FROM activities", None).await?;

    Ok(ActivitiesListResponse {
        activities,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{AuthConfig, AuthState, TokenService};
    use anyhow::Result;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        let tokens = TokenService::new(&SecretString::from("test-secret".to_string()), 60, 120);
        Arc::new(AuthState::new(config, tokens))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@127.0.0.1:1/unreachable")?)
    }

    #[tokio::test]
    async fn stats_without_token_is_unauthorized() -> Result<()> {
        let response = stats(HeaderMap::new(), Extension(lazy_pool()?), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn activities_without_token_is_unauthorized() -> Result<()> {
        let response = list_activities(
            HeaderMap::new(),
            Query(ListActivitiesQuery {
                page: None,
                limit: None,
            }),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
