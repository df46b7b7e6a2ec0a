//! Database access for accounts and the activity audit log.

use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{AccountStatus, Role};
use super::utils::is_unique_violation;

/// Audit actions written by this crate. The log is append-only and never read
/// back for authorization decisions.
pub(crate) mod actions {
    pub const LOGIN: &str = "login";
    pub const REGISTER: &str = "register";
    pub const LOGOUT: &str = "logout";
    pub const CREATE_USER: &str = "create_user";
    pub const UPDATE_USER: &str = "update_user";
    pub const DELETE_USER: &str = "delete_user";
    pub const CHANGE_PASSWORD: &str = "change_password";
}

/// Full account row, including the password hash. Never serialized as-is;
/// responses go through `AccountResponse`.
#[derive(Debug, Clone)]
pub(crate) struct AccountRecord {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) role: Role,
    pub(crate) status: AccountStatus,
    pub(crate) avatar: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<AccountRecord> for super::types::AccountResponse {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            email: record.email,
            role: record.role,
            status: record.status,
            avatar: record.avatar,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Fields for a new account row.
pub(crate) struct NewAccount<'a> {
    pub(crate) name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password_hash: &'a str,
    pub(crate) role: Role,
    pub(crate) status: AccountStatus,
}

/// One audit row. `ip` and `user_agent` are best-effort.
pub(crate) struct ActivityEntry<'a> {
    pub(crate) action: &'a str,
    pub(crate) account_id: Uuid,
    pub(crate) description: &'a str,
    pub(crate) ip: Option<String>,
    pub(crate) user_agent: Option<String>,
}

/// Outcome of a registration insert.
#[derive(Debug)]
pub(crate) enum RegisterOutcome {
    Created(AccountRecord),
    EmailTaken,
}

pub(crate) const ACCOUNT_COLUMNS: &str = r#"
    id,
    name,
    email,
    password_hash,
    role,
    status,
    avatar,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
"#;

pub(crate) fn account_from_row(row: &PgRow) -> Result<AccountRecord> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    Ok(AccountRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::parse(&role).with_context(|| format!("unexpected role value: {role}"))?,
        status: AccountStatus::parse(&status)
            .with_context(|| format!("unexpected status value: {status}"))?,
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Look up an account by normalized email (login path).
pub(crate) async fn lookup_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRecord>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;

    row.as_ref().map(account_from_row).transpose()
}

/// Look up an account by id. Called on every authenticated request, so that
/// disabling or deleting an account takes effect immediately.
pub(crate) async fn lookup_account_by_id(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<AccountRecord>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;

    row.as_ref().map(account_from_row).transpose()
}

/// Create an account and its audit row in one transaction.
///
/// Uniqueness rides on the database index: the insert itself is the atomic
/// conditional, so exactly one of N concurrent registrations with the same
/// email wins and the rest observe `EmailTaken`.
pub(crate) async fn insert_account(
    pool: &PgPool,
    account: NewAccount<'_>,
    activity: ActivityEntry<'_>,
) -> Result<RegisterOutcome> {
    let mut tx = pool.begin().await.context("begin register transaction")?;

    let query = format!(
        r"
        INSERT INTO accounts (name, email, password_hash, role, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(account.name)
        .bind(account.email)
        .bind(account.password_hash)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let record = match row {
        Ok(row) => account_from_row(&row)?,
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(RegisterOutcome::EmailTaken);
            }
            return Err(err).context("failed to insert account");
        }
    };

    let activity = ActivityEntry {
        account_id: record.id,
        ..activity
    };
    insert_activity_tx(&mut tx, &activity).await?;

    tx.commit().await.context("commit register transaction")?;

    Ok(RegisterOutcome::Created(record))
}

const ACTIVITY_INSERT: &str = r"
    INSERT INTO activities (action, account_id, description, ip, user_agent)
    VALUES ($1, $2, $3, $4, $5)
";

/// Append an audit row.
pub(crate) async fn insert_activity(pool: &PgPool, entry: &ActivityEntry<'_>) -> Result<()> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = ACTIVITY_INSERT
    );
    sqlx::query(ACTIVITY_INSERT)
        .bind(entry.action)
        .bind(entry.account_id)
        .bind(entry.description)
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert activity")?;
    Ok(())
}

/// Append an audit row inside an open transaction.
pub(crate) async fn insert_activity_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &ActivityEntry<'_>,
) -> Result<()> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = ACTIVITY_INSERT
    );
    sqlx::query(ACTIVITY_INSERT)
        .bind(entry.action)
        .bind(entry.account_id)
        .bind(entry.description)
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert activity")?;
    Ok(())
}
