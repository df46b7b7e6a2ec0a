//! Authenticated principal extraction and role gating.
//!
//! Flow Overview: read the bearer token, verify it cryptographically, then
//! re-read the account so a disabled or deleted account is locked out even
//! while its token is still structurally valid.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AuthState;
use super::storage::lookup_account_by_id;
use super::types::{AccountStatus, Role};

/// Authenticated request context available to downstream handlers.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Resolve the bearer token into a principal.
///
/// The account is re-fetched on every call, not cached: the token's embedded
/// claims are never trusted for liveness or role.
///
/// # Errors
/// `Unauthorized` for a missing token, `InvalidToken` for a bad one,
/// `UserNotFound`/`AccountDisabled` when the live account check fails.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Principal, ApiError> {
    let token = extract_bearer_token(headers).ok_or(ApiError::Unauthorized)?;

    let claims = state
        .tokens()
        .verify(&token)
        .map_err(|_| ApiError::InvalidToken)?;

    let account = lookup_account_by_id(pool, claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::UserNotFound)?;

    if account.status != AccountStatus::Active {
        return Err(ApiError::AccountDisabled);
    }

    Ok(Principal {
        account_id: account.id,
        email: account.email,
        role: account.role,
    })
}

/// Gate a handler on a required role.
///
/// # Errors
/// `Forbidden` when the resolved role does not match.
pub fn require_role(principal: &Principal, role: Role) -> Result<(), ApiError> {
    if principal.role == role {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_token_accepts_both_prefixes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn extract_bearer_token_rejects_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn require_role_gates_on_exact_match() {
        let principal = Principal {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        };
        assert!(require_role(&principal, Role::User).is_ok());
        assert!(matches!(
            require_role(&principal, Role::Admin),
            Err(ApiError::Forbidden)
        ));
    }
}
