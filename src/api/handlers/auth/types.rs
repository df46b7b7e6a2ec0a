//! Request/response types for auth and account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role, lowercase everywhere: JSON bodies, token claims, and
/// database rows share the same encoding.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Account status. Only `active` accounts may authenticate or use
/// outstanding tokens.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default, alias = "rememberMe")]
    pub remember_me: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Account as returned over the wire. The password hash never appears here.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub account: AccountResponse,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn role_round_trips_lowercase() -> Result<()> {
        assert_eq!(serde_json::to_value(Role::Admin)?, "admin");
        assert_eq!(serde_json::to_value(Role::User)?, "user");
        let decoded: Role = serde_json::from_value(serde_json::json!("admin"))?;
        assert_eq!(decoded, Role::Admin);
        assert!(serde_json::from_value::<Role>(serde_json::json!("ADMIN")).is_err());
        Ok(())
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("ADMIN"), None);
        assert_eq!(Role::parse("operator"), None);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(AccountStatus::parse("active"), Some(AccountStatus::Active));
        assert_eq!(
            AccountStatus::parse("inactive"),
            Some(AccountStatus::Inactive)
        );
        assert_eq!(AccountStatus::parse("disabled"), None);
    }

    #[test]
    fn login_request_accepts_camel_case_remember_me() -> Result<()> {
        let request: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com",
            "password": "secret1",
            "rememberMe": true,
        }))?;
        assert!(request.remember_me);

        let request: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com",
            "password": "secret1",
        }))?;
        assert!(!request.remember_me);
        Ok(())
    }

    #[test]
    fn account_response_never_carries_a_hash_field() -> Result<()> {
        let account = AccountResponse {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::User,
            status: AccountStatus::Active,
            avatar: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&account)?;
        let object = value.as_object().expect("object");
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("password_hash"));
        assert_eq!(object["role"], "user");
        assert_eq!(object["status"], "active");
        Ok(())
    }
}
