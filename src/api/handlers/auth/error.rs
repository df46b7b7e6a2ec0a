//! API error taxonomy and its wire mapping.
//!
//! Every failure crosses the boundary as `{error, message}` with a matching
//! status code. Internal failures are logged server side and surfaced with a
//! generic message only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown email and wrong password intentionally share this variant, so
    /// both produce byte-identical responses.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Email is already registered")]
    EmailExists,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Missing bearer token")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Account not found")]
    UserNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::InvalidToken
            | Self::Unauthorized
            | Self::UserNotFound => StatusCode::UNAUTHORIZED,
            Self::EmailExists => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::EmailExists => "EMAIL_EXISTS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref err) = self {
            // Details stay in the logs; the response carries a generic message.
            error!("Internal error: {err:?}");
        }
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::AccountDisabled.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::EmailExists.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_is_generic() {
        let err = ApiError::Internal(anyhow!("connection refused to 10.0.0.7"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn validation_carries_its_message() {
        let err = ApiError::Validation("Password must be at least 6 characters".to_string());
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn invalid_credentials_is_single_sourced() {
        // One variant, one message: unknown email and wrong password cannot be
        // told apart by a caller.
        let a = ApiError::InvalidCredentials;
        let b = ApiError::InvalidCredentials;
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.code(), b.code());
        assert_eq!(a.status(), b.status());
    }
}
