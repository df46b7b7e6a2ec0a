//! Stateless bearer tokens (HS256 JWT).
//!
//! Tokens are self-contained: validity is signature plus expiry, nothing is
//! persisted server side. Rotating the signing secret invalidates every
//! outstanding token. There is no revocation list; the per-request account
//! re-check in `principal` is the only early lockout path.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::types::Role;

/// Identity claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Token lifetime, selected by the caller's "remember me" flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenLifetime {
    Standard,
    Extended,
}

impl TokenLifetime {
    #[must_use]
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Self::Extended
        } else {
            Self::Standard
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token")]
    Signing,
}

/// Issues and verifies bearer tokens with a process-wide secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    standard_ttl_seconds: i64,
    extended_ttl_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(
        secret: &SecretString,
        standard_ttl_seconds: i64,
        extended_ttl_seconds: i64,
    ) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            standard_ttl_seconds,
            extended_ttl_seconds,
        }
    }

    /// Issue a signed token for the given identity.
    ///
    /// # Errors
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(
        &self,
        account_id: Uuid,
        email: &str,
        role: Role,
        lifetime: TokenLifetime,
    ) -> Result<String, TokenError> {
        let ttl_seconds = match lifetime {
            TokenLifetime::Standard => self.standard_ttl_seconds,
            TokenLifetime::Extended => self.extended_ttl_seconds,
        };
        self.issue_with_ttl(account_id, email, role, ttl_seconds)
    }

    fn issue_with_ttl(
        &self,
        account_id: Uuid,
        email: &str,
        role: Role,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        let iat = i64::try_from(get_current_timestamp()).map_err(|_| TokenError::Signing)?;
        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            role,
            iat,
            exp: iat + ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Signing)
    }

    /// Verify signature and expiry. Purely cryptographic/structural; the
    /// database is never consulted here.
    ///
    /// # Errors
    /// Returns [`TokenError::Expired`] past the expiry and
    /// [`TokenError::Invalid`] for anything malformed or tampered.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
