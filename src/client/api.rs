//! Thin HTTP wrapper for the custodia API.
//!
//! Bearer tokens are passed per request, read from the session store at call
//! time; the underlying `reqwest::Client` carries no auth state of its own.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::api::handlers::auth::types::{
    AccountResponse, AuthResponse, LoginRequest, MessageResponse, RegisterRequest,
};
use crate::api::handlers::auth::ErrorBody;
use crate::APP_USER_AGENT;

use super::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AuthApi {
    base_url: String,
    client: Client,
}

impl AuthApi {
    /// Build a client for the given API base URL.
    ///
    /// # Errors
    /// Returns an error for an unparsable base URL or a client build failure.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Url::parse(base_url).map_err(|_| ClientError::BaseUrl(base_url.to_string()))?;

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST /auth/login`
    ///
    /// # Errors
    /// Propagates transport failures and structured API errors.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .json(request)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `POST /auth/register`
    ///
    /// # Errors
    /// Propagates transport failures and structured API errors.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .client
            .post(self.endpoint("auth/register"))
            .json(request)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `GET /auth/me` with the caller-supplied bearer token.
    ///
    /// # Errors
    /// Propagates transport failures and structured API errors.
    pub async fn me(&self, token: &str) -> Result<AccountResponse, ClientError> {
        let response = self
            .client
            .get(self.endpoint("auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        parse_json(response).await
    }

    /// `POST /auth/logout` with the caller-supplied bearer token.
    ///
    /// # Errors
    /// Propagates transport failures and structured API errors.
    pub async fn logout(&self, token: &str) -> Result<MessageResponse, ClientError> {
        let response = self
            .client
            .post(self.endpoint("auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    Err(api_error(status, response).await)
}

async fn api_error(status: StatusCode, response: Response) -> ClientError {
    // Prefer the server's structured body; fall back to a generic shape for
    // proxies and panics that answer with something else.
    match response.json::<ErrorBody>().await {
        Ok(body) => ClientError::Api {
            status: status.as_u16(),
            error: body.error,
            message: body.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            error: "INTERNAL_ERROR".to_string(),
            message: "Request failed".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_base_url() {
        assert!(matches!(
            AuthApi::new("not a url"),
            Err(ClientError::BaseUrl(_))
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let api = AuthApi::new("http://localhost:8080/").expect("client");
        assert_eq!(api.endpoint("auth/login"), "http://localhost:8080/auth/login");
        assert_eq!(api.endpoint("/auth/me"), "http://localhost:8080/auth/me");
    }
}
