use crate::{
    api,
    api::handlers::auth::{AuthConfig, AuthState, TokenService},
};
use anyhow::Result;
use std::sync::Arc;

/// Execute the server action.
///
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to
/// start.
pub async fn handle(action: super::Action) -> Result<()> {
    match action {
        super::Action::Server {
            port,
            dsn,
            token_secret,
            token_ttl_seconds,
            remember_token_ttl_seconds,
            frontend_url,
            bcrypt_cost,
        } => {
            let config = AuthConfig::new(frontend_url)
                .with_token_ttl_seconds(token_ttl_seconds)
                .with_remember_token_ttl_seconds(remember_token_ttl_seconds)
                .with_bcrypt_cost(bcrypt_cost);

            let tokens = TokenService::new(
                &token_secret,
                config.token_ttl_seconds(),
                config.remember_token_ttl_seconds(),
            );

            let state = Arc::new(AuthState::new(config, tokens));

            api::new(port, dsn, state).await?;
        }
    }

    Ok(())
}
