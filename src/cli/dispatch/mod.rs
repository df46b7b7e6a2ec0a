//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the server action with its full
//! configuration.

use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let token_secret = matches
        .get_one::<String>("token-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --token-secret")?;

    Ok(Action::Server {
        port,
        dsn,
        token_secret,
        token_ttl_seconds: matches
            .get_one::<i64>("token-ttl")
            .copied()
            .unwrap_or(86_400),
        remember_token_ttl_seconds: matches
            .get_one::<i64>("remember-token-ttl")
            .copied()
            .unwrap_or(2_592_000),
        frontend_url: matches
            .get_one::<String>("frontend-url")
            .cloned()
            .unwrap_or_else(|| "http://localhost:5173".to_string()),
        bcrypt_cost: matches.get_one::<u32>("bcrypt-cost").copied().unwrap_or(12),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_matches() {
        temp_env::with_vars([("CUSTODIA_LOG_LEVEL", None::<String>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "custodia",
                "--dsn",
                "postgres://user@localhost:5432/custodia",
                "--token-secret",
                "sekret",
                "--token-ttl",
                "60",
            ]);

            let action = handler(&matches).expect("handler should produce an action");
            let Action::Server {
                port,
                dsn,
                token_secret,
                token_ttl_seconds,
                remember_token_ttl_seconds,
                frontend_url,
                bcrypt_cost,
            } = action;

            assert_eq!(port, 8080);
            assert_eq!(dsn, "postgres://user@localhost:5432/custodia");
            assert_eq!(token_secret.expose_secret(), "sekret");
            assert_eq!(token_ttl_seconds, 60);
            assert_eq!(remember_token_ttl_seconds, 2_592_000);
            assert_eq!(frontend_url, "http://localhost:5173");
            assert_eq!(bcrypt_cost, 12);
        });
    }
}
