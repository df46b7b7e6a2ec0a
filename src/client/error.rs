//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a structured `{error, message}` body.
    #[error("{message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },
    /// Transport-level failure: connect error, timeout, malformed body.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session storage failed: {0}")]
    Storage(String),
    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

impl ClientError {
    /// User-visible message for the active form. Transport details collapse
    /// into a generic string so timeouts and connect failures never leak
    /// internals.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Transport(err) if err.is_timeout() => "Request timed out".to_string(),
            Self::Transport(_) | Self::Storage(_) | Self::BaseUrl(_) => {
                "Request failed".to_string()
            }
        }
    }
}
