//! The client session store.
//!
//! An explicit state container: flows move idle → loading → success/error,
//! failures never half-apply (the previous session survives a failed login),
//! and `login`/`register`/`check_auth` are single-flight per store instance.

use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::warn;

use crate::api::handlers::auth::types::{
    AccountResponse, AuthResponse, LoginRequest, RegisterRequest,
};

use super::api::AuthApi;
use super::error::ClientError;
use super::storage::{PersistedSession, SessionStorage};

/// Current auth state as seen by the UI.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub account: Option<AccountResponse>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn SessionStorage>,
    // Serializes state-mutating flows: check_auth cannot race a login.
    flight: Mutex<()>,
}

impl SessionStore {
    /// Build a store, hydrating the durable fields from storage.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let mut state = SessionState::default();
        match storage.load() {
            Ok(Some(persisted)) => {
                state.account = persisted.account;
                state.token = persisted.token;
                state.is_authenticated = persisted.is_authenticated;
            }
            Ok(None) => {}
            Err(err) => warn!("Failed to load persisted session: {err}"),
        }
        Self {
            state: RwLock::new(state),
            storage,
            flight: Mutex::new(()),
        }
    }

    /// Clone of the current state.
    ///
    /// # Panics
    /// Panics if the state lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().expect("session state lock poisoned").clone()
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.snapshot().token
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    pub fn clear_error(&self) {
        self.with_state(|state| state.error = None);
    }

    /// Log in and arm the session on success. On failure the previous state
    /// is left untouched and `error` carries the server's message.
    ///
    /// # Errors
    /// Returns the underlying failure so callers can also await it directly.
    pub async fn login(
        &self,
        api: &AuthApi,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<(), ClientError> {
        let _flight = self.flight.lock().await;
        self.begin_loading();

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        };
        match api.login(&request).await {
            Ok(response) => {
                self.apply_auth_success(response);
                Ok(())
            }
            Err(err) => {
                self.apply_failure(&err);
                Err(err)
            }
        }
    }

    /// Register a new account and arm the session on success.
    ///
    /// # Errors
    /// Returns the underlying failure so callers can also await it directly.
    pub async fn register(
        &self,
        api: &AuthApi,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let _flight = self.flight.lock().await;
        self.begin_loading();

        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        match api.register(&request).await {
            Ok(response) => {
                self.apply_auth_success(response);
                Ok(())
            }
            Err(err) => {
                self.apply_failure(&err);
                Err(err)
            }
        }
    }

    /// Clear the session. The server call is best-effort: stateless tokens
    /// cannot be revoked, discarding the local session is what logs out.
    pub async fn logout(&self, api: &AuthApi) {
        let _flight = self.flight.lock().await;
        if let Some(token) = self.bearer_token() {
            if let Err(err) = api.logout(&token).await {
                warn!("Logout call failed: {err}");
            }
        }
        self.clear_session();
    }

    /// Startup reconciliation: if a persisted token exists, refresh the
    /// account from `/auth/me`; on any failure silently drop the session.
    /// Never surfaces an error.
    pub async fn check_auth(&self, api: &AuthApi) {
        let _flight = self.flight.lock().await;
        let Some(token) = self.bearer_token() else {
            return;
        };
        self.begin_loading();

        match api.me(&token).await {
            Ok(account) => self.apply_account_refresh(account),
            Err(_) => self.clear_session(),
        }
    }

    fn with_state(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.write().expect("session state lock poisoned");
        apply(&mut state);
    }

    fn begin_loading(&self) {
        self.with_state(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn apply_auth_success(&self, response: AuthResponse) {
        self.with_state(|state| {
            state.account = Some(response.account);
            state.token = Some(response.token);
            state.is_authenticated = true;
            state.is_loading = false;
            state.error = None;
        });
        self.persist();
    }

    fn apply_account_refresh(&self, account: AccountResponse) {
        self.with_state(|state| {
            state.account = Some(account);
            state.is_authenticated = true;
            state.is_loading = false;
            state.error = None;
        });
        self.persist();
    }

    fn apply_failure(&self, err: &ClientError) {
        // Only the transient fields change; a failed login leaves any
        // previous session intact.
        let message = err.user_message();
        self.with_state(|state| {
            state.is_loading = false;
            state.error = Some(message);
        });
    }

    fn clear_session(&self) {
        self.with_state(|state| *state = SessionState::default());
        if let Err(err) = self.storage.clear() {
            warn!("Failed to clear persisted session: {err}");
        }
    }

    fn persist(&self) {
        let snapshot = self.snapshot();
        let persisted = PersistedSession {
            account: snapshot.account,
            token: snapshot.token,
            is_authenticated: snapshot.is_authenticated,
        };
        if let Err(err) = self.storage.save(&persisted) {
            warn!("Failed to persist session: {err}");
        }
    }
}
