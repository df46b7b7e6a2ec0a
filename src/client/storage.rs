//! Session persistence.
//!
//! Only `{account, token, is_authenticated}` are persisted; transient fields
//! (`error`, `is_loading`) never touch storage.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::api::handlers::auth::types::AccountResponse;

use super::error::ClientError;

/// The durable subset of [`super::SessionState`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedSession {
    pub account: Option<AccountResponse>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

pub trait SessionStorage: Send + Sync {
    /// Load the persisted session, `None` when absent or unreadable.
    ///
    /// # Errors
    /// Returns an error only for real storage failures; corrupt content is
    /// treated as an absent session.
    fn load(&self) -> Result<Option<PersistedSession>, ClientError>;

    /// Persist the session snapshot.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, session: &PersistedSession) -> Result<(), ClientError>;

    /// Forget any persisted session.
    ///
    /// # Errors
    /// Returns an error if the stored session cannot be removed.
    fn clear(&self) -> Result<(), ClientError>;
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Default)]
pub struct MemorySessionStorage {
    inner: RwLock<Option<PersistedSession>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, ClientError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| ClientError::Storage("poisoned lock".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), ClientError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ClientError::Storage("poisoned lock".to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ClientError::Storage("poisoned lock".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// JSON file storage, the desktop analogue of browser local storage.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ClientError::Storage(err.to_string())),
        };
        // A corrupt file is indistinguishable from a stale session: drop it.
        Ok(serde_json::from_str(&contents).ok())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| ClientError::Storage(err.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|err| ClientError::Storage(err.to_string()))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::Storage(err.to_string())),
        }
    }
}
