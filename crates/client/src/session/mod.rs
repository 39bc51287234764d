//! Session store.
//!
//! Holds the authenticated identity for one browsing context and persists it
//! so it survives a restart. The store is an explicitly owned object: create
//! one per context and hand references to the guard, login flow and views.
//!
//! # Persisted keys
//!
//! | Key        | Value                                  |
//! |------------|----------------------------------------|
//! | `name`     | Identity display name                  |
//! | `role`     | Role wire value (`"Manager"`, ...)     |
//! | `identity` | Full session document (JSON)           |
//!
//! The three keys are written and removed as one batch. A record where any
//! key is missing, or where `name`/`role` disagree with the document, loads
//! as "no session".

pub mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crm_core::{Identity, Session};

/// Session storage keys.
pub mod keys {
    /// Display name of the logged-in identity.
    pub const NAME: &str = "name";

    /// Role of the logged-in identity.
    pub const ROLE: &str = "role";

    /// Full serialized session.
    pub const IDENTITY: &str = "identity";

    /// Every key owned by the session store.
    pub const ALL: [&str; 3] = [NAME, ROLE, IDENTITY];
}

/// Errors raised by session persistence.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the storage medium failed.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be (de)serialized.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A previous holder of the storage lock panicked.
    #[error("session storage lock poisoned")]
    Poisoned,
}

/// Owner of the single session of a browsing context.
///
/// Every operation takes the same async lock, so a save or clear triggered by
/// one action completes before the next action reads or writes.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: Mutex<Option<Session>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over `storage`. Nothing is read until [`SessionStore::load`].
    #[must_use]
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            current: Mutex::new(None),
        }
    }

    /// In-memory store, for tests and embedding.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Rehydrate the persisted session.
    ///
    /// Returns `None` when nothing is stored or the stored record is partial
    /// or malformed. Never fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Option<Session> {
        let mut current = self.current.lock().await;
        let session = self.read_persisted();
        (*current).clone_from(&session);
        session
    }

    /// The session cached by the last load/save, without touching storage.
    pub async fn current(&self) -> Option<Session> {
        self.current.lock().await.clone()
    }

    /// Persist `identity` as the session.
    ///
    /// Must only be called after successful authentication. Saving the identity
    /// that is already stored leaves storage untouched and keeps the original
    /// `established_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the batch could not be written; the previous
    /// state is kept in that case.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id, role = %identity.role))]
    pub async fn save(&self, identity: Identity) -> Result<Session, SessionError> {
        let mut current = self.current.lock().await;

        if let Some(existing) = self.read_persisted()
            && existing.identity == identity
        {
            tracing::debug!("Session already holds this identity");
            *current = Some(existing.clone());
            return Ok(existing);
        }

        let session = Session::start(identity);
        let document = serde_json::to_string(&session)?;
        self.storage.set_all(&[
            (keys::NAME, session.identity.name.clone()),
            (keys::ROLE, session.identity.role.as_str().to_owned()),
            (keys::IDENTITY, document),
        ])?;

        tracing::info!("Session saved");
        *current = Some(session.clone());
        Ok(session)
    }

    /// Remove the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the batch could not be removed. The cached
    /// session is dropped regardless, so the store never reports a session it
    /// was asked to forget.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), SessionError> {
        let mut current = self.current.lock().await;
        *current = None;
        self.storage.remove_all(&keys::ALL)?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// User-initiated logout. Same as [`SessionStore::clear`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the persisted session could not be removed.
    pub async fn logout(&self) -> Result<(), SessionError> {
        if let Some(session) = self.current().await {
            tracing::info!(user_id = %session.identity.user_id, "Logging out");
        }
        self.clear().await
    }

    fn read_persisted(&self) -> Option<Session> {
        let read = |key: &str| match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session key");
                None
            }
        };

        let (name, role, document) = match (
            read(keys::NAME),
            read(keys::ROLE),
            read(keys::IDENTITY),
        ) {
            (None, None, None) => return None,
            (Some(name), Some(role), Some(document)) => (name, role, document),
            _ => {
                tracing::warn!("Partial session record in storage, treating as logged out");
                return None;
            }
        };

        let session: Session = match serde_json::from_str(&document) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed session document, treating as logged out");
                return None;
            }
        };

        if session.identity.name != name || session.identity.role.as_str() != role {
            tracing::warn!("Session keys disagree with session document, treating as logged out");
            return None;
        }

        Some(session)
    }
}
