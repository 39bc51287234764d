//! CLI command implementations.

pub mod auth;
pub mod nav;
pub mod team;

use crm_client::{ApiClient, AuthGuard, ClientConfig, CrmError, FileStorage, SessionStore};
use crm_core::{Role, Session};

/// Shared state for one CLI invocation.
pub struct Context<'a> {
    pub config: &'a ClientConfig,
    pub api: ApiClient,
    pub sessions: SessionStore,
}

impl<'a> Context<'a> {
    /// Build the API client and open the session file named by `config`.
    pub fn new(config: &'a ClientConfig) -> Result<Self, CrmError> {
        Ok(Self {
            config,
            api: ApiClient::new(&config.api)?,
            sessions: SessionStore::new(FileStorage::new(&config.session_path)),
        })
    }

    /// The stored session, or `Unauthenticated` if there is none.
    ///
    /// Not confirmed with the authority; use [`Self::verified_session`]
    /// before any protected action.
    pub async fn require_session(&self) -> Result<Session, CrmError> {
        self.sessions.load().await.ok_or(CrmError::Unauthenticated)
    }

    /// The stored session once the authority has confirmed it for `path`.
    ///
    /// A session the authority rejects is cleared.
    pub async fn verified_session(&self, path: &str) -> Result<Session, CrmError> {
        AuthGuard::new(self.api.clone(), &self.sessions)
            .with_timeout(self.config.api.verify_timeout)
            .authorize(path)
            .await
            .ok_or(CrmError::Unauthenticated)
    }
}

/// Parse a role argument, rejecting anything outside the known set.
pub fn parse_role(value: &str) -> Result<Role, CrmError> {
    value
        .parse()
        .map_err(|e: crm_core::RoleError| CrmError::InvalidInput(e.to_string()))
}
