//! Login flow.
//!
//! Resolves a submitted credential pair against a [`Directory`], saves the
//! resulting identity in the [`SessionStore`], and picks the landing route
//! for the identity's role.
//!
//! Attempts are serialized: while one attempt is outstanding, another
//! `submit` or `social_login` is rejected with [`LoginError::AttemptInProgress`]
//! instead of racing it to the session store.

mod directory;

pub use directory::{DemoAccount, DemoDirectory, Directory, RemoteDirectory};

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crm_core::{Email, EmailError, Identity, Session};

use crate::api::ApiError;
use crate::routes;
use crate::session::{SessionError, SessionStore};

/// Errors that can occur during login.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The submitted email is not a well-formed address.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account with that email.
    #[error("no account found for this email")]
    UnknownAccount,

    /// The account exists but the password does not match.
    #[error("incorrect password")]
    InvalidCredential,

    /// Another login attempt has not finished yet.
    #[error("a login attempt is already in progress")]
    AttemptInProgress,

    /// The directory could not be reached.
    #[error("network failure: {0}")]
    NetworkFailure(#[source] ApiError),

    /// The directory refused the attempt and said why.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The directory answered with something unexpected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The identity could not be persisted.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl From<ApiError> for LoginError {
    fn from(err: ApiError) -> Self {
        if err.is_transient() {
            return Self::NetworkFailure(err);
        }
        match err {
            ApiError::NotFound => Self::UnknownAccount,
            ApiError::Unauthorized => Self::InvalidCredential,
            ApiError::Rejected(message) => Self::Rejected(message),
            ApiError::Malformed(message) => Self::MalformedResponse(message),
            ApiError::Status { status, body } => {
                Self::MalformedResponse(format!("unexpected status {status}: {body}"))
            }
            ApiError::Http(_) | ApiError::Timeout(_) => Self::NetworkFailure(err),
        }
    }
}

/// A completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    /// The saved session.
    pub session: Session,
    /// Route to navigate to next.
    pub destination: &'static str,
}

/// Login flow over a directory and a session store.
pub struct LoginFlow<'a, D> {
    directory: D,
    sessions: &'a SessionStore,
    social_identity: Identity,
    attempt: Mutex<()>,
}

impl<D> std::fmt::Debug for LoginFlow<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow").finish_non_exhaustive()
    }
}

impl<'a, D: Directory> LoginFlow<'a, D> {
    /// Create a login flow. Social login uses the bundled demo identity.
    #[must_use]
    pub fn new(directory: D, sessions: &'a SessionStore) -> Self {
        Self {
            directory,
            sessions,
            social_identity: DemoDirectory::social_identity(),
            attempt: Mutex::new(()),
        }
    }

    /// Use a different identity for the social-login shortcut.
    #[must_use]
    pub fn with_social_identity(mut self, identity: Identity) -> Self {
        self.social_identity = identity;
        self
    }

    /// Submit an email/password pair.
    ///
    /// On success the identity is saved and the role's landing route returned.
    /// On failure the session store is not touched.
    ///
    /// # Errors
    ///
    /// - `InvalidEmail` if the email is malformed
    /// - `UnknownAccount` if no account matches the email
    /// - `InvalidCredential` if the password is wrong
    /// - `AttemptInProgress` if another attempt is outstanding
    /// - `NetworkFailure` / `Rejected` / `MalformedResponse` from a remote directory
    /// - `Session` if the session could not be persisted
    #[instrument(skip(self, password))]
    pub async fn submit(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginSuccess, LoginError> {
        let _attempt = self
            .attempt
            .try_lock()
            .map_err(|_| LoginError::AttemptInProgress)?;

        let email = Email::parse(email)?;
        let identity = match self.directory.authenticate(&email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(error = %e, "Login rejected");
                return Err(e);
            }
        };

        self.complete(identity).await
    }

    /// Log in as the fixed demo identity, skipping the directory.
    ///
    /// # Errors
    ///
    /// Returns `AttemptInProgress` if another attempt is outstanding, or
    /// `Session` if the session could not be persisted.
    #[instrument(skip(self))]
    pub async fn social_login(&self) -> Result<LoginSuccess, LoginError> {
        let _attempt = self
            .attempt
            .try_lock()
            .map_err(|_| LoginError::AttemptInProgress)?;

        self.complete(self.social_identity.clone()).await
    }

    async fn complete(&self, identity: Identity) -> Result<LoginSuccess, LoginError> {
        let destination = routes::destination_for(identity.role);
        let session = self.sessions.save(identity).await?;

        tracing::info!(
            user_id = %session.identity.user_id,
            role = %session.identity.role,
            destination,
            "Login succeeded"
        );

        Ok(LoginSuccess {
            session,
            destination,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use crm_core::{Role, UserId};
    use tokio::sync::Notify;

    use super::*;

    fn password(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_demo_login_routes_manager_to_dashboard() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);

        let success = flow
            .submit("demo@gmail.com", &password("123456"))
            .await
            .unwrap();

        assert_eq!(success.session.role(), Role::Manager);
        assert_eq!(success.destination, "/dashboard");
        assert_eq!(store.load().await, Some(success.session));
    }

    #[tokio::test]
    async fn test_admin_routes_to_admin() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);
        let success = flow
            .submit("admin@gmail.com", &password("123456"))
            .await
            .unwrap();
        assert_eq!(success.destination, "/admin");
    }

    #[tokio::test]
    async fn test_unrecognized_role_routes_home() {
        let store = SessionStore::in_memory();
        let directory = DemoDirectory::new([DemoAccount {
            identity: Identity {
                user_id: UserId::new("x"),
                name: "Odd".to_string(),
                email: Email::parse("odd@x.com").unwrap(),
                role: Role::Unrecognized,
                phone_number: "1".to_string(),
                gender: "-".to_string(),
                supervisor: None,
            },
            password: password("pw"),
        }]);
        let flow = LoginFlow::new(directory, &store);

        let success = flow.submit("odd@x.com", &password("pw")).await.unwrap();
        assert_eq!(success.destination, "/");
    }

    #[tokio::test]
    async fn test_unknown_account_writes_nothing() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);

        let err = flow.submit("nobody@x.com", &password("x")).await.unwrap_err();
        assert!(matches!(err, LoginError::UnknownAccount));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_writes_nothing() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);

        let err = flow
            .submit("demo@gmail.com", &password("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::InvalidCredential));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_session() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);
        let first = flow
            .submit("agent@gmail.com", &password("123456"))
            .await
            .unwrap();

        flow.submit("agent@gmail.com", &password("nope"))
            .await
            .unwrap_err();
        assert_eq!(store.load().await, Some(first.session));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_lookup() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);
        let err = flow.submit("not-an-email", &password("x")).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_social_login_uses_routing_table() {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(DemoDirectory::builtin(), &store);

        let success = flow.social_login().await.unwrap();
        assert_eq!(success.session.identity, DemoDirectory::social_identity());
        assert_eq!(success.destination, "/dashboard");
        assert!(store.load().await.is_some());
    }

    /// Directory that blocks until released, to hold an attempt open.
    struct SlowDirectory {
        gate: Arc<Notify>,
    }

    impl Directory for SlowDirectory {
        async fn authenticate(
            &self,
            email: &Email,
            password: &SecretString,
        ) -> Result<Identity, LoginError> {
            self.gate.notified().await;
            DemoDirectory::builtin().authenticate(email, password).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let store = SessionStore::in_memory();
        let gate = Arc::new(Notify::new());
        let flow = LoginFlow::new(
            SlowDirectory {
                gate: Arc::clone(&gate),
            },
            &store,
        );
        let pw = password("123456");

        let (first, second, social) = tokio::join!(
            flow.submit("demo@gmail.com", &pw),
            async {
                let result = flow.submit("agent@gmail.com", &pw).await;
                gate.notify_one();
                result
            },
            flow.social_login(),
        );

        assert_eq!(first.unwrap().session.role(), Role::Manager);
        assert!(matches!(second, Err(LoginError::AttemptInProgress)));
        assert!(matches!(social, Err(LoginError::AttemptInProgress)));
        assert_eq!(store.load().await.unwrap().role(), Role::Manager);
    }

    #[test]
    fn test_api_error_classification() {
        assert!(matches!(
            LoginError::from(ApiError::NotFound),
            LoginError::UnknownAccount
        ));
        assert!(matches!(
            LoginError::from(ApiError::Unauthorized),
            LoginError::InvalidCredential
        ));
        assert!(matches!(
            LoginError::from(ApiError::Timeout(std::time::Duration::from_secs(1))),
            LoginError::NetworkFailure(_)
        ));
        assert!(matches!(
            LoginError::from(ApiError::Malformed("x".to_string())),
            LoginError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_server_errors_are_network_failures() {
        let err = LoginError::from(ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        });
        assert!(matches!(err, LoginError::NetworkFailure(_)));

        let err = LoginError::from(ApiError::Status {
            status: 418,
            body: String::new(),
        });
        assert!(matches!(err, LoginError::MalformedResponse(_)));
    }

    #[test]
    fn test_rejection_keeps_server_message() {
        let err = LoginError::from(ApiError::Rejected("Account locked".to_string()));
        match err {
            LoginError::Rejected(message) => assert_eq!(message, "Account locked"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
