//! User directories that resolve credential pairs to identities.

use std::collections::HashMap;
use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crm_core::{Email, Identity, Role, UserId};

use super::LoginError;
use crate::api::ApiClient;

/// Source of truth mapping email/password to identities.
pub trait Directory: Send + Sync {
    /// Resolve exactly one account for `email` and check `password` against it.
    ///
    /// Implementations must return `UnknownAccount` when no account matches
    /// and `InvalidCredential` when the account exists but the password does not.
    fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<Identity, LoginError>> + Send;
}

/// A demo account: an identity and its plain-value password.
#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub identity: Identity,
    pub password: SecretString,
}

/// In-memory demo dataset.
///
/// # Security
///
/// Passwords are compared as plain values. This is a demo fixture, not a
/// security model: a real deployment uses [`RemoteDirectory`], where the
/// server hashes and verifies.
#[derive(Debug, Clone)]
pub struct DemoDirectory {
    // Keyed by normalized email
    accounts: HashMap<String, DemoAccount>,
}

impl DemoDirectory {
    /// Directory over `accounts`. A later account with an already-used email is ignored.
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = DemoAccount>) -> Self {
        let mut map = HashMap::new();
        for account in accounts {
            let key = account.identity.email.normalized();
            if map.contains_key(&key) {
                tracing::warn!(email = %key, "Ignoring duplicate demo account");
                continue;
            }
            map.insert(key, account);
        }
        Self { accounts: map }
    }

    /// The bundled demo accounts.
    #[must_use]
    pub fn builtin() -> Self {
        let account = |id: &str, name: &str, email: &str, role: Role, supervisor: Option<&str>| {
            DemoAccount {
                identity: demo_identity(id, name, email, role, supervisor),
                password: SecretString::from("123456"),
            }
        };

        Self::new([
            account("demo-1", "Demo User", "demo@gmail.com", Role::Manager, None),
            account("demo-2", "Ada Admin", "admin@gmail.com", Role::Admin, None),
            account("demo-3", "Sam Supervisor", "supervisor@gmail.com", Role::Supervisor, None),
            account(
                "demo-4",
                "Sally Sales",
                "sales@gmail.com",
                Role::SalesAgent,
                Some("Sam Supervisor"),
            ),
            account("demo-5", "Andy Agent", "agent@gmail.com", Role::Agent, Some("Sam Supervisor")),
        ])
    }

    /// Identity used by the social-login shortcut.
    #[must_use]
    pub fn social_identity() -> Identity {
        demo_identity("demo-1", "Demo User", "demo@gmail.com", Role::Manager, None)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the directory has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Directory for DemoDirectory {
    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, LoginError> {
        let account = self
            .accounts
            .get(&email.normalized())
            .ok_or(LoginError::UnknownAccount)?;

        if account.password.expose_secret() != password.expose_secret() {
            return Err(LoginError::InvalidCredential);
        }

        Ok(account.identity.clone())
    }
}

fn demo_identity(
    id: &str,
    name: &str,
    email: &str,
    role: Role,
    supervisor: Option<&str>,
) -> Identity {
    Identity {
        user_id: UserId::new(id),
        name: name.to_owned(),
        // Demo addresses are literals known to be well-formed
        email: Email::parse(email).unwrap_or_else(|_| unreachable!("invalid demo email {email}")),
        role,
        phone_number: "0700000000".to_owned(),
        gender: "Unspecified".to_owned(),
        supervisor: supervisor.map(str::to_owned),
    }
}

/// Directory backed by the remote auth API.
#[derive(Debug, Clone)]
pub struct RemoteDirectory {
    api: ApiClient,
}

impl RemoteDirectory {
    /// Directory that checks credentials through `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl Directory for RemoteDirectory {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, LoginError> {
        let record = self.api.login(email.as_str(), password).await?;
        let identity = Identity::try_from(record)?;

        if !identity.email.same_account(email) {
            return Err(LoginError::MalformedResponse(format!(
                "authority answered for {} instead of {email}",
                identity.email
            )));
        }

        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_builtin_demo_account() {
        let directory = DemoDirectory::builtin();
        let identity = directory
            .authenticate(&email("demo@gmail.com"), &SecretString::from("123456"))
            .await
            .unwrap();
        assert_eq!(identity.role, Role::Manager);
        assert_eq!(directory.len(), 5);
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let directory = DemoDirectory::builtin();
        let identity = directory
            .authenticate(&email("DEMO@Gmail.com"), &SecretString::from("123456"))
            .await
            .unwrap();
        assert_eq!(identity.email.as_str(), "demo@gmail.com");
    }

    #[tokio::test]
    async fn test_unknown_and_wrong_password() {
        let directory = DemoDirectory::builtin();
        assert!(matches!(
            directory
                .authenticate(&email("nobody@x.com"), &SecretString::from("x"))
                .await,
            Err(LoginError::UnknownAccount)
        ));
        assert!(matches!(
            directory
                .authenticate(&email("demo@gmail.com"), &SecretString::from("654321"))
                .await,
            Err(LoginError::InvalidCredential)
        ));
    }

    #[test]
    fn test_duplicate_accounts_keep_first() {
        let first = DemoAccount {
            identity: demo_identity("a", "First", "dup@x.com", Role::Agent, None),
            password: SecretString::from("1"),
        };
        let second = DemoAccount {
            identity: demo_identity("b", "Second", "DUP@x.com", Role::Admin, None),
            password: SecretString::from("2"),
        };
        let directory = DemoDirectory::new([first, second]);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_social_identity_is_in_builtin_set() {
        let social = DemoDirectory::social_identity();
        let directory = DemoDirectory::builtin();
        let account = directory.accounts.get(&social.email.normalized()).unwrap();
        assert_eq!(account.identity, social);
    }
}
