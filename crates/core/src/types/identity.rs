//! Authenticated identity and session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, Role, UserId};

/// The identity issued on a successful login or directory lookup.
///
/// Immutable for the lifetime of a session: a different identity means a
/// different session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Directory-issued user ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Exactly one role, assigned at registration.
    pub role: Role,
    /// Contact phone number.
    pub phone_number: String,
    /// Gender as recorded at registration.
    pub gender: String,
    /// Name of the supervising user, if any.
    #[serde(default)]
    pub supervisor: Option<String>,
}

/// The locally held record of an authenticated identity.
///
/// Not self-certifying: the cached copy is a UX optimisation and must be
/// reconfirmed against the remote authority before protected actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Who is logged in.
    pub identity: Identity,
    /// When the session was first saved.
    pub established_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `identity` now.
    #[must_use]
    pub fn start(identity: Identity) -> Self {
        Self {
            identity,
            established_at: Utc::now(),
        }
    }

    /// Shortcut for the session's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.identity.role
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new("u-1"),
            name: "Demo User".to_string(),
            email: Email::parse("demo@gmail.com").unwrap(),
            role: Role::Manager,
            phone_number: "0700000000".to_string(),
            gender: "Female".to_string(),
            supervisor: None,
        }
    }

    #[test]
    fn test_identity_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(identity()).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["phoneNumber"], "0700000000");
        assert_eq!(json["role"], "Manager");
        assert!(json["supervisor"].is_null());
    }

    #[test]
    fn test_identity_missing_supervisor_defaults_to_none() {
        let json = r#"{"userId":"u-2","name":"A","email":"a@b.c","role":"Agent","phoneNumber":"1","gender":"Male"}"#;
        let parsed: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.supervisor, None);
        assert_eq!(parsed.role, Role::Agent);
    }

    #[test]
    fn test_session_role() {
        let session = Session::start(identity());
        assert_eq!(session.role(), Role::Manager);
        assert!(session.established_at <= Utc::now());
    }
}
