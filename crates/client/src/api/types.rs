//! Wire types for the remote authority.
//!
//! Field names follow the remote API's camelCase convention.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crm_core::{Email, Identity, Role, UserId};

use super::ApiError;

/// `GET /api/auth/verify` response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the transport credential still maps to a live session.
    pub valid: bool,
}

/// `POST /api/auth/login` request.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Standard `{ success, data }` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, treating `success: false` or a missing payload as malformed.
    pub fn into_data(self, what: &str) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Malformed(format!(
                "{what}: success=false{}",
                self.message
                    .map(|m| format!(" ({m})"))
                    .unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| ApiError::Malformed(format!("{what}: missing data")))
    }
}

/// `POST /api/users` success body: the record plus its one-time password.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedEnvelope {
    pub success: bool,
    pub data: Option<UserRecord>,
    pub temporary_password: Option<String>,
}

/// Error body returned by the remote API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub message: String,
}

/// A user as returned by the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub gender: String,
    pub phone_number: String,
    pub role: String,
    #[serde(default)]
    pub supervisor: Option<String>,
}

impl UserRecord {
    /// The record's role, with unknown tags mapped to `Role::Unrecognized`.
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_tag(&self.role)
    }
}

impl TryFrom<UserRecord> for Identity {
    type Error = ApiError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let email = Email::parse(&record.email).map_err(|e| {
            ApiError::Malformed(format!("invalid email for user {}: {e}", record.user_id))
        })?;
        let role = record.role();

        Ok(Self {
            user_id: UserId::new(record.user_id),
            name: record.name,
            email,
            role,
            phone_number: record.phone_number,
            gender: record.gender,
            supervisor: record.supervisor.filter(|s| !s.is_empty()),
        })
    }
}

/// `POST /api/users` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone_number: String,
    pub gender: String,
    pub role: Role,
    pub supervisor: Option<String>,
}

/// A freshly registered user and the temporary password to hand over.
#[derive(Debug)]
pub struct CreatedUser {
    /// The record as stored by the directory.
    pub user: UserRecord,
    /// One-time password; must be changed on first login.
    pub temporary_password: SecretString,
}
