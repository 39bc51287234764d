//! Error taxonomy surfaced to users.
//!
//! Component errors ([`LoginError`], [`ApiError`], [`TeamError`],
//! [`SessionError`]) classify into [`CrmError`] at the boundary, which
//! carries the message shown to the user and whether the failure is worth
//! reporting.

use thiserror::Error;

use crate::api::ApiError;
use crate::login::LoginError;
use crate::session::SessionError;
use crate::team::TeamError;

/// User-facing error classes.
#[derive(Debug, Error)]
pub enum CrmError {
    /// No account matches the submitted email.
    #[error("Unknown account")]
    UnknownAccount,

    /// The account exists but the credential is wrong.
    #[error("Invalid credential")]
    InvalidCredential,

    /// The remote authority could not be reached.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The remote authority answered with something unexpected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No valid session; the user must log in again.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Another login attempt is still running.
    #[error("Login already in progress")]
    AttemptInProgress,

    /// Input failed validation before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The server refused the request and said why.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Local session storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CrmError {
    /// Message to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownAccount => "No account found with this email.".to_string(),
            Self::InvalidCredential => "Incorrect password.".to_string(),
            Self::NetworkFailure(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Self::MalformedResponse(_) => {
                "The server sent an unexpected response. Please try again.".to_string()
            }
            Self::Unauthenticated => "Your session has ended. Please log in again.".to_string(),
            Self::AttemptInProgress => "Please wait for the current login to finish.".to_string(),
            Self::InvalidInput(reason) | Self::Rejected(reason) => reason.clone(),
            Self::Storage(_) => "Could not save your session locally.".to_string(),
        }
    }

    /// Whether this error points at a fault worth reporting to error tracking.
    ///
    /// User mistakes and expired sessions are not reported.
    #[must_use]
    pub const fn should_report(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure(_) | Self::MalformedResponse(_) | Self::Storage(_)
        )
    }
}

impl From<ApiError> for CrmError {
    fn from(err: ApiError) -> Self {
        if err.is_transient() {
            return Self::NetworkFailure(err.to_string());
        }
        match err {
            ApiError::Unauthorized => Self::Unauthenticated,
            ApiError::Rejected(message) => Self::Rejected(message),
            _ => Self::MalformedResponse(err.to_string()),
        }
    }
}

impl From<LoginError> for CrmError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidEmail(e) => Self::InvalidInput(format!("Invalid email: {e}")),
            LoginError::UnknownAccount => Self::UnknownAccount,
            LoginError::InvalidCredential => Self::InvalidCredential,
            LoginError::AttemptInProgress => Self::AttemptInProgress,
            LoginError::NetworkFailure(e) => Self::NetworkFailure(e.to_string()),
            LoginError::Rejected(message) => Self::Rejected(message),
            LoginError::MalformedResponse(message) => Self::MalformedResponse(message),
            LoginError::Session(e) => Self::from(e),
        }
    }
}

impl From<TeamError> for CrmError {
    fn from(err: TeamError) -> Self {
        match err {
            TeamError::Api(e) => Self::from(e),
            TeamError::MissingField(_)
            | TeamError::InvalidEmail(_)
            | TeamError::RoleNotAssignable { .. }
            | TeamError::SupervisorRequired(_) => Self::InvalidInput(err.to_string()),
        }
    }
}

impl From<SessionError> for CrmError {
    fn from(err: SessionError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crm_core::Role;

    use super::*;

    #[test]
    fn test_login_errors_classify() {
        assert!(matches!(
            CrmError::from(LoginError::UnknownAccount),
            CrmError::UnknownAccount
        ));
        assert!(matches!(
            CrmError::from(LoginError::InvalidCredential),
            CrmError::InvalidCredential
        ));
        assert!(matches!(
            CrmError::from(LoginError::NetworkFailure(ApiError::Timeout(
                Duration::from_secs(10)
            ))),
            CrmError::NetworkFailure(_)
        ));
        assert!(matches!(
            CrmError::from(LoginError::Session(SessionError::Poisoned)),
            CrmError::Storage(_)
        ));
    }

    #[test]
    fn test_api_errors_classify() {
        assert!(matches!(
            CrmError::from(ApiError::Unauthorized),
            CrmError::Unauthenticated
        ));
        assert!(matches!(
            CrmError::from(ApiError::Malformed("bad".to_string())),
            CrmError::MalformedResponse(_)
        ));
        assert!(matches!(
            CrmError::from(ApiError::Status {
                status: 500,
                body: String::new()
            }),
            CrmError::NetworkFailure(_)
        ));
        assert!(matches!(
            CrmError::from(ApiError::Status {
                status: 418,
                body: String::new()
            }),
            CrmError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_login_rejection_message_reaches_user() {
        let err = CrmError::from(LoginError::from(ApiError::Rejected(
            "Account locked".to_string(),
        )));
        assert_eq!(err.user_message(), "Account locked");
        assert!(!err.should_report());
    }

    #[test]
    fn test_rejection_message_reaches_user() {
        let err = CrmError::from(TeamError::Api(ApiError::Rejected(
            "Email already registered".to_string(),
        )));
        assert_eq!(err.user_message(), "Email already registered");
        assert!(!err.should_report());
    }

    #[test]
    fn test_validation_is_invalid_input() {
        let err = CrmError::from(TeamError::SupervisorRequired(Role::Agent));
        assert_eq!(err.user_message(), "a supervisor is required for Agent");
    }

    #[test]
    fn test_should_report() {
        assert!(CrmError::NetworkFailure("x".to_string()).should_report());
        assert!(CrmError::MalformedResponse("x".to_string()).should_report());
        assert!(!CrmError::UnknownAccount.should_report());
        assert!(!CrmError::Unauthenticated.should_report());
    }
}
