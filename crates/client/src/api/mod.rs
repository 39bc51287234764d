//! Remote authority API client.
//!
//! Talks to the CRM backend for session verification, credential checks and
//! user directory management.
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/auth/verify   - { valid }
//! POST /api/auth/login    - { success, data: UserRecord } | 401 | 404
//! GET  /api/users         - { success, data: [UserRecord] }
//! POST /api/users         - { success, data: UserRecord, temporaryPassword } | { message }
//! ```
//!
//! # Authentication
//!
//! Requests carry the ambient transport credential: an optional bearer token
//! from configuration plus whatever cookies the server has set on this client.

pub mod types;

pub use types::{CreatedUser, ErrorBody, NewUser, UserRecord, VerifyResponse};

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::ApiConfig;
use types::{CreatedEnvelope, Envelope, LoginRequest};

/// Overall per-request timeout for non-verification calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the remote authority.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, TLS, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not complete within its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The credential was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested record does not exist.
    #[error("Not found")]
    NotFound,

    /// The server refused the request and said why.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Unexpected status code.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Response body was not in the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether the authority could not be reached or could not serve the
    /// request: transport failures, timeouts and 5xx statuses.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Remote authority client.
///
/// Cheap to clone; clones share the connection pool and cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    verify_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured authority.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                verify_timeout: config.verify_timeout,
            }),
        })
    }

    /// The authority's base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Ask the authority whether the ambient credential is still valid.
    ///
    /// Bounded by the configured verification timeout.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Timeout` if the deadline passes, `ApiError::Http` on
    /// transport failure, `ApiError::Unauthorized` on 401/403 and
    /// `ApiError::Malformed` if the body is not `{ valid: bool }`.
    #[instrument(skip(self))]
    pub async fn verify_session(&self) -> Result<bool, ApiError> {
        let timeout = self.inner.verify_timeout;
        let request = self.get("api/auth/verify");

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(timeout))??;

        let body: VerifyResponse = read_json(response).await?;
        Ok(body.valid)
    }

    /// Check a credential pair against the remote directory.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown account,
    /// `ApiError::Unauthorized` for a wrong password, and transport or
    /// shape errors otherwise.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserRecord, ApiError> {
        let response = self
            .post("api/auth/login")
            .json(&LoginRequest {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let envelope: Envelope<UserRecord> = read_json(response).await?;
        envelope.into_data("login")
    }

    // =========================================================================
    // User directory
    // =========================================================================

    /// List every user in the directory.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Malformed` if the directory answers `success: false`
    /// or with data that is not a list of user records.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let response = self.get("api/users").send().await?;
        let envelope: Envelope<Vec<UserRecord>> = read_json(response).await?;
        let users = envelope.into_data("list users")?;
        tracing::debug!(count = users.len(), "Fetched directory users");
        Ok(users)
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with the server's message when the
    /// directory refuses the registration (duplicate email, bad supervisor).
    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    pub async fn create_user(&self, user: &NewUser) -> Result<CreatedUser, ApiError> {
        let response = self.post("api/users").json(user).send().await?;
        let envelope: CreatedEnvelope = read_json(response).await?;

        match (envelope.success, envelope.data, envelope.temporary_password) {
            (true, Some(user), Some(password)) => {
                tracing::info!(user_id = %user.user_id, "User registered");
                Ok(CreatedUser {
                    user,
                    temporary_password: SecretString::from(password),
                })
            }
            _ => Err(ApiError::Malformed(
                "create user: missing record or temporary password".to_string(),
            )),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.inner.http.get(self.endpoint(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.inner.http.post(self.endpoint(path)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

/// Map the status code, then decode the body as `T`.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Malformed(format!("HTTP {status}: {e}")));
    }

    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(ApiError::Unauthorized)
        }
        reqwest::StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        s if s.is_client_error() => {
            // 4xx bodies carry `{ message }` when the server rejects input
            match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => Err(ApiError::Rejected(body.message)),
                Err(_) => Err(status_error(status, &bytes)),
            }
        }
        _ => Err(status_error(status, &bytes)),
    }
}

fn status_error(status: reqwest::StatusCode, bytes: &[u8]) -> ApiError {
    let body: String = String::from_utf8_lossy(bytes).chars().take(200).collect();
    ApiError::Status {
        status: status.as_u16(),
        body,
    }
}
