//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CRM_API_BASE_URL` - Remote authority base URL (default: `http://127.0.0.1:3001`)
//! - `CRM_API_TOKEN` - Bearer token sent with every API request
//! - `CRM_SESSION_PATH` - Where the session is persisted (default: `.crm/session.json`)
//! - `CRM_DIRECTORY` - `demo` (local dataset) or `remote` (default: demo)
//! - `CRM_VERIFY_TIMEOUT_SECS` - Upper bound on a session verification call (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3001";
const DEFAULT_SESSION_PATH: &str = ".crm/session.json";
const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which directory resolves login credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryKind {
    /// Built-in demo dataset with plain-value passwords.
    #[default]
    Demo,
    /// Remote auth API.
    Remote,
}

impl std::str::FromStr for DirectoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "remote" => Ok(Self::Remote),
            other => Err(format!("expected 'demo' or 'remote', got '{other}'")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote API connection settings.
    pub api: ApiConfig,
    /// Path of the persisted session document.
    pub session_path: PathBuf,
    /// Which directory resolves logins.
    pub directory: DirectoryKind,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

/// Remote API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the remote authority.
    pub base_url: Url,
    /// Ambient transport credential.
    pub token: Option<SecretString>,
    /// Upper bound on a single verification round trip.
    pub verify_timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with no token and the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("CRM_API_BASE_URL", base_url)?,
            token: None,
            verify_timeout: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
        })
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the verification timeout.
    #[must_use]
    pub const fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "CRM_API_BASE_URL",
            &get_env_or_default("CRM_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let token = get_optional_env("CRM_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let verify_timeout = parse_timeout(&get_env_or_default(
            "CRM_VERIFY_TIMEOUT_SECS",
            &DEFAULT_VERIFY_TIMEOUT_SECS.to_string(),
        ))?;

        Ok(Self {
            base_url,
            token,
            verify_timeout,
        })
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let session_path =
            PathBuf::from(get_env_or_default("CRM_SESSION_PATH", DEFAULT_SESSION_PATH));
        let directory = get_env_or_default("CRM_DIRECTORY", "demo")
            .parse::<DirectoryKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("CRM_DIRECTORY".to_string(), e))?;

        Ok(Self {
            api,
            session_path,
            directory,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    let secs = value.trim().parse::<u64>().map_err(|e| {
        ConfigError::InvalidEnvVar("CRM_VERIFY_TIMEOUT_SECS".to_string(), e.to_string())
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "CRM_VERIFY_TIMEOUT_SECS".to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
