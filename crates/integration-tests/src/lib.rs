//! Integration tests for the CRM client.
//!
//! Provides [`MockAuthority`], an in-process stand-in for the remote CRM
//! backend, so the client can be exercised over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crm-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `guard_http` - Session verification and fail-closed behaviour
//! - `remote_login` - Login against the remote directory
//! - `team_http` - Team listing and registration
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/auth/verify   - behaviour set by MockAuthority::set_verify
//! POST /api/auth/login    - 200 | 401 wrong password | 404 unknown email
//! GET  /api/users         - every stored user
//! POST /api/users         - 201 with temporary password | 409 duplicate email
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use crm_client::ApiConfig;
use crm_client::api::UserRecord;

/// Password of every seeded account.
pub const SEED_PASSWORD: &str = "123456";

/// How `GET /api/auth/verify` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyBehavior {
    /// `200 { "valid": true }`
    Valid,
    /// `200 { "valid": false }`
    Invalid,
    /// Bare status code with no body.
    Status(u16),
    /// `200` with a body that is not the expected JSON.
    Malformed,
    /// Never answers.
    Hang,
}

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    password: String,
}

struct MockState {
    users: Mutex<Vec<StoredUser>>,
    verify: Mutex<VerifyBehavior>,
    verify_calls: AtomicUsize,
    login_calls: AtomicUsize,
    fail_listing: AtomicBool,
}

impl MockState {
    fn users(&self) -> MutexGuard<'_, Vec<StoredUser>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn verify_behavior(&self) -> VerifyBehavior {
        *self.verify.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process mock of the remote authority, bound to an ephemeral port.
///
/// Shuts down when dropped.
pub struct MockAuthority {
    state: Arc<MockState>,
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAuthority {
    /// Start a mock seeded with one account per role.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if binding to an ephemeral port fails.
    pub async fn start() -> std::io::Result<Self> {
        let mock = Self::start_empty().await?;
        mock.add_user(seed("1", "Demo User", "demo@gmail.com", "Manager", None), SEED_PASSWORD);
        mock.add_user(seed("2", "Ada Admin", "admin@gmail.com", "Admin", None), SEED_PASSWORD);
        mock.add_user(
            seed("3", "Sam Supervisor", "supervisor@gmail.com", "Supervisor", None),
            SEED_PASSWORD,
        );
        mock.add_user(
            seed("4", "Sally Sales", "sales@gmail.com", "SalesAgent", Some("Sam Supervisor")),
            SEED_PASSWORD,
        );
        mock.add_user(
            seed("5", "Andy Agent", "agent@gmail.com", "Agent", Some("Sam Supervisor")),
            SEED_PASSWORD,
        );
        Ok(mock)
    }

    /// Start a mock with no users.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if binding to an ephemeral port fails.
    pub async fn start_empty() -> std::io::Result<Self> {
        let state = Arc::new(MockState {
            users: Mutex::new(Vec::new()),
            verify: Mutex::new(VerifyBehavior::Valid),
            verify_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            fail_listing: AtomicBool::new(false),
        });

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let local_addr = listener.local_addr()?;
        let base_url = format!("http://{local_addr}");

        let app = Router::new()
            .route("/api/auth/verify", get(verify))
            .route("/api/auth/login", axum::routing::post(login))
            .route("/api/users", get(list_users).post(create_user))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&state));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(e) = result {
                tracing::error!("Mock authority error: {e}");
            }
        });

        Ok(Self {
            state,
            base_url,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration pointing at this mock.
    ///
    /// # Errors
    ///
    /// Never fails for a running mock; the base URL is always valid.
    pub fn api_config(&self) -> Result<ApiConfig, crm_client::ConfigError> {
        ApiConfig::new(&self.base_url)
    }

    /// Store a user that can log in with `password`.
    pub fn add_user(&self, record: UserRecord, password: &str) {
        self.state.users().push(StoredUser {
            record,
            password: password.to_owned(),
        });
    }

    /// Every stored user record, in insertion order.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        self.state.users().iter().map(|u| u.record.clone()).collect()
    }

    /// Change how session verification answers.
    pub fn set_verify(&self, behavior: VerifyBehavior) {
        *self.state.verify.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// Make `GET /api/users` answer `success: false`.
    pub fn fail_user_listing(&self, fail: bool) {
        self.state.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of verification requests received.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.state.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of login requests received.
    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    /// Stop serving. Later requests fail to connect.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAuthority {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A user record for seeding.
#[must_use]
pub fn seed(
    user_id: &str,
    name: &str,
    email: &str,
    role: &str,
    supervisor: Option<&str>,
) -> UserRecord {
    UserRecord {
        user_id: user_id.to_owned(),
        name: name.to_owned(),
        email: email.to_owned(),
        gender: "Unspecified".to_owned(),
        phone_number: format!("07000000{user_id:0>2}"),
        role: role.to_owned(),
        supervisor: supervisor.map(str::to_owned),
    }
}

// =============================================================================
// Handlers
// =============================================================================

type SharedState = State<Arc<MockState>>;

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn verify(State(state): SharedState) -> Response {
    state.verify_calls.fetch_add(1, Ordering::SeqCst);

    match state.verify_behavior() {
        VerifyBehavior::Valid => Json(json!({ "valid": true })).into_response(),
        VerifyBehavior::Invalid => Json(json!({ "valid": false })).into_response(),
        VerifyBehavior::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        VerifyBehavior::Malformed => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        VerifyBehavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): SharedState, Json(body): Json<LoginBody>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    let email = body.email.trim().to_ascii_lowercase();
    let found = state
        .users()
        .iter()
        .find(|u| u.record.email.to_ascii_lowercase() == email)
        .cloned();

    match found {
        None => message(StatusCode::NOT_FOUND, "No account found for this email"),
        Some(user) if user.password != body.password => {
            message(StatusCode::UNAUTHORIZED, "Incorrect password")
        }
        Some(user) => Json(json!({ "success": true, "data": user.record })).into_response(),
    }
}

async fn list_users(State(state): SharedState) -> Response {
    if state.fail_listing.load(Ordering::SeqCst) {
        return Json(json!({ "success": false, "message": "Directory unavailable" }))
            .into_response();
    }

    let users: Vec<UserRecord> = state.users().iter().map(|u| u.record.clone()).collect();
    Json(json!({ "success": true, "data": users })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody {
    name: String,
    email: String,
    phone_number: String,
    gender: String,
    role: String,
    supervisor: Option<String>,
}

async fn create_user(State(state): SharedState, Json(body): Json<CreateUserBody>) -> Response {
    let mut users = state.users();

    let email = body.email.to_ascii_lowercase();
    if users
        .iter()
        .any(|u| u.record.email.to_ascii_lowercase() == email)
    {
        return message(StatusCode::CONFLICT, "Email already registered");
    }

    let password = temporary_password();
    let record = UserRecord {
        user_id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        gender: body.gender,
        phone_number: body.phone_number,
        role: body.role,
        supervisor: body.supervisor,
    };
    users.push(StoredUser {
        record: record.clone(),
        password: password.clone(),
    });
    drop(users);

    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": record, "temporaryPassword": password })),
    )
        .into_response()
}

fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}
