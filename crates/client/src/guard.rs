//! Protected-view guard.
//!
//! Decides, for a requested protected view, whether to render it, show a
//! loading placeholder, or redirect to the login entry point.
//!
//! # States
//!
//! ```text
//! Unknown ──activate──▶ Verifying ──▶ Authenticated   (render)
//!                                 └─▶ Unauthenticated (redirect, session cleared)
//! ```
//!
//! # Security
//!
//! This is a UX guard, not a security boundary. The remote authority must
//! authorize every sensitive operation on its own; the guard only avoids
//! showing screens to users whose session is already known to be dead.
//!
//! Verification fails closed: timeouts, transport errors, unexpected
//! statuses and malformed bodies all resolve to `Unauthenticated`.

use std::future::Future;
use std::time::Duration;

use crm_core::Session;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::api::{ApiClient, ApiError};
use crate::routes;
use crate::session::SessionStore;

/// Default upper bound on one verification.
const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote authority that can confirm the ambient credential.
pub trait Verifier: Send + Sync {
    /// `Ok(true)` if the credential maps to a live session.
    fn verify(&self) -> impl Future<Output = Result<bool, ApiError>> + Send;
}

impl Verifier for ApiClient {
    async fn verify(&self) -> Result<bool, ApiError> {
        self.verify_session().await
    }
}

/// Guard lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Not yet checked in this activation.
    Unknown,
    /// Verification in flight.
    Verifying,
    /// The authority confirmed the session.
    Authenticated,
    /// No session, or the authority did not confirm it.
    Unauthenticated,
}

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The authority confirmed the session.
    Authenticated,
    /// No session, or the authority did not confirm it in time.
    Unauthenticated,
}

impl From<Verdict> for GuardState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Authenticated => Self::Authenticated,
            Verdict::Unauthenticated => Self::Unauthenticated,
        }
    }
}

/// What the presentation layer should do with a requested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a loading placeholder.
    Loading,
    /// Mount the requested view.
    Render {
        /// The requested path.
        path: String,
    },
    /// Navigate elsewhere.
    Redirect {
        /// Target route.
        to: &'static str,
        /// Replace the history entry so "back" cannot return to the protected view.
        replace: bool,
    },
}

impl GuardState {
    /// The decision this state implies for `requested`.
    #[must_use]
    pub fn decision(self, requested: &str) -> GuardDecision {
        match self {
            Self::Unknown | Self::Verifying => GuardDecision::Loading,
            Self::Authenticated => GuardDecision::Render {
                path: requested.to_owned(),
            },
            Self::Unauthenticated => GuardDecision::Redirect {
                to: routes::LOGIN,
                replace: true,
            },
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: GuardState,
    // Bumped on every deactivation; results for older lifecycles are dropped
    lifecycle: u64,
}

/// Guard over a protected subtree.
///
/// Verification runs once per activation; re-rendering inside the same
/// activation reuses the settled state.
pub struct AuthGuard<'a, V> {
    verifier: V,
    sessions: &'a SessionStore,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl<V> std::fmt::Debug for AuthGuard<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a, V: Verifier> AuthGuard<'a, V> {
    /// Create a guard in the `Unknown` state.
    #[must_use]
    pub fn new(verifier: V, sessions: &'a SessionStore) -> Self {
        Self {
            verifier,
            sessions,
            timeout: DEFAULT_VERIFY_TIMEOUT,
            inner: Mutex::new(Inner {
                state: GuardState::Unknown,
                lifecycle: 0,
            }),
        }
    }

    /// Bound every verification by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current state.
    pub async fn state(&self) -> GuardState {
        self.inner.lock().await.state
    }

    /// Decision for `requested` without triggering verification.
    pub async fn decision(&self, requested: &str) -> GuardDecision {
        self.state().await.decision(requested)
    }

    /// Enter the protected view at `requested`.
    ///
    /// Verifies the session if this activation has not done so yet, then
    /// returns the resulting decision. If the guard was deactivated while
    /// verification was in flight, the result is discarded and the decision
    /// reflects the new lifecycle.
    #[instrument(skip(self))]
    pub async fn activate(&self, requested: &str) -> GuardDecision {
        let state = self.state().await;
        if state != GuardState::Unknown {
            return state.decision(requested);
        }

        self.verify().await;
        self.decision(requested).await
    }

    /// The session to act on for a protected operation at `requested`.
    ///
    /// Returns the stored session only once the authority has confirmed it in
    /// this activation. Anything else yields `None`, and a session the
    /// authority rejected has already been cleared.
    pub async fn authorize(&self, requested: &str) -> Option<Session> {
        match self.activate(requested).await {
            GuardDecision::Render { .. } => self.sessions.current().await,
            GuardDecision::Loading | GuardDecision::Redirect { .. } => None,
        }
    }

    /// Confirm the current session with the remote authority.
    ///
    /// Never resolves to `Authenticated` on an error. On `Unauthenticated`
    /// the session store is cleared, unless the guard was deactivated in the
    /// meantime.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> Verdict {
        let lifecycle = {
            let mut inner = self.inner.lock().await;
            inner.state = GuardState::Verifying;
            inner.lifecycle
        };

        let verdict = self.check().await;
        self.settle(lifecycle, verdict).await;
        verdict
    }

    /// Leave the protected view (unmount).
    ///
    /// Resets the guard to `Unknown` and discards any verification still in flight.
    pub async fn deactivate(&self) {
        let mut inner = self.inner.lock().await;
        inner.lifecycle = inner.lifecycle.wrapping_add(1);
        inner.state = GuardState::Unknown;
    }

    async fn check(&self) -> Verdict {
        if self.sessions.load().await.is_none() {
            tracing::debug!("No local session");
            return Verdict::Unauthenticated;
        }

        match tokio::time::timeout(self.timeout, self.verifier.verify()).await {
            Ok(Ok(true)) => Verdict::Authenticated,
            Ok(Ok(false)) => {
                tracing::info!("Authority reports session invalid");
                Verdict::Unauthenticated
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Session verification failed");
                Verdict::Unauthenticated
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Session verification timed out");
                Verdict::Unauthenticated
            }
        }
    }

    async fn settle(&self, lifecycle: u64, verdict: Verdict) {
        let mut inner = self.inner.lock().await;
        if inner.lifecycle != lifecycle {
            tracing::debug!(?verdict, "Discarding verification for a stale view");
            return;
        }

        inner.state = verdict.into();
        if verdict == Verdict::Unauthenticated
            && let Err(e) = self.sessions.clear().await
        {
            tracing::error!(error = %e, "Failed to clear session after failed verification");
        }
    }
}
