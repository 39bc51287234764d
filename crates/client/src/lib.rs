//! CRM Client - authentication, session and navigation core.
//!
//! This crate holds the rules behind the CRM screens:
//! - who is logged in, and how that survives a restart ([`session`])
//! - whether a protected view may render ([`guard`])
//! - how a credential pair becomes a session ([`login`])
//! - which sidebar a role sees ([`navigation`], [`routes`])
//! - team listing and registration ([`team`])
//!
//! # Security
//!
//! The guard is a UX gate, not a security boundary. Every sensitive
//! operation must also be authorized by the remote authority.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod login;
pub mod navigation;
pub mod routes;
pub mod session;
pub mod team;

pub use api::{ApiClient, ApiError};
pub use config::{ApiConfig, ClientConfig, ConfigError, DirectoryKind};
pub use error::CrmError;
pub use guard::{AuthGuard, GuardDecision, GuardState, Verdict, Verifier};
pub use login::{DemoDirectory, Directory, LoginError, LoginFlow, LoginSuccess, RemoteDirectory};
pub use navigation::{NavigationItem, NavigationState};
pub use session::{FileStorage, MemoryStorage, SessionError, SessionStorage, SessionStore};
pub use team::{NewUserForm, TeamError, TeamMember, TeamPage, TeamQuery, TeamService};
