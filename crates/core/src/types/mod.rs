//! Core types for the CRM client.
//!
//! This module provides type-safe wrappers for the identity domain.

pub mod email;
pub mod id;
pub mod identity;
pub mod role;

pub use email::{Email, EmailError};
pub use id::UserId;
pub use identity::{Identity, Session};
pub use role::{Role, RoleError};
