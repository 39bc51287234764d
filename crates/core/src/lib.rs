//! CRM Core - Shared types library.
//!
//! This crate provides the types shared by every CRM component:
//! - `client` - Session, guard, login and navigation logic
//! - `cli` - Command-line frontend
//! - `integration-tests` - Mock remote authority and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Emails, roles, user IDs, identities and sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
