//! Permission tiers.

use serde::{Deserialize, Serialize};

/// Errors returned when a role tag is required to be one of the known tiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// The tag is not one of `Admin`, `Supervisor`, `Manager`, `SalesAgent`, `Agent`.
    #[error("invalid role: {0} (expected Admin, Supervisor, Manager, SalesAgent or Agent)")]
    Unknown(String),
}

/// Role of a CRM user.
///
/// Wire and storage values are the variant names (`"SalesAgent"`, ...).
/// Tags outside the known set deserialize to [`Role::Unrecognized`]; every
/// consumer treats that variant with a safe default instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full access, including the admin console.
    Admin,
    /// Leads a team of agents.
    Supervisor,
    /// Runs reporting and user registration.
    Manager,
    /// Field sales agent.
    SalesAgent,
    /// Agent.
    Agent,
    /// A tag the client does not know about.
    #[serde(other)]
    Unrecognized,
}

impl Role {
    /// Every recognized role, in registration-form order.
    pub const KNOWN: [Self; 5] = [
        Self::Admin,
        Self::Supervisor,
        Self::Manager,
        Self::SalesAgent,
        Self::Agent,
    ];

    /// Interpret a raw role tag, mapping anything unknown to `Unrecognized`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or(Self::Unrecognized)
    }

    /// The wire value of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Supervisor => "Supervisor",
            Self::Manager => "Manager",
            Self::SalesAgent => "SalesAgent",
            Self::Agent => "Agent",
            Self::Unrecognized => "Unrecognized",
        }
    }

    /// Roles this role may assign when registering a new user.
    ///
    /// Roles are never self-assigned: only these registrations can create them.
    #[must_use]
    pub const fn assignable_roles(self) -> &'static [Self] {
        match self {
            Self::Admin => &Self::KNOWN,
            Self::Manager => &[Self::Supervisor, Self::SalesAgent, Self::Agent],
            Self::Supervisor => &[Self::SalesAgent, Self::Agent],
            Self::SalesAgent | Self::Agent | Self::Unrecognized => &[],
        }
    }

    /// Whether accounts with this role report to a supervisor.
    #[must_use]
    pub const fn requires_supervisor(self) -> bool {
        matches!(self, Self::SalesAgent | Self::Agent)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "Supervisor" => Ok(Self::Supervisor),
            "Manager" => Ok(Self::Manager),
            "SalesAgent" => Ok(Self::SalesAgent),
            "Agent" => Ok(Self::Agent),
            _ => Err(RoleError::Unknown(s.to_owned())),
        }
    }
}
