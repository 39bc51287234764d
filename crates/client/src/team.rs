//! Team management.
//!
//! Shapes directory records for the team screen (search, role filter,
//! pagination) and validates the registration form before it reaches the
//! directory.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crm_core::{Email, EmailError, Role};

use crate::api::{ApiClient, ApiError, CreatedUser, NewUser, UserRecord};

/// Default page size of the team table.
pub const DEFAULT_PER_PAGE: usize = 10;

/// Largest accepted page size.
pub const MAX_PER_PAGE: usize = 100;

/// Shown when a member has no supervisor.
const NO_SUPERVISOR: &str = "-";

/// Errors raised by team management.
#[derive(Debug, Error)]
pub enum TeamError {
    /// A required form field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The email field is not a valid address.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The registering role may not assign this role.
    #[error("{registrar} cannot register a {role}")]
    RoleNotAssignable {
        /// Role of the user filling in the form.
        registrar: Role,
        /// Role requested for the new user.
        role: Role,
    },

    /// Agents and sales agents must report to someone.
    #[error("a supervisor is required for {0}")]
    SupervisorRequired(Role),

    /// The directory call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// Listing
// =============================================================================

/// A directory user as shown in the team table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub role: Role,
    /// Supervisor name, or `"-"` when none.
    pub supervisor: String,
}

impl From<UserRecord> for TeamMember {
    fn from(record: UserRecord) -> Self {
        let role = record.role();
        Self {
            user_id: record.user_id,
            name: record.name,
            email: record.email,
            phone_number: record.phone_number,
            gender: record.gender,
            role,
            supervisor: record
                .supervisor
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NO_SUPERVISOR.to_owned()),
        }
    }
}

/// Filter and page selection for the team table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TeamQuery {
    /// Case-insensitive substring over name, email and phone number.
    pub search: Option<String>,
    /// Only members with this role.
    pub role: Option<Role>,
    /// Page number (1-indexed).
    pub page: usize,
    /// Rows per page, clamped to `1..=100`.
    pub per_page: usize,
}

impl Default for TeamQuery {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl TeamQuery {
    /// Whether `member` passes the search and role filters.
    #[must_use]
    pub fn matches(&self, member: &TeamMember) -> bool {
        if self.role.is_some_and(|role| role != member.role) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&member.name, &member.email, &member.phone_number]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }

    /// Filter `members` and cut out the requested page.
    ///
    /// Order is preserved. A page past the end is empty but still reports
    /// the filtered total.
    #[must_use]
    pub fn apply(&self, members: &[TeamMember]) -> TeamPage {
        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        let page = self.page.max(1);

        let filtered: Vec<&TeamMember> = members.iter().filter(|m| self.matches(m)).collect();
        let total = filtered.len();
        let total_pages = total.div_ceil(per_page);

        let offset = (page - 1).saturating_mul(per_page);
        let members = filtered
            .into_iter()
            .skip(offset)
            .take(per_page)
            .cloned()
            .collect();

        TeamPage {
            members,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// One page of the team table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPage {
    pub members: Vec<TeamMember>,
    /// Members matching the filters across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Names of members who can be picked as a supervisor, in directory order.
#[must_use]
pub fn supervisor_names(members: &[TeamMember]) -> Vec<&str> {
    members
        .iter()
        .filter(|m| m.role == Role::Supervisor)
        .map(|m| m.name.as_str())
        .collect()
}

// =============================================================================
// Registration
// =============================================================================

/// Raw registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserForm {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub role: Option<Role>,
    pub supervisor: Option<String>,
}

impl NewUserForm {
    /// Check the form on behalf of a user with role `registrar`.
    ///
    /// # Errors
    ///
    /// - `MissingField` for a blank name, phone number, gender or role
    /// - `InvalidEmail` if the email does not parse
    /// - `RoleNotAssignable` if `registrar` may not hand out the role
    /// - `SupervisorRequired` for an agent without a supervisor
    pub fn validate(&self, registrar: Role) -> Result<NewUser, TeamError> {
        let name = required("name", &self.name)?;
        let email = Email::parse(&self.email)?;
        let phone_number = required("phone number", &self.phone_number)?;
        let gender = required("gender", &self.gender)?;
        let role = self.role.ok_or(TeamError::MissingField("role"))?;

        if !registrar.assignable_roles().contains(&role) {
            return Err(TeamError::RoleNotAssignable { registrar, role });
        }

        let supervisor = self
            .supervisor
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        if role.requires_supervisor() && supervisor.is_none() {
            return Err(TeamError::SupervisorRequired(role));
        }

        Ok(NewUser {
            name,
            email,
            phone_number,
            gender,
            role,
            supervisor,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, TeamError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TeamError::MissingField(field));
    }
    Ok(value.to_owned())
}

// =============================================================================
// Service
// =============================================================================

/// Team operations against the remote directory.
#[derive(Debug, Clone, Copy)]
pub struct TeamService<'a> {
    api: &'a ApiClient,
}

impl<'a> TeamService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Every directory user as a team member.
    ///
    /// # Errors
    ///
    /// Returns `TeamError::Api` if the directory call fails.
    pub async fn members(&self) -> Result<Vec<TeamMember>, TeamError> {
        let records = self.api.list_users().await?;
        Ok(records.into_iter().map(TeamMember::from).collect())
    }

    /// Fetch the directory and apply `query`.
    ///
    /// # Errors
    ///
    /// Returns `TeamError::Api` if the directory call fails.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &TeamQuery) -> Result<TeamPage, TeamError> {
        let members = self.members().await?;
        Ok(query.apply(&members))
    }

    /// Validate `form` for `registrar` and register the user.
    ///
    /// Nothing is sent when validation fails.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`NewUserForm::validate`], or
    /// `TeamError::Api` (e.g. `Rejected` for a duplicate email).
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(
        &self,
        registrar: Role,
        form: &NewUserForm,
    ) -> Result<CreatedUser, TeamError> {
        let user = form.validate(registrar)?;
        Ok(self.api.create_user(&user).await?)
    }
}
