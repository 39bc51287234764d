//! Route vocabulary shared with the presentation layer.
//!
//! ```text
//! /login       - Login entry point (guard redirects here)
//! /admin       - Admin console landing
//! /dashboard   - Landing for every other recognized role
//! /            - Safe default for anything else
//! ```
//!
//! Sidebar items address screens by short path identifiers (`"Leads"`,
//! `"Add"`, ...), listed in [`paths`].

use crm_core::Role;

/// Login entry point.
pub const LOGIN: &str = "/login";

/// Admin console landing route.
pub const ADMIN: &str = "/admin";

/// Landing route for non-admin roles.
pub const DASHBOARD: &str = "/dashboard";

/// Safe default route.
pub const HOME: &str = "/";

/// Sidebar screen identifiers.
pub mod paths {
    pub const DASHBOARD: &str = "Dashboard";
    pub const LEADS: &str = "Leads";
    pub const PROSPECT: &str = "Prospect";
    pub const ADD_PROSPECT: &str = "Add";
    pub const VIEW_PROSPECT: &str = "View";
    pub const REGISTER_AGENTS: &str = "RegisterAgents";
    pub const ASSIGN_LEADS: &str = "AssignLeads";
    pub const SITE_VISITS: &str = "SiteVisits";
    pub const SALES: &str = "Sales";
    pub const HOME: &str = "Home";
    pub const REGISTER_USER: &str = "RegisterUser";
    pub const PROSPECT_REPORT: &str = "ProspectReport";
    pub const SALES_REPORT: &str = "SalesReport";
    pub const CLIENT_VISITS: &str = "ClientVisits";
    pub const ATTENDANCE: &str = "Attendance";
}

/// Where a freshly logged-in user lands.
#[must_use]
pub const fn destination_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN,
        Role::Agent | Role::SalesAgent | Role::Manager | Role::Supervisor => DASHBOARD,
        Role::Unrecognized => HOME,
    }
}
