//! Role-derived sidebar navigation.
//!
//! [`build`] is a pure function from a role and the presentation layer's
//! navigation state to the ordered list of sidebar items. Each role maps to
//! a fixed menu; roles without a menu (including `Admin`, whose console has
//! its own layout) get an empty list.
//!
//! ```text
//! SalesAgent | Agent  Dashboard, Leads, Prospect[Add, View]
//! Supervisor          Dashboard, RegisterAgents, Prospect[Add, View],
//!                     AssignLeads, SiteVisits, Sales
//! Manager             Home, RegisterUser, AddProspect, AssignLeads,
//!                     ProspectReport, SalesReport, ClientVisits, Attendance
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crm_core::Role;

use crate::routes::paths;

/// Icon identifier; rendering is up to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Dashboard,
    Leads,
    Prospect,
    AddProspect,
    ViewProspect,
    RegisterAgents,
    AssignLeads,
    SiteVisits,
    Sales,
    Home,
    RegisterUser,
    ProspectReport,
    SalesReport,
    ClientVisits,
    Attendance,
}

/// Ephemeral navigation state owned by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Path identifier of the screen currently shown.
    pub active_path: String,
    /// Whether the sidebar is expanded.
    pub sidebar_open: bool,
    /// Submenu expansion by item key. Missing keys are closed.
    pub submenu_open: HashMap<String, bool>,
}

impl NavigationState {
    /// State with `active_path` selected, sidebar open and every submenu closed.
    #[must_use]
    pub fn at(active_path: impl Into<String>) -> Self {
        Self {
            active_path: active_path.into(),
            sidebar_open: true,
            submenu_open: HashMap::new(),
        }
    }

    /// Select a different screen. Submenu expansion is left as is.
    pub fn navigate(&mut self, path: impl Into<String>) {
        self.active_path = path.into();
    }

    /// Flip one submenu open/closed.
    pub fn toggle_submenu(&mut self, key: &str) {
        let open = self.submenu_open.entry(key.to_owned()).or_insert(false);
        *open = !*open;
    }

    /// Flip the sidebar open/closed.
    pub const fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    /// Whether the submenu under `key` is expanded.
    #[must_use]
    pub fn is_submenu_open(&self, key: &str) -> bool {
        self.submenu_open.get(key).copied().unwrap_or(false)
    }
}

/// One sidebar entry, built fresh for every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub key: &'static str,
    pub label: &'static str,
    pub target_path: &'static str,
    pub icon: Icon,
    pub children: Option<Vec<NavigationItem>>,
    /// Whether the item is highlighted for the current path.
    pub active: bool,
    /// Whether the item's submenu is expanded. Always `false` without children.
    pub submenu_open: bool,
}

impl NavigationItem {
    /// Find an item (at any depth) by key.
    #[must_use]
    pub fn find<'a>(items: &'a [Self], key: &str) -> Option<&'a Self> {
        items.iter().find_map(|item| {
            if item.key == key {
                Some(item)
            } else {
                item.children
                    .as_deref()
                    .and_then(|children| Self::find(children, key))
            }
        })
    }
}

/// Static menu definition.
struct Entry {
    key: &'static str,
    label: &'static str,
    target_path: &'static str,
    icon: Icon,
    // Extra paths that keep the item highlighted (a parent while a child is open)
    also_active_on: &'static [&'static str],
    children: &'static [Entry],
}

impl Entry {
    const fn leaf(key: &'static str, label: &'static str, target_path: &'static str, icon: Icon) -> Self {
        Self {
            key,
            label,
            target_path,
            icon,
            also_active_on: &[],
            children: &[],
        }
    }

    fn is_active(&self, active_path: &str) -> bool {
        self.target_path == active_path || self.also_active_on.contains(&active_path)
    }

    fn build(&self, state: &NavigationState) -> NavigationItem {
        let children: Option<Vec<NavigationItem>> = (!self.children.is_empty())
            .then(|| self.children.iter().map(|child| child.build(state)).collect());
        let submenu_open = children.is_some() && state.is_submenu_open(self.key);

        NavigationItem {
            key: self.key,
            label: self.label,
            target_path: self.target_path,
            icon: self.icon,
            children,
            active: self.is_active(&state.active_path),
            submenu_open,
        }
    }
}

const DASHBOARD: Entry = Entry::leaf("dashboard", "Dashboard", paths::DASHBOARD, Icon::Dashboard);
const LEADS: Entry = Entry::leaf("leads", "Leads", paths::LEADS, Icon::Leads);
const ADD_PROSPECT: Entry =
    Entry::leaf("add-prospect", "Add Prospect", paths::ADD_PROSPECT, Icon::AddProspect);
const VIEW_PROSPECT: Entry =
    Entry::leaf("view-prospect", "View Prospect", paths::VIEW_PROSPECT, Icon::ViewProspect);
const PROSPECT: Entry = Entry {
    key: "prospect",
    label: "Prospect",
    target_path: paths::PROSPECT,
    icon: Icon::Prospect,
    also_active_on: &[paths::ADD_PROSPECT, paths::VIEW_PROSPECT],
    children: &[ADD_PROSPECT, VIEW_PROSPECT],
};
const REGISTER_AGENTS: Entry = Entry::leaf(
    "register-agents",
    "Register Agents",
    paths::REGISTER_AGENTS,
    Icon::RegisterAgents,
);
const ASSIGN_LEADS: Entry =
    Entry::leaf("assign-leads", "Assign Leads", paths::ASSIGN_LEADS, Icon::AssignLeads);
const SITE_VISITS: Entry =
    Entry::leaf("site-visits", "Site Visits", paths::SITE_VISITS, Icon::SiteVisits);
const SALES: Entry = Entry::leaf("sales", "Sales", paths::SALES, Icon::Sales);
const HOME: Entry = Entry::leaf("home", "Home", paths::HOME, Icon::Home);
const REGISTER_USER: Entry =
    Entry::leaf("register-user", "Register User", paths::REGISTER_USER, Icon::RegisterUser);
const PROSPECT_REPORT: Entry = Entry::leaf(
    "prospect-report",
    "Prospect Report",
    paths::PROSPECT_REPORT,
    Icon::ProspectReport,
);
const SALES_REPORT: Entry =
    Entry::leaf("sales-report", "Sales Report", paths::SALES_REPORT, Icon::SalesReport);
const CLIENT_VISITS: Entry =
    Entry::leaf("client-visits", "Client Visits", paths::CLIENT_VISITS, Icon::ClientVisits);
const ATTENDANCE: Entry =
    Entry::leaf("attendance", "Attendance", paths::ATTENDANCE, Icon::Attendance);

const AGENT_MENU: &[Entry] = &[DASHBOARD, LEADS, PROSPECT];
const SUPERVISOR_MENU: &[Entry] = &[
    DASHBOARD,
    REGISTER_AGENTS,
    PROSPECT,
    ASSIGN_LEADS,
    SITE_VISITS,
    SALES,
];
const MANAGER_MENU: &[Entry] = &[
    HOME,
    REGISTER_USER,
    ADD_PROSPECT,
    ASSIGN_LEADS,
    PROSPECT_REPORT,
    SALES_REPORT,
    CLIENT_VISITS,
    ATTENDANCE,
];

const fn menu_for(role: Role) -> &'static [Entry] {
    match role {
        Role::SalesAgent | Role::Agent => AGENT_MENU,
        Role::Supervisor => SUPERVISOR_MENU,
        Role::Manager => MANAGER_MENU,
        Role::Admin | Role::Unrecognized => &[],
    }
}

/// Build the sidebar for `role` in `state`.
#[must_use]
pub fn build(role: Role, state: &NavigationState) -> Vec<NavigationItem> {
    menu_for(role).iter().map(|entry| entry.build(state)).collect()
}

/// Build the sidebar for a raw role tag; unknown tags get an empty sidebar.
#[must_use]
pub fn build_for_tag(tag: &str, state: &NavigationState) -> Vec<NavigationItem> {
    build(Role::from_tag(tag), state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn keys(items: &[NavigationItem]) -> Vec<&'static str> {
        items.iter().map(|i| i.key).collect()
    }

    #[test]
    fn test_agent_menus() {
        let state = NavigationState::at("Dashboard");
        for role in [Role::SalesAgent, Role::Agent] {
            let items = build(role, &state);
            assert_eq!(keys(&items), ["dashboard", "leads", "prospect"]);
            let children = items[2].children.as_deref().unwrap();
            assert_eq!(keys(children), ["add-prospect", "view-prospect"]);
        }
    }

    #[test]
    fn test_supervisor_menu() {
        let items = build(Role::Supervisor, &NavigationState::default());
        assert_eq!(
            keys(&items),
            [
                "dashboard",
                "register-agents",
                "prospect",
                "assign-leads",
                "site-visits",
                "sales"
            ]
        );
        assert!(items[2].children.is_some());
    }

    #[test]
    fn test_manager_menu_is_flat() {
        let items = build(Role::Manager, &NavigationState::default());
        assert_eq!(
            keys(&items),
            [
                "home",
                "register-user",
                "add-prospect",
                "assign-leads",
                "prospect-report",
                "sales-report",
                "client-visits",
                "attendance"
            ]
        );
        assert!(items.iter().all(|i| i.children.is_none()));
    }

    #[test]
    fn test_roles_without_menu_are_empty() {
        let state = NavigationState::default();
        assert!(build(Role::Admin, &state).is_empty());
        assert!(build(Role::Unrecognized, &state).is_empty());
        assert!(build_for_tag("Intern", &state).is_empty());
        assert_eq!(build_for_tag("Manager", &state).len(), 8);
    }

    #[test]
    fn test_prospect_parent_active_for_child_paths() {
        for path in ["Prospect", "Add", "View"] {
            let items = build(Role::SalesAgent, &NavigationState::at(path));
            let prospect = NavigationItem::find(&items, "prospect").unwrap();
            assert!(prospect.active, "prospect should be active on {path}");
        }

        let items = build(Role::SalesAgent, &NavigationState::at("Leads"));
        assert!(!NavigationItem::find(&items, "prospect").unwrap().active);
        assert!(NavigationItem::find(&items, "leads").unwrap().active);
    }

    #[test]
    fn test_child_active_only_on_own_path() {
        let items = build(Role::Agent, &NavigationState::at("View"));
        assert!(NavigationItem::find(&items, "view-prospect").unwrap().active);
        assert!(!NavigationItem::find(&items, "add-prospect").unwrap().active);
        assert!(!NavigationItem::find(&items, "dashboard").unwrap().active);
    }

    #[test]
    fn test_exactly_one_top_level_item_active_for_manager() {
        let items = build(Role::Manager, &NavigationState::at("SalesReport"));
        let active: Vec<_> = items.iter().filter(|i| i.active).map(|i| i.key).collect();
        assert_eq!(active, ["sales-report"]);
    }

    #[test]
    fn test_submenu_visibility_independent_of_active() {
        let mut state = NavigationState::at("View");
        let items = build(Role::Supervisor, &state);
        let prospect = NavigationItem::find(&items, "prospect").unwrap();
        assert!(prospect.active);
        assert!(!prospect.submenu_open);

        state.navigate("Sales");
        state.toggle_submenu("prospect");
        let items = build(Role::Supervisor, &state);
        let prospect = NavigationItem::find(&items, "prospect").unwrap();
        assert!(!prospect.active);
        assert!(prospect.submenu_open);

        state.toggle_submenu("prospect");
        assert!(!state.is_submenu_open("prospect"));
    }

    #[test]
    fn test_leaf_items_never_report_open_submenu() {
        let mut state = NavigationState::at("Leads");
        state.toggle_submenu("leads");
        let items = build(Role::Agent, &state);
        assert!(!NavigationItem::find(&items, "leads").unwrap().submenu_open);
    }

    #[test]
    fn test_toggle_sidebar() {
        let mut state = NavigationState::at("Home");
        assert!(state.sidebar_open);
        state.toggle_sidebar();
        assert!(!state.sidebar_open);
    }
}
