//! Sidebar rendering.

use crm_client::navigation::{self, NavigationItem, NavigationState};
use crm_client::CrmError;
use crm_core::Role;

use super::Context;

/// Log the sidebar for `role_tag`, or for the stored session's role.
pub async fn show(
    ctx: &Context<'_>,
    active: &str,
    open: &[String],
    role_tag: Option<&str>,
) -> Result<(), CrmError> {
    let role = match role_tag {
        Some(tag) => Role::from_tag(tag),
        None => ctx.require_session().await?.role(),
    };

    let mut state = NavigationState::at(active);
    for key in open {
        state.submenu_open.insert(key.clone(), true);
    }

    let items = navigation::build(role, &state);
    if items.is_empty() {
        tracing::info!("No navigation for role {role}");
        return Ok(());
    }

    tracing::info!("Navigation for {role}:");
    log_items(&items, 0);
    Ok(())
}

fn log_items(items: &[NavigationItem], depth: usize) {
    let indent = "  ".repeat(depth + 1);
    for item in items {
        let marker = if item.active { "*" } else { " " };
        tracing::info!("{indent}{marker} {} -> {}", item.label, item.target_path);
        if item.submenu_open
            && let Some(children) = &item.children
        {
            log_items(children, depth + 1);
        }
    }
}
