//! Team management commands.
//!
//! Both commands confirm the stored session with the authority first; the
//! role used for registration comes from that confirmed session.

use std::io::Write;

use crm_client::api::CreatedUser;
use crm_client::routes::paths;
use crm_client::team::supervisor_names;
use crm_client::{CrmError, NewUserForm, TeamError, TeamQuery, TeamService};
use secrecy::ExposeSecret;

use super::{Context, parse_role};

/// List team members matching the filters.
pub async fn list(
    ctx: &Context<'_>,
    search: Option<String>,
    role: Option<&str>,
    page: usize,
    per_page: usize,
) -> Result<(), CrmError> {
    let query = TeamQuery {
        search,
        role: role.map(parse_role).transpose()?,
        page,
        per_page,
    };

    ctx.verified_session(paths::REGISTER_USER).await?;
    let result = TeamService::new(&ctx.api).list(&query).await?;

    tracing::info!(
        "Page {} of {} ({} members)",
        result.page,
        result.total_pages.max(1),
        result.total
    );
    for member in &result.members {
        tracing::info!(
            "{:<24} {:<28} {:<14} {:<11} {}",
            member.name,
            member.email,
            member.phone_number,
            member.role.as_str(),
            member.supervisor
        );
    }
    Ok(())
}

/// Register a user on behalf of the logged-in identity.
pub async fn create(ctx: &Context<'_>, form: &NewUserForm) -> Result<(), CrmError> {
    let registrar = ctx.verified_session(paths::REGISTER_USER).await?.role();
    let team = TeamService::new(&ctx.api);

    let created = match team.register(registrar, form).await {
        Ok(created) => created,
        Err(TeamError::SupervisorRequired(role)) => {
            suggest_supervisors(&team).await;
            return Err(TeamError::SupervisorRequired(role).into());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Registered {} <{}> as {} (id {})",
        created.user.name,
        created.user.email,
        created.user.role,
        created.user.user_id
    );

    // Straight to the terminal: log output is forwarded to error tracking
    write_temporary_password(&mut std::io::stdout().lock(), &created)
        .map_err(|e| CrmError::Storage(format!("could not write to stdout: {e}")))
}

async fn suggest_supervisors(team: &TeamService<'_>) {
    match team.members().await {
        Ok(members) => {
            let names = supervisor_names(&members);
            if !names.is_empty() {
                tracing::info!("Available supervisors: {}", names.join(", "));
            }
        }
        Err(e) => tracing::debug!(error = %e, "Could not load supervisors"),
    }
}

fn write_temporary_password(out: &mut impl Write, created: &CreatedUser) -> std::io::Result<()> {
    writeln!(
        out,
        "Temporary password: {}",
        created.temporary_password.expose_secret()
    )?;
    writeln!(out, "The user must change it on first login.")
}
