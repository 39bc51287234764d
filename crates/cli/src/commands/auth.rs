//! Session commands: login, logout, whoami, verify.

use crm_client::{
    AuthGuard, CrmError, DemoDirectory, Directory, DirectoryKind, GuardDecision, LoginFlow,
    LoginSuccess, RemoteDirectory,
};
use secrecy::SecretString;

use super::Context;

/// Log in with an email/password pair against the configured directory.
pub async fn login(ctx: &Context<'_>, email: &str, password: String) -> Result<(), CrmError> {
    let password = SecretString::from(password);

    let success = match ctx.config.directory {
        DirectoryKind::Demo => {
            submit(LoginFlow::new(DemoDirectory::builtin(), &ctx.sessions), email, &password)
                .await?
        }
        DirectoryKind::Remote => {
            let directory = RemoteDirectory::new(ctx.api.clone());
            submit(LoginFlow::new(directory, &ctx.sessions), email, &password).await?
        }
    };

    report(&success);
    Ok(())
}

async fn submit<D: Directory>(
    flow: LoginFlow<'_, D>,
    email: &str,
    password: &SecretString,
) -> Result<LoginSuccess, CrmError> {
    Ok(flow.submit(email, password).await?)
}

/// Log in as the demo identity.
pub async fn social_login(ctx: &Context<'_>) -> Result<(), CrmError> {
    let flow = LoginFlow::new(DemoDirectory::builtin(), &ctx.sessions);
    let success = flow.social_login().await?;
    report(&success);
    Ok(())
}

fn report(success: &LoginSuccess) {
    let identity = &success.session.identity;
    tracing::info!(
        "Logged in as {} <{}> ({}), continue at {}",
        identity.name,
        identity.email,
        identity.role,
        success.destination
    );
}

/// Forget the stored session.
pub async fn logout(ctx: &Context<'_>) -> Result<(), CrmError> {
    ctx.sessions.load().await;
    ctx.sessions.logout().await?;
    tracing::info!("Logged out");
    Ok(())
}

/// Show the stored session without contacting the authority.
pub async fn whoami(ctx: &Context<'_>) -> Result<(), CrmError> {
    let session = ctx.require_session().await?;
    let identity = &session.identity;

    tracing::info!("Name:       {}", identity.name);
    tracing::info!("Email:      {}", identity.email);
    tracing::info!("Role:       {}", identity.role);
    tracing::info!("User ID:    {}", identity.user_id);
    tracing::info!(
        "Supervisor: {}",
        identity.supervisor.as_deref().unwrap_or("-")
    );
    tracing::info!("Since:      {}", session.established_at.to_rfc3339());
    Ok(())
}

/// Run the guard for `path` and report its decision.
pub async fn verify(ctx: &Context<'_>, path: &str) -> Result<(), CrmError> {
    let guard = AuthGuard::new(ctx.api.clone(), &ctx.sessions)
        .with_timeout(ctx.config.api.verify_timeout);

    match guard.activate(path).await {
        GuardDecision::Render { path } => {
            tracing::info!("Session valid, {path} may render");
            Ok(())
        }
        GuardDecision::Redirect { to, .. } => {
            tracing::info!("Session not valid, redirect to {to}");
            Err(CrmError::Unauthenticated)
        }
        GuardDecision::Loading => Err(CrmError::Unauthenticated),
    }
}
