//! CRM CLI - Drive the CRM client core from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in against the configured directory
//! crm login -e demo@gmail.com -p 123456
//!
//! # Log in as the demo identity
//! crm social-login
//!
//! # Show the stored session, then check it with the remote authority
//! crm whoami
//! crm verify --path Dashboard
//!
//! # Render the sidebar for the stored role
//! crm nav --active Add --open prospect
//!
//! # Team management (remote directory)
//! crm team list --search jane --role Agent --page 2
//! crm team create -n "Jane Agent" -e jane@crm.test --phone 0712345678 --gender Female -r Agent -s "Sam Supervisor"
//!
//! crm logout
//! ```
//!
//! # Environment Variables
//!
//! See [`crm_client::ClientConfig::from_env`]. `CRM_LOG_JSON` switches log
//! output to JSON; `RUST_LOG` overrides the default filter.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use crm_client::{ClientConfig, CrmError};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "crm")]
#[command(author, version, about = "CRM client tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "CRM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in as the demo identity
    SocialLogin,
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Check the stored session with the remote authority
    Verify {
        /// Protected view being entered
        #[arg(long, default_value = "Dashboard")]
        path: String,
    },
    /// Show the sidebar for the stored role
    Nav {
        /// Currently active path
        #[arg(long, default_value = "Dashboard")]
        active: String,

        /// Submenu keys to show expanded
        #[arg(long)]
        open: Vec<String>,

        /// Role tag to render instead of the stored session's role
        #[arg(long)]
        role: Option<String>,
    },
    /// Manage team members in the remote directory
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },
}

#[derive(Subcommand)]
enum TeamAction {
    /// List team members
    List {
        /// Filter by name, email or phone (case-insensitive)
        #[arg(long)]
        search: Option<String>,

        /// Only show this role
        #[arg(short, long)]
        role: Option<String>,

        /// Page number (1-indexed)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page
        #[arg(long, default_value_t = crm_client::team::DEFAULT_PER_PAGE)]
        per_page: usize,
    },
    /// Register a new user
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Phone number
        #[arg(long)]
        phone: String,

        /// Gender
        #[arg(long)]
        gender: String,

        /// Role (`Admin`, `Manager`, `Supervisor`, `SalesAgent`, `Agent`)
        #[arg(short, long)]
        role: String,

        /// Supervisor name (required for agents)
        #[arg(short, long)]
        supervisor: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crm_client=info,crm_cli=info".into());

    let json = std::env::var("CRM_LOG_JSON").is_ok();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        if e.should_report() {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::debug!(error = %e, "Command failed");
        }
        tracing::error!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CrmError> {
    let ctx = commands::Context::new(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&ctx, &email, password).await?;
        }
        Commands::SocialLogin => commands::auth::social_login(&ctx).await?,
        Commands::Logout => commands::auth::logout(&ctx).await?,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Verify { path } => commands::auth::verify(&ctx, &path).await?,
        Commands::Nav { active, open, role } => {
            commands::nav::show(&ctx, &active, &open, role.as_deref()).await?;
        }
        Commands::Team { action } => match action {
            TeamAction::List {
                search,
                role,
                page,
                per_page,
            } => {
                commands::team::list(&ctx, search, role.as_deref(), page, per_page).await?;
            }
            TeamAction::Create {
                name,
                email,
                phone,
                gender,
                role,
                supervisor,
            } => {
                let form = crm_client::NewUserForm {
                    name,
                    email,
                    phone_number: phone,
                    gender,
                    role: Some(commands::parse_role(&role)?),
                    supervisor,
                };
                commands::team::create(&ctx, &form).await?;
            }
        },
    }
    Ok(())
}
