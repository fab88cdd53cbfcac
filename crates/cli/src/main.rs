//! Itemdeck CLI - sign in and browse the catalog from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the session is persisted to ITEMDECK_STORAGE_PATH)
//! itemdeck login -e test@example.com -p password123
//!
//! # Browse
//! itemdeck items list
//! itemdeck items show 3 --json
//!
//! # Inspect or end the session
//! itemdeck session
//! itemdeck logout
//! ```
//!
//! Every command restores the persisted session first. `items` commands
//! require a signed-in session.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itemdeck_client::config::ClientConfig;
use itemdeck_client::state::AppState;
use itemdeck_core::ItemId;

use commands::CliError;

mod commands;

#[derive(Parser)]
#[command(name = "itemdeck")]
#[command(author, version, about = "Itemdeck command-line client")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Log out and forget the persisted session
    Logout,
    /// Show the current session
    Session,
    /// Browse the catalog
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List the item feed
    List,
    /// Show one item
    Show {
        /// Item id
        id: ItemId,
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

/// Map tracing levels to Sentry events or breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "itemdeck_client=info,itemdeck_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let state = AppState::new(config)?;
    commands::restore(&state).await;

    match cli.command {
        Commands::Login { email, password } => {
            commands::session::login(&state, &email, password).await?;
        }
        Commands::Logout => commands::session::logout(&state).await?,
        Commands::Session => commands::session::show(&state, cli.json)?,
        Commands::Items { action } => match action {
            ItemsAction::List => commands::items::list(&state, cli.json).await?,
            ItemsAction::Show { id } => commands::items::show(&state, id, cli.json).await?,
        },
    }
    Ok(())
}
