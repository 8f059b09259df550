//! Campus Hub CLI - Migrations and campus reconciliation runs.
//!
//! # Usage
//!
//! ```bash
//! # Create the documents table
//! ch-cli migrate
//!
//! # Print a campus as resolved from either storage shape
//! ch-cli show <campus-id>
//!
//! # Apply a desired-state file as one admin save
//! ch-cli reconcile <campus-id> --file desired.yaml --actor <account-id>
//!
//! # Same, acknowledging every deletion prompt
//! ch-cli reconcile <campus-id> --file desired.yaml --actor <account-id> --confirm-deletions
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run document-store migrations
//! - `show` - Print the resolved campus, dorms and default clubs as JSON
//! - `reconcile` - Load an edit session, apply a YAML file, and save

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_hub_admin::config::AdminConfig;

mod commands;

#[derive(Parser)]
#[command(name = "ch-cli")]
#[command(author, version, about = "Campus Hub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run document-store migrations
    Migrate,
    /// Print a campus with its dorms and default clubs
    Show {
        /// Campus document key
        campus_id: String,
    },
    /// Apply a desired-state file as one admin save
    Reconcile {
        /// Campus document key
        campus_id: String,

        /// YAML file describing the desired campus, dorms and default clubs
        #[arg(short, long)]
        file: PathBuf,

        /// Account id of the acting admin (owner of newly created clubs)
        #[arg(short, long)]
        actor: String,

        /// Email of the acting admin, recorded on the owner membership of new clubs
        #[arg(long)]
        actor_email: Option<String>,

        /// Acknowledge every deletion prompt
        #[arg(long)]
        confirm_deletions: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
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
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_hub_admin=info,campus_hub_cli=info".into());

    // JSON for log shippers, text for terminals
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

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

    // Sentry must be initialized before the tracing subscriber
    let config = AdminConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AdminConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Show { campus_id } => commands::show::run(&config, &campus_id).await?,
        Commands::Reconcile {
            campus_id,
            file,
            actor,
            actor_email,
            confirm_deletions,
        } => {
            commands::reconcile::run(
                &config,
                commands::reconcile::ReconcileArgs {
                    campus_id,
                    file,
                    actor,
                    actor_email,
                    confirm_deletions,
                },
            )
            .await?;
        }
    }
    Ok(())
}
