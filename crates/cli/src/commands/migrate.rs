//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ch-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CAMPUS_DATABASE_URL` - `PostgreSQL` connection string for the document table
//!
//! # Migration Files
//!
//! `crates/admin/migrations/`

use thiserror::Error;

use campus_hub_admin::config::AdminConfig;
use campus_hub_admin::store::postgres;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the document-store migrations.
///
/// # Errors
///
/// Returns an error if no database is configured or a migration fails.
pub async fn run(config: &AdminConfig) -> Result<(), MigrationError> {
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(MigrationError::MissingEnvVar("CAMPUS_DATABASE_URL"))?;

    tracing::info!("Connecting to campus database...");
    let pool = postgres::create_pool(database_url).await?;

    tracing::info!("Running document-store migrations...");
    postgres::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
