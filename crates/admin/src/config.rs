//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CAMPUS_DATABASE_URL` - `PostgreSQL` connection string for the document
//!   table. When unset the in-memory store is used.
//! - `CAMPUS_BLOB_DIR` - Directory for uploaded images (default: `./blobs`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Optional (collection names)
//! - `CAMPUS_COLLECTION` - Current campus records (default: `campuses`)
//! - `LEGACY_CAMPUS_COLLECTION` - Legacy university records (default: `universities`)
//! - `DORM_SUBCOLLECTION` - Dorm children of either shape (default: `dorms`)
//! - `CLUB_COLLECTION` - Club records (default: `clubs`)
//! - `MEMBER_SUBCOLLECTION` - Membership children of a club (default: `members`)
//! - `ACCOUNT_COLLECTION` - Platform accounts (default: `users`)

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_BLOB_DIR: &str = "./blobs";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Names of every collection the reconciliation engine touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    /// Current-shape campus records.
    pub campuses: String,
    /// Legacy-shape university records (read-only).
    pub legacy_campuses: String,
    /// Dorm sub-collection name under either campus shape.
    pub dorms: String,
    /// Club records.
    pub clubs: String,
    /// Membership sub-collection name under a club.
    pub members: String,
    /// Platform accounts, queried by email.
    pub accounts: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            campuses: "campuses".to_owned(),
            legacy_campuses: "universities".to_owned(),
            dorms: "dorms".to_owned(),
            clubs: "clubs".to_owned(),
            members: "members".to_owned(),
            accounts: "users".to_owned(),
        }
    }
}

impl Collections {
    /// Apply overrides; a blank override or one containing `/` is rejected.
    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            campuses: collection_var(vars, "CAMPUS_COLLECTION", defaults.campuses)?,
            legacy_campuses: collection_var(
                vars,
                "LEGACY_CAMPUS_COLLECTION",
                defaults.legacy_campuses,
            )?,
            dorms: collection_var(vars, "DORM_SUBCOLLECTION", defaults.dorms)?,
            clubs: collection_var(vars, "CLUB_COLLECTION", defaults.clubs)?,
            members: collection_var(vars, "MEMBER_SUBCOLLECTION", defaults.members)?,
            accounts: collection_var(vars, "ACCOUNT_COLLECTION", defaults.accounts)?,
        })
    }
}

fn collection_var(
    vars: &HashMap<String, String>,
    key: &str,
    default: String,
) -> Result<String, ConfigError> {
    let Some(value) = vars.get(key) else {
        return Ok(default);
    };
    let value = value.trim();
    if value.is_empty() || value.contains('/') {
        return Err(ConfigError::InvalidEnvVar(
            key.to_owned(),
            "collection names must be non-empty and must not contain '/'".to_owned(),
        ));
    }
    Ok(value.to_owned())
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` connection URL (contains password). `None` selects the in-memory store.
    pub database_url: Option<SecretString>,
    /// Directory uploaded images are written to.
    pub blob_dir: PathBuf,
    /// Collection names.
    pub collections: Collections,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = match vars.get("CAMPUS_DATABASE_URL") {
            Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                Some(SecretString::from(url.clone()))
            }
            Some(_) => {
                return Err(ConfigError::InvalidEnvVar(
                    "CAMPUS_DATABASE_URL".to_owned(),
                    "expected a postgres:// url".to_owned(),
                ));
            }
            None => None,
        };

        let blob_dir = vars
            .get("CAMPUS_BLOB_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_BLOB_DIR), PathBuf::from);

        Ok(Self {
            database_url,
            blob_dir,
            collections: Collections::from_vars(vars)?,
            sentry_dsn: vars.get("SENTRY_DSN").filter(|v| !v.is_empty()).cloned(),
            sentry_environment: vars.get("SENTRY_ENVIRONMENT").cloned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::from_vars(&HashMap::new()).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.blob_dir, PathBuf::from("./blobs"));
        assert_eq!(config.collections, Collections::default());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_collection_overrides() {
        let config = AdminConfig::from_vars(&vars(&[
            ("CAMPUS_COLLECTION", "campuses_v2"),
            ("ACCOUNT_COLLECTION", " accounts "),
        ]))
        .unwrap();
        assert_eq!(config.collections.campuses, "campuses_v2");
        assert_eq!(config.collections.accounts, "accounts");
        assert_eq!(config.collections.legacy_campuses, "universities");
    }

    #[test]
    fn test_rejects_nested_collection_name() {
        let err = AdminConfig::from_vars(&vars(&[("CLUB_COLLECTION", "a/b")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CLUB_COLLECTION"));
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let err =
            AdminConfig::from_vars(&vars(&[("CAMPUS_DATABASE_URL", "mysql://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }

    #[test]
    fn test_accepts_postgres_url() {
        let config = AdminConfig::from_vars(&vars(&[(
            "CAMPUS_DATABASE_URL",
            "postgres://campus:pw@localhost/campus",
        )]))
        .unwrap();
        assert!(config.database_url.is_some());
    }
}
