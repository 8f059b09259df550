//! CLI subcommands.

pub mod migrate;
pub mod reconcile;
pub mod show;

use std::path::PathBuf;

use thiserror::Error;

use campus_hub_admin::{ReconcileError, SessionError};
use campus_hub_admin::store::StoreError;
use campus_hub_core::EmailError;

/// Errors shared by the `show` and `reconcile` commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Backend construction failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Loading the campus failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The edit session rejected the request.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The desired-state file is malformed.
    #[error("Invalid desired-state file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Output could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `--actor-email` is not a valid address.
    #[error("Invalid actor email: {0}")]
    ActorEmail(#[from] EmailError),

    /// Removals are queued and `--confirm-deletions` was not given.
    #[error("{prompt} {queued} club(s) queued; rerun with --confirm-deletions")]
    ConfirmationRequired {
        /// Number of queued removals.
        queued: usize,
        /// Prompt of the stage the save is held at.
        prompt: &'static str,
    },
}
