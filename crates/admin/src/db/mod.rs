//! Repositories over the document store.
//!
//! # Collections
//!
//! - `campuses/{id}` - Current campus records
//! - `campuses/{id}/dorms/{dormId}` - Current dorm rows
//! - `universities/{id}` - Legacy campus records (read-only)
//! - `universities/{id}/dorms/{dormId}` - Legacy dorm rows (purged on save)
//! - `clubs/{id}` - Club records
//! - `clubs/{id}/members/{accountId}` - Club memberships
//! - `users/{id}` - Platform accounts (read-only here)
//!
//! Actual names come from [`Collections`](crate::config::Collections).

pub mod accounts;
pub mod campuses;
pub mod clubs;
pub mod dorms;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::store::{Document, Fields, StoreError};

pub use accounts::AccountRepository;
pub use campuses::{CampusSource, CurrentShape, DualPathResolver, LegacyShape};
pub use clubs::ClubRepository;
pub use dorms::DormRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Store or blob backend error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Data in the store is corrupted or has an unexpected shape.
    #[error("data corruption in {collection}/{id}: {message}")]
    DataCorruption {
        /// Collection path.
        collection: String,
        /// Document key.
        id: String,
        /// What failed to decode.
        message: String,
    },

    /// Every storage shape failed to answer the read.
    #[error("resolution failed for {entity}: {message}")]
    ResolutionFailed {
        /// What was being resolved.
        entity: String,
        /// Underlying error of the first failing shape.
        message: String,
    },
}

/// Decode a stored document into a row type.
pub(crate) fn decode<T: DeserializeOwned>(
    collection: &str,
    doc: Document,
) -> Result<(String, T), RepositoryError> {
    let Document { id, fields } = doc;
    match serde_json::from_value(Value::Object(fields)) {
        Ok(row) => Ok((id, row)),
        Err(e) => Err(RepositoryError::DataCorruption {
            collection: collection.to_owned(),
            id,
            message: e.to_string(),
        }),
    }
}

/// Encode a row type into top-level document fields.
pub(crate) fn encode<T: Serialize>(row: &T) -> Result<Fields, RepositoryError> {
    match serde_json::to_value(row).map_err(StoreError::from)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Unavailable(format!(
            "row did not encode to an object: {other}"
        ))
        .into()),
    }
}
