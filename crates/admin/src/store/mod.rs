//! Document store ports.
//!
//! The reconciliation engine talks to the hosted document database and blob
//! storage only through the two traits in this module. Collections are named
//! by slash-separated paths; a sub-collection lives under its parent
//! document (`campuses/{id}/dorms`).
//!
//! # Backends
//!
//! - [`MemoryStore`] / [`MemoryBlobStore`] - in-process, used by tests and dry runs
//! - [`PgDocumentStore`] - `PostgreSQL` `JSONB` documents table
//! - [`LocalBlobStore`] - blobs written below a local directory

pub mod blob;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use blob::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryStore};
pub use postgres::PgDocumentStore;

/// Top-level fields of a stored document.
pub type Fields = Map<String, Value>;

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document key within its collection.
    pub id: String,
    /// Stored fields.
    pub fields: Fields,
}

/// A single query predicate on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value exactly.
    Eq(String, Value),
    /// Field is an array containing the value.
    ArrayContains(String, Value),
}

impl Filter {
    /// Equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// Array-contains predicate.
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains(field.into(), value.into())
    }

    /// Whether a document's fields satisfy this predicate.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::Eq(field, value) => fields.get(field) == Some(value),
            Self::ArrayContains(field, value) => fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob storage failed.
    #[error("blob storage error: {0}")]
    Blob(String),
}

/// Hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by key. `Ok(None)` means the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// List documents matching every filter. An empty filter list returns the
    /// whole collection. Results are ordered by document key.
    async fn list(&self, collection: &str, filters: &[Filter])
    -> Result<Vec<Document>, StoreError>;

    /// Write a document and return its key.
    ///
    /// A `None` id generates a fresh key. With `merge`, the given top-level
    /// fields overwrite those already stored and all others are kept; without
    /// it the document is replaced.
    async fn upsert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Fields,
        merge: bool,
    ) -> Result<String, StoreError>;

    /// Delete a document. Deleting a missing document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Blob storage for uploaded images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `path` and return a url that serves them.
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Path of a sub-collection under a parent document.
#[must_use]
pub fn child_collection(parent: &str, parent_id: &str, child: &str) -> String {
    format!("{parent}/{parent_id}/{child}")
}

/// Generate a fresh document key.
#[must_use]
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
