//! In-process store backends.
//!
//! Used by the test suites and by `ch-cli` when no database url is
//! configured. Every collection is an ordered map so listings and snapshots
//! are deterministic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobStore, Document, DocumentStore, Fields, Filter, StoreError, generate_key};

/// Ordered copy of every collection, keyed by collection path then document key.
pub type StoreSnapshot = BTreeMap<String, BTreeMap<String, Fields>>;

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<StoreSnapshot>,
    operations: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the full store contents.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.collections.read().await.clone()
    }

    /// Number of `get`/`list`/`upsert`/`delete` calls served so far.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.record();
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_owned(),
                fields: fields.clone(),
            }))
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        self.record();
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Fields,
        merge: bool,
    ) -> Result<String, StoreError> {
        self.record();
        let key = id.map_or_else(generate_key, str::to_owned);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_owned()).or_default();
        match docs.get_mut(&key) {
            Some(existing) if merge => existing.extend(fields),
            _ => {
                docs.insert(key.clone(), fields);
            }
        }
        Ok(key)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.record();
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
            if docs.is_empty() {
                collections.remove(collection);
            }
        }
        Ok(())
    }
}

/// In-memory [`BlobStore`]. Urls use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `path`, if any.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StoreError> {
        self.blobs
            .write()
            .await
            .insert(path.to_owned(), bytes.to_vec());
        Ok(format!("memory://{path}"))
    }
}
