//! Shared handles to the store backends.

use std::sync::Arc;

use tracing::info;

use crate::config::{AdminConfig, Collections};
use crate::db::DualPathResolver;
use crate::services::ReconciliationEngine;
use crate::store::{
    BlobStore, DocumentStore, LocalBlobStore, MemoryBlobStore, MemoryStore, PgDocumentStore,
    StoreError, postgres,
};

/// Store backends and collection names, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    collections: Collections,
}

impl AppState {
    /// Wrap already constructed backends.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        collections: Collections,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                blobs,
                collections,
            }),
        }
    }

    /// In-memory backends with default collection names.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Collections::default(),
        )
    }

    /// Build backends from configuration.
    ///
    /// Uses the `PostgreSQL` document table when a database url is set and the
    /// in-memory store otherwise. Blobs go below the configured directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database pool cannot be created.
    pub async fn from_config(config: &AdminConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                let pool = postgres::create_pool(url).await?;
                info!("Using PostgreSQL document store");
                Arc::new(PgDocumentStore::new(pool))
            }
            None => {
                info!("CAMPUS_DATABASE_URL not set; using in-memory document store");
                Arc::new(MemoryStore::new())
            }
        };
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.blob_dir.clone()));
        Ok(Self::new(store, blobs, config.collections.clone()))
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    #[must_use]
    pub fn collections(&self) -> &Collections {
        &self.inner.collections
    }

    /// Reconciliation engine over these backends.
    #[must_use]
    pub fn engine(&self) -> ReconciliationEngine<'_> {
        ReconciliationEngine::new(self.store(), self.blobs(), self.collections())
    }

    /// Dual-path campus reads over these backends.
    #[must_use]
    pub fn resolver(&self) -> DualPathResolver<'_> {
        DualPathResolver::new(self.store(), self.collections())
    }
}
