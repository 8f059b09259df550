//! Dorm rows under one campus, in one storage shape.

use serde::{Deserialize, Serialize};
use tracing::debug;

use campus_hub_core::{DormId, Email, LocationId};

use super::{RepositoryError, decode, encode};
use crate::models::{DORM_CATEGORY, Dorm};
use crate::store::DocumentStore;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Stored dorm fields. Legacy rows used `location` for the location key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DormRow {
    name: String,
    #[serde(default, alias = "location", skip_serializing_if = "Option::is_none")]
    location_id: Option<LocationId>,
    #[serde(default = "dorm_category")]
    category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_email: Option<Email>,
}

fn dorm_category() -> String {
    DORM_CATEGORY.to_owned()
}

impl DormRow {
    /// Fields of a dorm row as this crate writes them.
    #[must_use]
    pub fn new(
        name: &str,
        location_id: Option<&LocationId>,
        admin_email: Option<&Email>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            location_id: location_id.cloned(),
            category: dorm_category(),
            admin_email: admin_email.cloned(),
        }
    }

    fn into_dorm(self, id: String) -> Dorm {
        Dorm {
            id: DormId::new(id),
            name: self.name,
            location_id: self.location_id,
            category: self.category,
            admin_email: self.admin_email,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the dorm rows of a single campus.
pub struct DormRepository<'a> {
    store: &'a dyn DocumentStore,
    collection: String,
}

impl<'a> DormRepository<'a> {
    /// Create a repository over the dorm collection at `collection`.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore, collection: String) -> Self {
        Self { store, collection }
    }

    /// List every dorm row, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be decoded.
    pub async fn list(&self) -> Result<Vec<Dorm>, RepositoryError> {
        let docs = self.store.list(&self.collection, &[]).await?;
        docs.into_iter()
            .map(|doc| {
                let (id, row) = decode::<DormRow>(&self.collection, doc)?;
                Ok(row.into_dorm(id))
            })
            .collect()
    }

    /// Write a dorm row, replacing any stored fields. A `None` id creates a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn upsert(
        &self,
        id: Option<&DormId>,
        row: &DormRow,
    ) -> Result<DormId, RepositoryError> {
        let fields = encode(row)?;
        let key = self
            .store
            .upsert(&self.collection, id.map(DormId::as_str), fields, false)
            .await?;
        debug!(collection = %self.collection, dorm_id = %key, name = %row.name, "Wrote dorm row");
        Ok(DormId::new(key))
    }

    /// Delete one dorm row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &DormId) -> Result<(), RepositoryError> {
        self.store.delete(&self.collection, id.as_str()).await?;
        debug!(collection = %self.collection, dorm_id = %id, "Deleted dorm row");
        Ok(())
    }

    /// Delete every row in the collection and return how many were removed.
    ///
    /// Deleting an empty collection is a no-op. Rows are listed by key only,
    /// so undecodable rows are purged as well.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a read or delete fails.
    pub async fn purge(&self) -> Result<usize, RepositoryError> {
        let docs = self.store.list(&self.collection, &[]).await?;
        for doc in &docs {
            self.store.delete(&self.collection, &doc.id).await?;
        }
        Ok(docs.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_upsert_then_list() {
        let store = MemoryStore::new();
        let repo = DormRepository::new(&store, "campuses/c1/dorms".into());

        let id = repo
            .upsert(None, &DormRow::new("Pioneer Hall", None, None))
            .await
            .unwrap();
        let dorms = repo.list().await.unwrap();

        assert_eq!(dorms.len(), 1);
        assert_eq!(dorms[0].id, id);
        assert_eq!(dorms[0].name, "Pioneer Hall");
        assert_eq!(dorms[0].category, DORM_CATEGORY);
    }

    #[tokio::test]
    async fn test_legacy_location_alias_and_missing_category() {
        let store = MemoryStore::new();
        store
            .upsert(
                "universities/c1/dorms",
                Some("d1"),
                json!({"name": "Old Hall", "location": "north"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                false,
            )
            .await
            .unwrap();

        let repo = DormRepository::new(&store, "universities/c1/dorms".into());
        let dorms = repo.list().await.unwrap();

        assert_eq!(dorms[0].location_id, Some(LocationId::new("north")));
        assert_eq!(dorms[0].category, DORM_CATEGORY);
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let store = MemoryStore::new();
        let repo = DormRepository::new(&store, "universities/c1/dorms".into());
        repo.upsert(None, &DormRow::new("A", None, None)).await.unwrap();
        repo.upsert(None, &DormRow::new("B", None, None)).await.unwrap();

        assert_eq!(repo.purge().await.unwrap(), 2);
        assert_eq!(repo.purge().await.unwrap(), 0);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
