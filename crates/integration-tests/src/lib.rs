//! Integration tests for Campus Hub.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p campus-hub-integration-tests
//! ```
//!
//! Every test runs against the in-memory backends, so no database is needed.
//!
//! # Test Categories
//!
//! - `reconcile` - End-to-end saves through the edit session
//! - `legacy_shape` - Reading and migrating legacy campus records
//! - `deletion_gate` - Confirmation prompts before destructive saves
//! - `failures` - Validation, resolution and partial-write failures

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_hub_admin::config::Collections;
use campus_hub_admin::models::Actor;
use campus_hub_admin::services::ReconciliationEngine;
use campus_hub_admin::store::{
    Document, DocumentStore, Fields, Filter, MemoryBlobStore, MemoryStore, StoreError,
};
use campus_hub_core::AccountId;

/// Campus key used by the seeded fixtures.
pub const CAMPUS_ID: &str = "state";

/// Convert a JSON object literal into document fields.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

/// Acting admin for every save.
#[must_use]
pub fn actor() -> Actor {
    Actor::new(AccountId::new("admin-1"))
}

/// A memory store plus the blob store and collection names an engine needs.
pub struct TestContext<S = MemoryStore> {
    pub store: S,
    pub blobs: MemoryBlobStore,
    pub collections: Collections,
}

impl TestContext<MemoryStore> {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            blobs: MemoryBlobStore::new(),
            collections: Collections::default(),
        }
    }
}

impl Default for TestContext<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DocumentStore> TestContext<S> {
    /// Wrap an existing store.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            blobs: MemoryBlobStore::new(),
            collections: Collections::default(),
        }
    }

    /// Engine over this context.
    pub fn engine(&self) -> ReconciliationEngine<'_> {
        ReconciliationEngine::new(&self.store, &self.blobs, &self.collections)
    }

    /// Write a document, replacing any previous one.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the write.
    #[allow(clippy::unwrap_used)]
    pub async fn put(&self, collection: &str, id: &str, value: Value) {
        self.store
            .upsert(collection, Some(id), fields(value), false)
            .await
            .unwrap();
    }

    /// Seed a current-shape university with two locations and no dorms.
    pub async fn seed_campus(&self) {
        self.put(
            "campuses",
            CAMPUS_ID,
            json!({
                "name": "State University",
                "shortName": "SU",
                "locations": [
                    {"id": "north", "name": "North Campus"},
                    {"id": "south", "name": "South Campus"}
                ],
                "isActive": true,
                "adminEmails": ["dean@state.edu"],
                "adminIds": [],
                "isUniversity": true
            }),
        )
        .await;
    }

    /// Seed a legacy-shape university with two dorm rows and no current record.
    pub async fn seed_legacy_campus(&self) {
        self.put(
            "universities",
            CAMPUS_ID,
            json!({
                "name": "State University",
                "abbreviation": "SU",
                "locations": [{"id": "north", "name": "North Campus"}],
                "active": true,
                "admins": ["dean@state.edu"],
                "logo": "https://cdn.example/state.png"
            }),
        )
        .await;
        self.put(
            &format!("universities/{CAMPUS_ID}/dorms"),
            "l1",
            json!({"name": "Pioneer Hall", "location": "north"}),
        )
        .await;
        self.put(
            &format!("universities/{CAMPUS_ID}/dorms"),
            "l2",
            json!({"name": "Old Main", "location": "north"}),
        )
        .await;
    }

    /// Seed a platform account.
    pub async fn seed_account(&self, id: &str, email: &str) {
        self.put("users", id, json!({"email": email})).await;
    }
}

/// Operation a [`FlakyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    List,
    Upsert,
    Delete,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    collection_prefix: String,
}

/// A [`MemoryStore`] that fails chosen operations and counts calls.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Mutex<Vec<Fault>>,
    calls: AtomicUsize,
}

impl FlakyStore {
    /// Empty store with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `op` on collections starting with `collection_prefix`.
    #[allow(clippy::unwrap_used)]
    pub fn fail(&self, op: Op, collection_prefix: &str) {
        self.faults.lock().unwrap().push(Fault {
            op,
            collection_prefix: collection_prefix.to_owned(),
        });
    }

    /// Remove every fault.
    #[allow(clippy::unwrap_used)]
    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    /// Calls received, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    #[allow(clippy::unwrap_used)]
    fn check(&self, op: Op, collection: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults.lock().unwrap();
        if faults
            .iter()
            .any(|f| f.op == op && collection.starts_with(&f.collection_prefix))
        {
            return Err(StoreError::Unavailable(format!(
                "injected {op:?} failure on {collection}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check(Op::Get, collection)?;
        self.inner.get(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        self.check(Op::List, collection)?;
        self.inner.list(collection, filters).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Fields,
        merge: bool,
    ) -> Result<String, StoreError> {
        self.check(Op::Upsert, collection)?;
        self.inner.upsert(collection, id, fields, merge).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(Op::Delete, collection)?;
        self.inner.delete(collection, id).await
    }
}
