//! Dual-path campus resolution.
//!
//! Campuses exist in two storage shapes: the current `campuses` collection and
//! the older `universities` collection it replaced. Reads try each shape in
//! order through the [`CampusSource`] port and the first one that answers
//! wins. Writes go to the current shape only; the legacy dorm rows are purged
//! on save so the two shapes stop diverging.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use campus_hub_core::{AccountId, CampusId, DormId, Email};

use super::dorms::{DormRepository, DormRow};
use super::{RepositoryError, decode, encode};
use crate::config::Collections;
use crate::models::{Campus, Dorm, Location, StorageShape};
use crate::store::{DocumentStore, child_collection};

const fn default_true() -> bool {
    true
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Current-shape campus fields.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampusRow {
    name: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    admin_emails: Vec<Email>,
    #[serde(default)]
    admin_ids: Vec<AccountId>,
    #[serde(default)]
    is_university: bool,
    #[serde(default)]
    logo_url: Option<String>,
}

impl CampusRow {
    fn into_campus(self, id: String) -> Campus {
        Campus {
            id: CampusId::new(id),
            name: self.name,
            short_name: self.short_name,
            locations: self.locations,
            is_active: self.is_active,
            admin_emails: self.admin_emails,
            admin_ids: self.admin_ids,
            is_university: self.is_university,
            logo_url: self.logo_url,
            shape: StorageShape::Current,
        }
    }
}

/// Legacy-shape university fields.
///
/// These records predate the dorm-bearing flag; every university had dorms.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniversityRow {
    name: String,
    #[serde(default)]
    abbreviation: Option<String>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    admins: Vec<Email>,
    #[serde(default)]
    admin_ids: Vec<AccountId>,
    #[serde(default)]
    is_university: Option<bool>,
    #[serde(default)]
    logo: Option<String>,
}

impl UniversityRow {
    fn into_campus(self, id: String) -> Campus {
        Campus {
            id: CampusId::new(id),
            name: self.name,
            short_name: self.abbreviation,
            locations: self.locations,
            is_active: self.active,
            admin_emails: self.admins,
            admin_ids: self.admin_ids,
            is_university: self.is_university.unwrap_or(true),
            logo_url: self.logo,
            shape: StorageShape::Legacy,
        }
    }
}

/// Campus-level fields written on every save.
///
/// Written with merge, so fields this crate does not own survive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampusUpdate {
    /// Display name.
    pub name: String,
    /// Optional short name; `None` clears it.
    pub short_name: Option<String>,
    /// Ordered locations.
    pub locations: Vec<Location>,
    /// Active flag.
    pub is_active: bool,
    /// Administrator emails.
    pub admin_emails: Vec<Email>,
    /// Administrator account IDs resolved from the emails.
    pub admin_ids: Vec<AccountId>,
    /// Dorm-bearing flag.
    pub is_university: bool,
    /// Logo url; `None` clears it.
    pub logo_url: Option<String>,
}

// =============================================================================
// Storage Shapes
// =============================================================================

/// One storage shape a campus and its dorms can be read from.
#[async_trait]
pub trait CampusSource: Send + Sync {
    /// Which shape this source reads.
    fn shape(&self) -> StorageShape;

    /// Read the campus record. `Ok(None)` if this shape has no such campus.
    async fn fetch_campus(&self, id: &CampusId) -> Result<Option<Campus>, RepositoryError>;

    /// Read the dorm rows. `Ok(None)` if this shape has no dorms for the campus.
    async fn fetch_dorms(&self, id: &CampusId) -> Result<Option<Vec<Dorm>>, RepositoryError>;
}

/// The `campuses` collection.
pub struct CurrentShape<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a Collections,
}

impl<'a> CurrentShape<'a> {
    /// Create the current-shape source.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, collections: &'a Collections) -> Self {
        Self { store, collections }
    }

    /// Dorm repository for a campus in this shape.
    #[must_use]
    pub fn dorms(&self, id: &CampusId) -> DormRepository<'a> {
        DormRepository::new(
            self.store,
            child_collection(
                &self.collections.campuses,
                id.as_str(),
                &self.collections.dorms,
            ),
        )
    }
}

#[async_trait]
impl CampusSource for CurrentShape<'_> {
    fn shape(&self) -> StorageShape {
        StorageShape::Current
    }

    async fn fetch_campus(&self, id: &CampusId) -> Result<Option<Campus>, RepositoryError> {
        let collection = &self.collections.campuses;
        let Some(doc) = self.store.get(collection, id.as_str()).await? else {
            return Ok(None);
        };
        let (key, row) = decode::<CampusRow>(collection, doc)?;
        Ok(Some(row.into_campus(key)))
    }

    async fn fetch_dorms(&self, id: &CampusId) -> Result<Option<Vec<Dorm>>, RepositoryError> {
        let dorms = self.dorms(id).list().await?;
        Ok((!dorms.is_empty()).then_some(dorms))
    }
}

/// The read-only `universities` collection.
pub struct LegacyShape<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a Collections,
}

impl<'a> LegacyShape<'a> {
    /// Create the legacy-shape source.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, collections: &'a Collections) -> Self {
        Self { store, collections }
    }

    /// Dorm repository for a campus in this shape.
    #[must_use]
    pub fn dorms(&self, id: &CampusId) -> DormRepository<'a> {
        DormRepository::new(
            self.store,
            child_collection(
                &self.collections.legacy_campuses,
                id.as_str(),
                &self.collections.dorms,
            ),
        )
    }
}

#[async_trait]
impl CampusSource for LegacyShape<'_> {
    fn shape(&self) -> StorageShape {
        StorageShape::Legacy
    }

    async fn fetch_campus(&self, id: &CampusId) -> Result<Option<Campus>, RepositoryError> {
        let collection = &self.collections.legacy_campuses;
        let Some(doc) = self.store.get(collection, id.as_str()).await? else {
            return Ok(None);
        };
        let (key, row) = decode::<UniversityRow>(collection, doc)?;
        Ok(Some(row.into_campus(key)))
    }

    async fn fetch_dorms(&self, id: &CampusId) -> Result<Option<Vec<Dorm>>, RepositoryError> {
        let dorms = self.dorms(id).list().await?;
        Ok((!dorms.is_empty()).then_some(dorms))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Reads campuses across both shapes; writes the current shape only.
pub struct DualPathResolver<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a Collections,
    current: CurrentShape<'a>,
    legacy: LegacyShape<'a>,
}

impl<'a> DualPathResolver<'a> {
    /// Create a resolver over both shapes.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, collections: &'a Collections) -> Self {
        Self {
            store,
            collections,
            current: CurrentShape::new(store, collections),
            legacy: LegacyShape::new(store, collections),
        }
    }

    /// Ask each shape in order; the first `Some` wins.
    ///
    /// A shape that errors is skipped. If no shape answers and at least one
    /// errored, the result is `ResolutionFailed` rather than "absent".
    async fn first_success<'s, T, F>(
        &'s self,
        entity: &str,
        read: F,
    ) -> Result<Option<T>, RepositoryError>
    where
        F: Fn(&'s dyn CampusSource) -> BoxFuture<'s, Result<Option<T>, RepositoryError>>,
    {
        let sources: [&'s dyn CampusSource; 2] = [&self.current, &self.legacy];
        let mut first_error: Option<(StorageShape, RepositoryError)> = None;

        for source in sources {
            match read(source).await {
                Ok(Some(found)) => {
                    if let Some((shape, error)) = &first_error {
                        warn!(
                            entity,
                            failed_shape = ?shape,
                            error = %error,
                            answered_shape = ?source.shape(),
                            "Resolved after an earlier shape failed"
                        );
                    } else if source.shape() == StorageShape::Legacy {
                        info!(entity, "Resolved from legacy shape");
                    }
                    return Ok(Some(found));
                }
                Ok(None) => {
                    debug!(entity, shape = ?source.shape(), "Not present in shape");
                }
                Err(error) => {
                    warn!(entity, shape = ?source.shape(), error = %error, "Shape read failed");
                    if first_error.is_none() {
                        first_error = Some((source.shape(), error));
                    }
                }
            }
        }

        match first_error {
            Some((_, error)) => Err(RepositoryError::ResolutionFailed {
                entity: entity.to_owned(),
                message: error.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Resolve a campus by id from whichever shape holds it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ResolutionFailed` if no shape answered and
    /// at least one read failed.
    pub async fn resolve_entity(&self, id: &CampusId) -> Result<Option<Campus>, RepositoryError> {
        let entity = format!("campus {id}");
        self.first_success(&entity, |source| source.fetch_campus(id))
            .await
    }

    /// Resolve the dorm list of a campus.
    ///
    /// An empty current-shape list falls through to the legacy rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ResolutionFailed` if no shape answered and
    /// at least one read failed.
    pub async fn resolve_child_list(&self, id: &CampusId) -> Result<Vec<Dorm>, RepositoryError> {
        let entity = format!("dorms of campus {id}");
        Ok(self
            .first_success(&entity, |source| source.fetch_dorms(id))
            .await?
            .unwrap_or_default())
    }

    /// Merge campus fields into the current-shape record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn upsert_entity(
        &self,
        id: &CampusId,
        update: &CampusUpdate,
    ) -> Result<(), RepositoryError> {
        let fields = encode(update)?;
        self.store
            .upsert(&self.collections.campuses, Some(id.as_str()), fields, true)
            .await?;
        debug!(campus_id = %id, "Wrote campus record");
        Ok(())
    }

    /// Write a dorm row under the current-shape campus.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub(crate) async fn upsert_child(
        &self,
        id: &CampusId,
        dorm_id: Option<&DormId>,
        row: &DormRow,
    ) -> Result<DormId, RepositoryError> {
        self.current.dorms(id).upsert(dorm_id, row).await
    }

    /// Dorm rows of the current shape only.
    #[must_use]
    pub fn current_dorms(&self, id: &CampusId) -> DormRepository<'a> {
        self.current.dorms(id)
    }

    /// Delete every legacy dorm row of a campus. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a read or delete fails.
    pub async fn purge_legacy_children(&self, id: &CampusId) -> Result<usize, RepositoryError> {
        let purged = self.legacy.dorms(id).purge().await?;
        if purged > 0 {
            info!(campus_id = %id, purged, "Purged legacy dorm rows");
        }
        Ok(purged)
    }
}
