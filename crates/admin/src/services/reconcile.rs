//! Reconciliation Engine.
//!
//! Applies an administrator's save as an ordered pipeline of idempotent
//! writes. There is no multi-document transaction: each step commits on its
//! own, a failing step aborts the rest, and nothing is rolled back. Running
//! the same save again converges on the same stored state.
//!
//! 1. Upload a new campus logo and merge the campus record.
//! 2. Purge the legacy dorm rows of the campus.
//! 3. Update or create the desired dorm rows.
//! 4. Find or create each dorm's club.
//! 5. Delete dorm rows no longer desired.
//! 6. Delete the clubs of dorms queued for deletion.
//! 7. Delete default clubs queued for deletion.
//! 8. Update or create the desired default clubs.
//!
//! Steps 3-5 only run for campuses with dorms.

use std::collections::BTreeSet;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use campus_hub_core::{CampusId, ClubId, DormId, Email, Identity, LocationId};

use super::club_binding::{
    ClubBindingResolver, DefaultClubBinding, DormBinding, campus_logo_path,
};
use crate::config::Collections;
use crate::db::campuses::CampusUpdate;
use crate::db::dorms::DormRow;
use crate::db::{AccountRepository, ClubRepository, DualPathResolver, RepositoryError};
use crate::error::{ReconcileError, ReconcileStep, ValidationError};
use crate::models::{
    Actor, CampusSnapshot, DORM_CATEGORY, DesiredCampus, DesiredDefaultClub, DesiredDorm,
    ImageUpload, Location, PendingDeletions, StorageShape,
};
use crate::store::{BlobStore, DocumentStore};

/// One save, as submitted.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    /// Campus being saved.
    pub campus_id: CampusId,
    /// Campus-level fields.
    pub campus: DesiredCampus,
    /// Desired dorm list.
    pub dorms: Vec<DesiredDorm>,
    /// Desired default-club list.
    pub default_clubs: Vec<DesiredDefaultClub>,
    /// Confirmed removals.
    pub pending: PendingDeletions,
    /// Administrator performing the save.
    pub actor: Actor,
}

/// Write counters of one save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub legacy_dorms_purged: usize,
    pub dorms_created: usize,
    pub dorms_updated: usize,
    pub dorms_deleted: usize,
    pub dorm_clubs_created: usize,
    pub dorm_clubs_updated: usize,
    pub dorm_clubs_deleted: usize,
    pub default_clubs_created: usize,
    pub default_clubs_updated: usize,
    pub default_clubs_deleted: usize,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Campus as stored after the save; dorms and default clubs carry their
    /// persisted ids.
    pub snapshot: CampusSnapshot,
    /// What was written.
    pub stats: ReconcileStats,
}

// =============================================================================
// Validation
// =============================================================================

#[derive(Debug)]
struct CampusPlan {
    name: String,
    short_name: Option<String>,
    locations: Vec<Location>,
    is_active: bool,
    admin_emails: Vec<Email>,
    is_university: bool,
    logo_url: Option<String>,
    new_logo: Option<ImageUpload>,
}

#[derive(Debug)]
struct DormPlan {
    identity: Identity<DormId>,
    name: String,
    location_id: Option<LocationId>,
    admin_email: Option<Email>,
    image: Option<ImageUpload>,
}

#[derive(Debug)]
struct DefaultClubPlan {
    identity: Identity<ClubId>,
    name: String,
    admin_emails: Vec<Email>,
    logo_url: Option<String>,
    image: Option<ImageUpload>,
    category: Option<String>,
}

/// Desired state after validation: blank names dropped, emails parsed.
///
/// Names are kept as entered; club lookups match them exactly.
#[derive(Debug)]
struct Plan {
    campus: CampusPlan,
    dorms: Vec<DormPlan>,
    default_clubs: Vec<DefaultClubPlan>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_emails(field: String, raw: &[String]) -> Result<Vec<Email>, ValidationError> {
    Email::parse_list(raw).map_err(|source| ValidationError::InvalidEmail { field, source })
}

impl Plan {
    fn validate(
        campus: DesiredCampus,
        dorms: Vec<DesiredDorm>,
        default_clubs: Vec<DesiredDefaultClub>,
    ) -> Result<Self, ValidationError> {
        let name = campus.name.trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::BlankCampusName);
        }

        let campus = CampusPlan {
            admin_emails: parse_emails("campus admin emails".to_owned(), &campus.admin_emails)?,
            name,
            short_name: non_blank(campus.short_name),
            locations: campus.locations,
            is_active: campus.is_active,
            is_university: campus.is_university,
            logo_url: non_blank(campus.logo_url),
            new_logo: campus.new_logo,
        };

        let dorms = if campus.is_university {
            dorms
                .into_iter()
                .filter(|dorm| !dorm.name.trim().is_empty())
                .map(|dorm| Self::validate_dorm(dorm, &campus.locations))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        let default_clubs = default_clubs
            .into_iter()
            .filter(|club| !club.name.trim().is_empty())
            .map(Self::validate_default_club)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            campus,
            dorms,
            default_clubs,
        })
    }

    fn validate_dorm(dorm: DesiredDorm, locations: &[Location]) -> Result<DormPlan, ValidationError> {
        let name = dorm.name;
        let location_id = match dorm.location_id {
            Some(location) if locations.iter().any(|l| l.id == location) => Some(location),
            Some(location) => {
                return Err(ValidationError::UnknownLocation {
                    dorm: name,
                    location,
                });
            }
            None => locations.first().map(|l| l.id.clone()),
        };
        let admin_email = match non_blank(dorm.admin_email) {
            Some(raw) => Some(Email::parse(&raw).map_err(|source| {
                ValidationError::InvalidEmail {
                    field: format!("admin email of dorm {name:?}"),
                    source,
                }
            })?),
            None => None,
        };
        Ok(DormPlan {
            identity: dorm.identity,
            name,
            location_id,
            admin_email,
            image: dorm.image,
        })
    }

    fn validate_default_club(club: DesiredDefaultClub) -> Result<DefaultClubPlan, ValidationError> {
        let name = club.name;
        let category = non_blank(club.category);
        if category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(DORM_CATEGORY))
        {
            return Err(ValidationError::DormCategoryOnDefaultClub { name });
        }
        Ok(DefaultClubPlan {
            admin_emails: parse_emails(
                format!("admin emails of default club {name:?}"),
                &club.admin_emails,
            )?,
            identity: club.identity,
            name,
            logo_url: non_blank(club.logo_url),
            image: club.image,
            category,
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Reconciliation Engine.
pub struct ReconciliationEngine<'a> {
    store: &'a dyn DocumentStore,
    blobs: &'a dyn BlobStore,
    collections: &'a Collections,
}

impl<'a> ReconciliationEngine<'a> {
    /// Create an engine over the given store, blob store and collection names.
    #[must_use]
    pub const fn new(
        store: &'a dyn DocumentStore,
        blobs: &'a dyn BlobStore,
        collections: &'a Collections,
    ) -> Self {
        Self {
            store,
            blobs,
            collections,
        }
    }

    fn resolver(&self) -> DualPathResolver<'a> {
        DualPathResolver::new(self.store, self.collections)
    }

    fn clubs(&self) -> ClubRepository<'a> {
        ClubRepository::new(self.store, self.collections)
    }

    fn binder(&self) -> ClubBindingResolver<'a> {
        ClubBindingResolver::new(self.clubs(), self.blobs)
    }

    /// Load a campus with its dorms and default clubs.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::CampusNotFound` if neither storage shape has
    /// the campus and `ReconcileError::ResolutionFailed` if it could not be read.
    #[instrument(skip(self), fields(campus_id = %campus_id))]
    pub async fn snapshot(&self, campus_id: &CampusId) -> Result<CampusSnapshot, ReconcileError> {
        let resolver = self.resolver();
        let campus = resolver
            .resolve_entity(campus_id)
            .await
            .map_err(ReconcileError::ResolutionFailed)?
            .ok_or_else(|| ReconcileError::CampusNotFound(campus_id.clone()))?;
        let dorms = resolver
            .resolve_child_list(campus_id)
            .await
            .map_err(ReconcileError::ResolutionFailed)?;
        let default_clubs = self
            .clubs()
            .list_default_clubs(campus_id)
            .await
            .map_err(ReconcileError::ResolutionFailed)?;

        Ok(CampusSnapshot {
            campus,
            dorms,
            default_clubs,
        })
    }

    /// Apply one save.
    ///
    /// # Errors
    ///
    /// - `Validation` if the desired state is invalid; nothing is read or written
    /// - `CampusNotFound` / `ResolutionFailed` if the campus cannot be loaded
    /// - `PartialWrite` naming the failed step; earlier steps stay committed
    #[instrument(skip(self, request), fields(campus_id = %request.campus_id))]
    pub async fn reconcile(
        &self,
        request: ReconcileRequest,
    ) -> Result<ReconcileReport, ReconcileError> {
        let ReconcileRequest {
            campus_id,
            campus,
            dorms,
            default_clubs,
            pending,
            actor,
        } = request;
        let plan = Plan::validate(campus, dorms, default_clubs)?;

        let resolver = self.resolver();
        let existing = resolver
            .resolve_entity(&campus_id)
            .await
            .map_err(ReconcileError::ResolutionFailed)?
            .ok_or_else(|| ReconcileError::CampusNotFound(campus_id.clone()))?;
        if existing.shape == StorageShape::Legacy {
            info!("Campus read from legacy shape; saving in current shape");
        }

        let mut stats = ReconcileStats::default();

        self.write_campus(&resolver, &campus_id, &plan.campus)
            .await
            .map_err(ReconcileError::at(ReconcileStep::CampusRecord))?;
        info!(step = %ReconcileStep::CampusRecord, "Campus record written");

        stats.legacy_dorms_purged = resolver
            .purge_legacy_children(&campus_id)
            .await
            .map_err(ReconcileError::at(ReconcileStep::LegacyPurge))?;

        if plan.campus.is_university {
            let current = self
                .write_dorm_rows(&resolver, &campus_id, &plan.dorms, &mut stats)
                .await
                .map_err(ReconcileError::at(ReconcileStep::DormRows))?;
            info!(
                step = %ReconcileStep::DormRows,
                created = stats.dorms_created,
                updated = stats.dorms_updated,
                "Dorm rows written"
            );

            self.bind_dorm_clubs(&campus_id, &plan, &actor, &mut stats)
                .await
                .map_err(ReconcileError::at(ReconcileStep::DormClubs))?;
            info!(
                step = %ReconcileStep::DormClubs,
                created = stats.dorm_clubs_created,
                updated = stats.dorm_clubs_updated,
                "Dorm clubs bound"
            );

            self.delete_orphan_dorms(&resolver, &campus_id, &current, &mut stats)
                .await
                .map_err(ReconcileError::at(ReconcileStep::OrphanDorms))?;
        } else {
            debug!("Campus has no dorms; dorm rows left as stored");
        }

        self.delete_dorm_clubs(&campus_id, &plan, &pending, &mut stats)
            .await
            .map_err(ReconcileError::at(ReconcileStep::DormClubDeletions))?;

        self.delete_default_clubs(&campus_id, &plan, &pending, &mut stats)
            .await
            .map_err(ReconcileError::at(ReconcileStep::DefaultClubDeletions))?;

        self.write_default_clubs(&campus_id, &plan, &actor, &mut stats)
            .await
            .map_err(ReconcileError::at(ReconcileStep::DefaultClubs))?;

        let snapshot = self.snapshot(&campus_id).await?;
        info!(
            legacy_dorms_purged = stats.legacy_dorms_purged,
            dorms_deleted = stats.dorms_deleted,
            dorm_clubs_deleted = stats.dorm_clubs_deleted,
            default_clubs_created = stats.default_clubs_created,
            default_clubs_updated = stats.default_clubs_updated,
            default_clubs_deleted = stats.default_clubs_deleted,
            "Campus saved"
        );
        Ok(ReconcileReport { snapshot, stats })
    }

    /// Step 1. Logo upload and admin id lookup run concurrently.
    async fn write_campus(
        &self,
        resolver: &DualPathResolver<'_>,
        campus_id: &CampusId,
        campus: &CampusPlan,
    ) -> Result<(), RepositoryError> {
        let logo = async {
            let url = match &campus.new_logo {
                Some(image) => Some(
                    self.blobs
                        .upload(&campus_logo_path(campus_id, image), &image.bytes)
                        .await?,
                ),
                None => campus.logo_url.clone(),
            };
            Ok::<_, RepositoryError>(url)
        };
        let accounts = AccountRepository::new(self.store, self.collections);
        let (logo_url, admin_ids) =
            futures::try_join!(logo, accounts.resolve_ids(&campus.admin_emails))?;

        resolver
            .upsert_entity(
                campus_id,
                &CampusUpdate {
                    name: campus.name.clone(),
                    short_name: campus.short_name.clone(),
                    locations: campus.locations.clone(),
                    is_active: campus.is_active,
                    admin_emails: campus.admin_emails.clone(),
                    admin_ids,
                    is_university: campus.is_university,
                    logo_url,
                },
            )
            .await
    }

    /// Step 3. Returns the ids of every desired dorm row.
    ///
    /// A desired dorm matches a stored row by id, else by name among the rows
    /// not yet matched, else it becomes a new row.
    async fn write_dorm_rows(
        &self,
        resolver: &DualPathResolver<'_>,
        campus_id: &CampusId,
        dorms: &[DormPlan],
        stats: &mut ReconcileStats,
    ) -> Result<BTreeSet<DormId>, RepositoryError> {
        let repo = resolver.current_dorms(campus_id);
        let persisted = repo.list().await?;
        let mut current = BTreeSet::new();

        for dorm in dorms {
            let by_id = match &dorm.identity {
                Identity::Identified(id) => persisted.iter().find(|p| &p.id == id),
                Identity::Unidentified(_) => None,
            };
            let known = by_id.or_else(|| {
                persisted
                    .iter()
                    .find(|p| p.name == dorm.name && !current.contains(&p.id))
            });

            let row = DormRow::new(
                &dorm.name,
                dorm.location_id.as_ref(),
                dorm.admin_email.as_ref(),
            );
            let id = resolver
                .upsert_child(campus_id, known.map(|p| &p.id), &row)
                .await?;
            if known.is_some() {
                stats.dorms_updated += 1;
            } else {
                stats.dorms_created += 1;
            }
            current.insert(id);
        }
        Ok(current)
    }

    /// Step 4. Dorms sharing a name are bound once; the first entry wins.
    async fn bind_dorm_clubs(
        &self,
        campus_id: &CampusId,
        plan: &Plan,
        actor: &Actor,
        stats: &mut ReconcileStats,
    ) -> Result<(), RepositoryError> {
        let binder = self.binder();
        let mut seen = BTreeSet::new();
        let bindings = plan
            .dorms
            .iter()
            .filter(|dorm| seen.insert(dorm.name.as_str()))
            .map(|dorm| {
                binder.bind_dorm_club(
                    DormBinding {
                        campus_id,
                        campus_name: &plan.campus.name,
                        dorm_name: &dorm.name,
                        admin_override: dorm.admin_email.as_ref(),
                        campus_admins: &plan.campus.admin_emails,
                        image: dorm.image.as_ref(),
                    },
                    actor,
                )
            });

        for binding in try_join_all(bindings).await? {
            if binding.created {
                stats.dorm_clubs_created += 1;
            } else {
                stats.dorm_clubs_updated += 1;
            }
        }
        Ok(())
    }

    /// Step 5.
    async fn delete_orphan_dorms(
        &self,
        resolver: &DualPathResolver<'_>,
        campus_id: &CampusId,
        current: &BTreeSet<DormId>,
        stats: &mut ReconcileStats,
    ) -> Result<(), RepositoryError> {
        let repo = resolver.current_dorms(campus_id);
        for dorm in repo.list().await? {
            if !current.contains(&dorm.id) {
                repo.delete(&dorm.id).await?;
                stats.dorms_deleted += 1;
            }
        }
        if stats.dorms_deleted > 0 {
            info!(step = %ReconcileStep::OrphanDorms, deleted = stats.dorms_deleted, "Orphan dorm rows deleted");
        }
        Ok(())
    }

    /// Step 6. A queued dorm that is desired again keeps its club.
    async fn delete_dorm_clubs(
        &self,
        campus_id: &CampusId,
        plan: &Plan,
        pending: &PendingDeletions,
        stats: &mut ReconcileStats,
    ) -> Result<(), RepositoryError> {
        let desired: BTreeSet<&str> = plan.dorms.iter().map(|d| d.name.as_str()).collect();
        let clubs = self.clubs();

        for dorm in &pending.dorms {
            if desired.contains(dorm.name.as_str()) {
                debug!(dorm = %dorm.name, "Queued dorm is desired again; club kept");
                continue;
            }
            match clubs.find_dorm_club(campus_id, &dorm.name).await? {
                Some(club) => {
                    clubs.delete(&club.id).await?;
                    stats.dorm_clubs_deleted += 1;
                    info!(club_id = %club.id, dorm = %dorm.name, "Deleted dorm club");
                }
                None => debug!(dorm = %dorm.name, "Dorm club already gone"),
            }
        }
        Ok(())
    }

    /// Step 7. Only default clubs of this campus are deleted.
    async fn delete_default_clubs(
        &self,
        campus_id: &CampusId,
        plan: &Plan,
        pending: &PendingDeletions,
        stats: &mut ReconcileStats,
    ) -> Result<(), RepositoryError> {
        let desired: BTreeSet<&ClubId> = plan
            .default_clubs
            .iter()
            .filter_map(|c| c.identity.id())
            .collect();
        let clubs = self.clubs();

        for queued in &pending.default_clubs {
            if desired.contains(&queued.id) {
                debug!(club_id = %queued.id, "Queued default club is desired again; kept");
                continue;
            }
            match clubs.get(&queued.id).await? {
                Some(club) if club.is_default && &club.campus_id == campus_id => {
                    clubs.delete(&club.id).await?;
                    stats.default_clubs_deleted += 1;
                    info!(club_id = %club.id, name = %club.name, "Deleted default club");
                }
                Some(club) => warn!(
                    club_id = %club.id,
                    "Queued club is not a default club of this campus; skipped"
                ),
                None => debug!(club_id = %queued.id, "Default club already gone"),
            }
        }
        Ok(())
    }

    /// Step 8.
    async fn write_default_clubs(
        &self,
        campus_id: &CampusId,
        plan: &Plan,
        actor: &Actor,
        stats: &mut ReconcileStats,
    ) -> Result<(), RepositoryError> {
        let binder = self.binder();
        for club in &plan.default_clubs {
            let binding = binder
                .bind_default_club(
                    DefaultClubBinding {
                        campus_id,
                        identity: &club.identity,
                        name: &club.name,
                        admin_emails: &club.admin_emails,
                        logo_url: club.logo_url.as_deref(),
                        image: club.image.as_ref(),
                        category: club.category.as_deref(),
                    },
                    actor,
                )
                .await?;
            if binding.created {
                stats.default_clubs_created += 1;
            } else {
                stats.default_clubs_updated += 1;
            }
        }
        if !plan.default_clubs.is_empty() {
            info!(
                step = %ReconcileStep::DefaultClubs,
                created = stats.default_clubs_created,
                updated = stats.default_clubs_updated,
                "Default clubs written"
            );
        }
        Ok(())
    }
}
