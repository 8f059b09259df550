//! Club and membership repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use campus_hub_core::{AccountId, CampusId, ClubId, Email, JoinStatus, MemberRole};

use super::{RepositoryError, decode, encode};
use crate::config::Collections;
use crate::models::{Actor, Club, ClubMember, ClubPatch, NewClub};
use crate::store::{DocumentStore, Filter, child_collection};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClubRow {
    name: String,
    campus_id: CampusId,
    #[serde(default)]
    is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    admin_emails: Vec<Email>,
    #[serde(default)]
    admin_ids: Vec<AccountId>,
    #[serde(default)]
    member_ids: Vec<AccountId>,
    #[serde(default)]
    member_count: i64,
    #[serde(default)]
    is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl ClubRow {
    fn into_club(self, id: String) -> Club {
        Club {
            id: ClubId::new(id),
            name: self.name,
            campus_id: self.campus_id,
            is_default: self.is_default,
            category: self.category,
            description: self.description,
            admin_emails: self.admin_emails,
            admin_ids: self.admin_ids,
            member_ids: self.member_ids,
            member_count: self.member_count,
            is_private: self.is_private,
            cover_image_url: self.cover_image_url,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Only the fields a patch sets; written with merge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClubPatchRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_emails: Option<&'a [Email]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_default: Option<bool>,
}

impl<'a> From<&'a ClubPatch> for ClubPatchRow<'a> {
    fn from(patch: &'a ClubPatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            category: patch.category.as_deref(),
            admin_emails: patch.admin_emails.as_deref(),
            cover_image_url: patch.cover_image_url.as_deref(),
            is_default: patch.is_default,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for club records and their memberships.
pub struct ClubRepository<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a Collections,
}

impl<'a> ClubRepository<'a> {
    /// Create a new club repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, collections: &'a Collections) -> Self {
        Self { store, collections }
    }

    fn members_collection(&self, id: &ClubId) -> String {
        child_collection(
            &self.collections.clubs,
            id.as_str(),
            &self.collections.members,
        )
    }

    async fn query(&self, filters: &[Filter]) -> Result<Vec<Club>, RepositoryError> {
        let collection = &self.collections.clubs;
        let docs = self.store.list(collection, filters).await?;
        docs.into_iter()
            .map(|doc| {
                let (id, row) = decode::<ClubRow>(collection, doc)?;
                Ok(row.into_club(id))
            })
            .collect()
    }

    /// Get a club by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the record cannot be decoded.
    pub async fn get(&self, id: &ClubId) -> Result<Option<Club>, RepositoryError> {
        let collection = &self.collections.clubs;
        let Some(doc) = self.store.get(collection, id.as_str()).await? else {
            return Ok(None);
        };
        let (key, row) = decode::<ClubRow>(collection, doc)?;
        Ok(Some(row.into_club(key)))
    }

    /// Find the dorm club of `campus_id` named exactly `name`.
    ///
    /// Concurrent saves can leave duplicates behind; the lowest id wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_dorm_club(
        &self,
        campus_id: &CampusId,
        name: &str,
    ) -> Result<Option<Club>, RepositoryError> {
        self.find_one(campus_id, name, false).await
    }

    /// Find the default club of `campus_id` named exactly `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_default_club(
        &self,
        campus_id: &CampusId,
        name: &str,
    ) -> Result<Option<Club>, RepositoryError> {
        self.find_one(campus_id, name, true).await
    }

    async fn find_one(
        &self,
        campus_id: &CampusId,
        name: &str,
        is_default: bool,
    ) -> Result<Option<Club>, RepositoryError> {
        // Rows without `isDefault` count as non-default; filter after decoding.
        let matches: Vec<Club> = self
            .query(&[
                Filter::eq("campusId", campus_id.as_str()),
                Filter::eq("name", name),
            ])
            .await?
            .into_iter()
            .filter(|club| club.is_default == is_default)
            .collect();

        if matches.len() > 1 {
            warn!(
                campus_id = %campus_id,
                name,
                is_default,
                count = matches.len(),
                "Duplicate clubs for one name; using the lowest id"
            );
        }
        Ok(matches.into_iter().min_by(|a, b| a.id.cmp(&b.id)))
    }

    /// List the default clubs of a campus, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_default_clubs(
        &self,
        campus_id: &CampusId,
    ) -> Result<Vec<Club>, RepositoryError> {
        let clubs = self
            .query(&[Filter::eq("campusId", campus_id.as_str())])
            .await?;
        Ok(clubs.into_iter().filter(|club| club.is_default).collect())
    }

    /// List every club of a campus, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_campus(&self, campus_id: &CampusId) -> Result<Vec<Club>, RepositoryError> {
        self.query(&[Filter::eq("campusId", campus_id.as_str())])
            .await
    }

    /// Create a club with the actor as sole member, admin, and owner.
    ///
    /// The club record is written before the owner membership; if the second
    /// write fails the club exists without it and the next save's lookup
    /// finds the club rather than creating another.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub async fn create(&self, new: NewClub, actor: &Actor) -> Result<ClubId, RepositoryError> {
        let row = ClubRow {
            name: new.name,
            campus_id: new.campus_id,
            is_default: new.is_default,
            category: new.category,
            description: new.description,
            admin_emails: new.admin_emails,
            admin_ids: vec![actor.account_id.clone()],
            member_ids: vec![actor.account_id.clone()],
            member_count: 1,
            is_private: false,
            cover_image_url: new.cover_image_url,
            created_by: Some(actor.account_id.clone()),
            created_at: Some(Utc::now()),
        };
        let key = self
            .store
            .upsert(&self.collections.clubs, None, encode(&row)?, false)
            .await?;
        let id = ClubId::new(key);
        debug!(club_id = %id, name = %row.name, is_default = row.is_default, "Created club");

        self.add_member(&id, &ClubMember::owner(actor))
            .await?;
        Ok(id)
    }

    /// Merge the fields a patch sets into a club. An empty patch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn update(&self, id: &ClubId, patch: &ClubPatch) -> Result<(), RepositoryError> {
        if patch.is_empty() {
            return Ok(());
        }
        let fields = encode(&ClubPatchRow::from(patch))?;
        self.store
            .upsert(&self.collections.clubs, Some(id.as_str()), fields, true)
            .await?;
        debug!(club_id = %id, "Updated club");
        Ok(())
    }

    /// Delete a club and its membership rows. Deleting a missing club is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a read or delete fails.
    pub async fn delete(&self, id: &ClubId) -> Result<(), RepositoryError> {
        let members = self.members_collection(id);
        for doc in self.store.list(&members, &[]).await? {
            self.store.delete(&members, &doc.id).await?;
        }
        self.store
            .delete(&self.collections.clubs, id.as_str())
            .await?;
        debug!(club_id = %id, "Deleted club");
        Ok(())
    }

    /// Write a membership row keyed by the member's account id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn add_member(
        &self,
        id: &ClubId,
        member: &ClubMember,
    ) -> Result<(), RepositoryError> {
        let fields = encode(&MemberRow::from(member))?;
        self.store
            .upsert(
                &self.members_collection(id),
                Some(member.account_id.as_str()),
                fields,
                false,
            )
            .await?;
        Ok(())
    }

    /// List the membership rows of a club.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a row cannot be decoded.
    pub async fn members(&self, id: &ClubId) -> Result<Vec<ClubMember>, RepositoryError> {
        let collection = self.members_collection(id);
        let docs = self.store.list(&collection, &[]).await?;
        docs.into_iter()
            .map(|doc| {
                let (_, row) = decode::<MemberRow>(&collection, doc)?;
                Ok(row.into())
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRow {
    account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<Email>,
    role: MemberRole,
    status: JoinStatus,
    joined_at: DateTime<Utc>,
}

impl From<&ClubMember> for MemberRow {
    fn from(member: &ClubMember) -> Self {
        Self {
            account_id: member.account_id.clone(),
            email: member.email.clone(),
            role: member.role,
            status: member.status,
            joined_at: member.joined_at,
        }
    }
}

impl From<MemberRow> for ClubMember {
    fn from(row: MemberRow) -> Self {
        Self {
            account_id: row.account_id,
            email: row.email,
            role: row.role,
            status: row.status,
            joined_at: row.joined_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::DORM_CATEGORY;
    use crate::store::MemoryStore;

    fn new_club(name: &str, is_default: bool) -> NewClub {
        NewClub {
            name: name.into(),
            campus_id: CampusId::new("c1"),
            is_default,
            category: (!is_default).then(|| DORM_CATEGORY.to_owned()),
            description: String::new(),
            admin_emails: vec![Email::parse("ra@state.edu").unwrap()],
            cover_image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_seeds_owner_membership() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        let repo = ClubRepository::new(&store, &collections);
        let actor = Actor::new(AccountId::new("admin-1"));

        let id = repo.create(new_club("Pioneer Hall", false), &actor).await.unwrap();
        let club = repo.get(&id).await.unwrap().unwrap();

        assert_eq!(club.member_count, 1);
        assert_eq!(club.member_ids, vec![AccountId::new("admin-1")]);
        assert_eq!(club.created_by, Some(AccountId::new("admin-1")));
        assert!(!club.is_private);

        let members = repo.members(&id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, MemberRole::Owner);
        assert_eq!(members[0].status, JoinStatus::Approved);
    }

    #[tokio::test]
    async fn test_owner_membership_records_actor_email() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        let repo = ClubRepository::new(&store, &collections);
        let actor = Actor {
            account_id: AccountId::new("admin-1"),
            email: Some(Email::parse("Dean@State.edu").unwrap()),
        };

        let id = repo.create(new_club("Chess", true), &actor).await.unwrap();
        let members = repo.members(&id).await.unwrap();

        assert_eq!(
            members[0].email.as_ref().map(Email::as_str),
            Some("Dean@State.edu")
        );
        let stored = store
            .get(&repo.members_collection(&id), "admin-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.fields["email"], json!("Dean@State.edu"));
    }

    #[tokio::test]
    async fn test_find_partitions_on_default_flag() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        let repo = ClubRepository::new(&store, &collections);
        let actor = Actor::new(AccountId::new("admin-1"));
        let campus = CampusId::new("c1");

        let dorm = repo.create(new_club("Quad", false), &actor).await.unwrap();
        let default = repo.create(new_club("Quad", true), &actor).await.unwrap();

        assert_eq!(
            repo.find_dorm_club(&campus, "Quad").await.unwrap().unwrap().id,
            dorm
        );
        assert_eq!(
            repo.find_default_club(&campus, "Quad").await.unwrap().unwrap().id,
            default
        );
        assert!(repo.find_dorm_club(&campus, "quad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_dorm_clubs_lowest_id_wins() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        for id in ["zz", "aa"] {
            store
                .upsert(
                    "clubs",
                    Some(id),
                    json!({"name": "Pioneer Hall", "campusId": "c1", "isDefault": false})
                        .as_object()
                        .cloned()
                        .unwrap(),
                    false,
                )
                .await
                .unwrap();
        }

        let repo = ClubRepository::new(&store, &collections);
        let club = repo
            .find_dorm_club(&CampusId::new("c1"), "Pioneer Hall")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(club.id, ClubId::new("aa"));
    }

    #[tokio::test]
    async fn test_club_without_default_flag_is_a_dorm_club() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        store
            .upsert(
                "clubs",
                Some("club-old"),
                json!({"name": "Pioneer Hall", "campusId": "c1", "category": "dorm"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                false,
            )
            .await
            .unwrap();

        let repo = ClubRepository::new(&store, &collections);
        let campus = CampusId::new("c1");
        let club = repo
            .find_dorm_club(&campus, "Pioneer Hall")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(club.id, ClubId::new("club-old"));
        assert!(!club.is_default);
        assert!(
            repo.find_default_club(&campus, "Pioneer Hall")
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.list_default_clubs(&campus).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_only_patched_fields() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        let repo = ClubRepository::new(&store, &collections);
        let actor = Actor::new(AccountId::new("admin-1"));
        let id = repo.create(new_club("Chess", true), &actor).await.unwrap();

        repo.update(
            &id,
            &ClubPatch {
                cover_image_url: Some("memory://logo.png".into()),
                ..ClubPatch::default()
            },
        )
        .await
        .unwrap();

        let club = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(club.cover_image_url.as_deref(), Some("memory://logo.png"));
        assert_eq!(club.name, "Chess");
        assert_eq!(club.member_count, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_members() {
        let store = MemoryStore::new();
        let collections = Collections::default();
        let repo = ClubRepository::new(&store, &collections);
        let actor = Actor::new(AccountId::new("admin-1"));
        let id = repo.create(new_club("Chess", true), &actor).await.unwrap();

        repo.delete(&id).await.unwrap();
        repo.delete(&id).await.unwrap();

        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(repo.members(&id).await.unwrap().is_empty());
    }
}
