//! Club and membership domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_hub_core::{AccountId, CampusId, ClubId, Email, JoinStatus, MemberRole};

/// A club record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    /// Club document key.
    pub id: ClubId,
    /// Display name. For dorm clubs this equals the dorm name.
    pub name: String,
    /// Owning campus.
    pub campus_id: CampusId,
    /// Campus-wide default club (`true`) or dorm-derived club (`false`).
    pub is_default: bool,
    /// Category tag (`"dorm"` for dorm clubs).
    pub category: Option<String>,
    /// Description shown on the club page.
    pub description: String,
    /// Administrator emails.
    pub admin_emails: Vec<Email>,
    /// Administrator account IDs.
    pub admin_ids: Vec<AccountId>,
    /// Member account IDs.
    pub member_ids: Vec<AccountId>,
    /// Cached member count.
    pub member_count: i64,
    /// Whether joining requires approval.
    pub is_private: bool,
    /// Cover image url.
    pub cover_image_url: Option<String>,
    /// Account that created the club.
    pub created_by: Option<AccountId>,
    /// When the club was created.
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for a club about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClub {
    /// Display name.
    pub name: String,
    /// Owning campus.
    pub campus_id: CampusId,
    /// Default club or dorm club.
    pub is_default: bool,
    /// Category tag.
    pub category: Option<String>,
    /// Description.
    pub description: String,
    /// Administrator emails.
    pub admin_emails: Vec<Email>,
    /// Cover image url, uploaded before the create.
    pub cover_image_url: Option<String>,
}

/// Partial update of a club. `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClubPatch {
    /// New display name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// Replacement admin email list.
    pub admin_emails: Option<Vec<Email>>,
    /// New cover image url.
    pub cover_image_url: Option<String>,
    /// Re-assert the default flag.
    pub is_default: Option<bool>,
}

impl ClubPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.admin_emails.is_none()
            && self.cover_image_url.is_none()
            && self.is_default.is_none()
    }
}

/// A membership row under a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubMember {
    /// Member account (also the document key).
    pub account_id: AccountId,
    /// Contact address recorded when the membership was created.
    pub email: Option<Email>,
    /// Role within the club.
    pub role: MemberRole,
    /// Join state.
    pub status: JoinStatus,
    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}

impl ClubMember {
    /// Approved owner membership for the acting admin, seeded when a derived
    /// club is created.
    #[must_use]
    pub fn owner(actor: &Actor) -> Self {
        Self {
            account_id: actor.account_id.clone(),
            email: actor.email.clone(),
            role: MemberRole::Owner,
            status: JoinStatus::Approved,
            joined_at: Utc::now(),
        }
    }
}

/// The administrator performing a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Account of the acting admin.
    pub account_id: AccountId,
    /// Their email, if known.
    pub email: Option<Email>,
}

impl Actor {
    /// Actor without a known email.
    #[must_use]
    pub const fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            email: None,
        }
    }
}
