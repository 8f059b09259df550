//! Desired state submitted by an administrator on save.
//!
//! These types carry raw form input (untrimmed names, unparsed emails). The
//! reconciliation engine validates them before any store call.

use campus_hub_core::{ClubId, DormId, Identity, LocationId};

use super::{Campus, Club, Dorm, Location};

/// An image picked in the form, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name; becomes the last blob path segment.
    pub file_name: String,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

/// Editable campus-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredCampus {
    /// Display name (required).
    pub name: String,
    /// Optional short name.
    pub short_name: Option<String>,
    /// Ordered locations.
    pub locations: Vec<Location>,
    /// Active flag.
    pub is_active: bool,
    /// Administrator emails as typed.
    pub admin_emails: Vec<String>,
    /// Dorm-bearing flag.
    pub is_university: bool,
    /// Current logo url, kept when no new logo is uploaded.
    pub logo_url: Option<String>,
    /// Newly picked logo.
    pub new_logo: Option<ImageUpload>,
}

impl From<&Campus> for DesiredCampus {
    fn from(campus: &Campus) -> Self {
        Self {
            name: campus.name.clone(),
            short_name: campus.short_name.clone(),
            locations: campus.locations.clone(),
            is_active: campus.is_active,
            admin_emails: campus
                .admin_emails
                .iter()
                .map(|e| e.as_str().to_owned())
                .collect(),
            is_university: campus.is_university,
            logo_url: campus.logo_url.clone(),
            new_logo: None,
        }
    }
}

/// A dorm entry in the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredDorm {
    /// Persisted key, or the name for dorms added since load.
    pub identity: Identity<DormId>,
    /// Dorm name; blank entries are skipped.
    pub name: String,
    /// Location; defaults to the campus's first location.
    pub location_id: Option<LocationId>,
    /// Admin email override for the derived club.
    pub admin_email: Option<String>,
    /// New cover image for the derived club.
    pub image: Option<ImageUpload>,
}

impl DesiredDorm {
    /// A dorm added in the form, not yet saved.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            identity: Identity::Unidentified(name.clone()),
            name,
            location_id: None,
            admin_email: None,
            image: None,
        }
    }
}

impl From<&Dorm> for DesiredDorm {
    fn from(dorm: &Dorm) -> Self {
        Self {
            identity: Identity::Identified(dorm.id.clone()),
            name: dorm.name.clone(),
            location_id: dorm.location_id.clone(),
            admin_email: dorm.admin_email.as_ref().map(|e| e.as_str().to_owned()),
            image: None,
        }
    }
}

/// A default club entry in the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredDefaultClub {
    /// Persisted key, or the name for clubs added since load.
    pub identity: Identity<ClubId>,
    /// Club name; blank entries are skipped.
    pub name: String,
    /// Administrator emails as typed.
    pub admin_emails: Vec<String>,
    /// Current logo url, kept when no new image is uploaded.
    pub logo_url: Option<String>,
    /// Newly picked logo.
    pub image: Option<ImageUpload>,
    /// Optional category; never `"dorm"`.
    pub category: Option<String>,
}

impl DesiredDefaultClub {
    /// A default club added in the form, not yet saved.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            identity: Identity::Unidentified(name.clone()),
            name,
            admin_emails: Vec::new(),
            logo_url: None,
            image: None,
            category: None,
        }
    }
}

impl From<&Club> for DesiredDefaultClub {
    fn from(club: &Club) -> Self {
        Self {
            identity: Identity::Identified(club.id.clone()),
            name: club.name.clone(),
            admin_emails: club
                .admin_emails
                .iter()
                .map(|e| e.as_str().to_owned())
                .collect(),
            logo_url: club.cover_image_url.clone(),
            image: None,
            category: club.category.clone(),
        }
    }
}

/// A persisted dorm the admin removed from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDorm {
    /// Dorm row key.
    pub id: DormId,
    /// Dorm name; locates the derived club.
    pub name: String,
}

/// A persisted default club the admin removed from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClub {
    /// Club key.
    pub id: ClubId,
    /// Club name, for display.
    pub name: String,
}

/// Removals awaiting confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDeletions {
    /// Removed dorms whose clubs will be deleted.
    pub dorms: Vec<PendingDorm>,
    /// Removed default clubs.
    pub default_clubs: Vec<PendingClub>,
}

impl PendingDeletions {
    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dorms.is_empty() && self.default_clubs.is_empty()
    }

    /// Total queued removals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dorms.len() + self.default_clubs.len()
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.dorms.clear();
        self.default_clubs.clear();
    }
}
