//! Campus and dorm domain models.

use serde::{Deserialize, Serialize};

use campus_hub_core::{AccountId, CampusId, DormId, Email, LocationId};

/// Category tag carried by every dorm row and every dorm-derived club.
pub const DORM_CATEGORY: &str = "dorm";

/// Which storage shape a campus was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageShape {
    /// The `campuses` collection.
    Current,
    /// The read-only `universities` collection that predates it.
    Legacy,
}

/// A named place on campus (quad, building cluster, satellite site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stable location ID.
    pub id: LocationId,
    /// Display name.
    pub name: String,
}

/// A campus as resolved from either storage shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campus {
    /// Campus document key (shared by both shapes).
    pub id: CampusId,
    /// Display name.
    pub name: String,
    /// Optional short name or abbreviation.
    pub short_name: Option<String>,
    /// Ordered named locations; the first one is the default for new dorms.
    pub locations: Vec<Location>,
    /// Whether the campus is visible to members.
    pub is_active: bool,
    /// Administrator email addresses.
    pub admin_emails: Vec<Email>,
    /// Administrator account IDs resolved from `admin_emails`.
    pub admin_ids: Vec<AccountId>,
    /// Whether the campus has dorms (`isUniversity` in storage).
    pub is_university: bool,
    /// Logo url.
    pub logo_url: Option<String>,
    /// Where this record was read from.
    pub shape: StorageShape,
}

impl Campus {
    /// The location new dorms land in when none is chosen.
    #[must_use]
    pub fn default_location(&self) -> Option<&LocationId> {
        self.locations.first().map(|l| &l.id)
    }
}

/// A dorm row under a campus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dorm {
    /// Dorm document key.
    pub id: DormId,
    /// Dorm name; also the key its derived club is matched by.
    pub name: String,
    /// Location the dorm belongs to.
    pub location_id: Option<LocationId>,
    /// Always [`DORM_CATEGORY`] for rows this crate writes.
    pub category: String,
    /// Admin email override for the derived club.
    pub admin_email: Option<Email>,
}

/// Campus with its dorm list, as loaded into an edit session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampusSnapshot {
    /// The campus document.
    pub campus: Campus,
    /// Dorms resolved through the dual-path read.
    pub dorms: Vec<Dorm>,
    /// Default clubs of this campus.
    pub default_clubs: Vec<super::Club>,
}
