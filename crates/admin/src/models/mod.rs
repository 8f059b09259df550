//! Domain models for campus configuration.
//!
//! - [`campus`] - Campuses, locations, dorms
//! - [`club`] - Clubs, memberships, the acting admin
//! - [`desired`] - Form input submitted on save, and the pending-deletion queues

pub mod campus;
pub mod club;
pub mod desired;

pub use campus::{Campus, CampusSnapshot, DORM_CATEGORY, Dorm, Location, StorageShape};
pub use club::{Actor, Club, ClubMember, ClubPatch, NewClub};
pub use desired::{
    DesiredCampus, DesiredDefaultClub, DesiredDorm, ImageUpload, PendingClub, PendingDeletions,
    PendingDorm,
};
