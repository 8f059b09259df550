//! Errors raised by the reconciliation services.

use std::fmt;

use thiserror::Error;

use campus_hub_core::{CampusId, EmailError, LocationId};

use crate::db::RepositoryError;
use crate::services::GateError;

/// One ordered write step of a save.
///
/// Steps run strictly in this order; an error names the step that failed so
/// the caller knows which earlier steps already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReconcileStep {
    /// Upload the campus logo and merge the campus record.
    CampusRecord,
    /// Delete every legacy dorm row of the campus.
    LegacyPurge,
    /// Update or create the desired dorm rows.
    DormRows,
    /// Find or create the club of every desired dorm.
    DormClubs,
    /// Delete dorm rows no longer desired.
    OrphanDorms,
    /// Delete clubs of dorms queued for deletion.
    DormClubDeletions,
    /// Delete default clubs queued for deletion.
    DefaultClubDeletions,
    /// Update or create the desired default clubs.
    DefaultClubs,
}

impl ReconcileStep {
    /// Every step, in execution order.
    pub const ALL: [Self; 8] = [
        Self::CampusRecord,
        Self::LegacyPurge,
        Self::DormRows,
        Self::DormClubs,
        Self::OrphanDorms,
        Self::DormClubDeletions,
        Self::DefaultClubDeletions,
        Self::DefaultClubs,
    ];

    /// 1-based position in the pipeline.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::CampusRecord => 1,
            Self::LegacyPurge => 2,
            Self::DormRows => 3,
            Self::DormClubs => 4,
            Self::OrphanDorms => 5,
            Self::DormClubDeletions => 6,
            Self::DefaultClubDeletions => 7,
            Self::DefaultClubs => 8,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CampusRecord => "campus_record",
            Self::LegacyPurge => "legacy_purge",
            Self::DormRows => "dorm_rows",
            Self::DormClubs => "dorm_clubs",
            Self::OrphanDorms => "orphan_dorms",
            Self::DormClubDeletions => "dorm_club_deletions",
            Self::DefaultClubDeletions => "default_club_deletions",
            Self::DefaultClubs => "default_clubs",
        }
    }
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.as_str())
    }
}

/// Desired state rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("campus name cannot be blank")]
    BlankCampusName,

    #[error("invalid email in {field}: {source}")]
    InvalidEmail {
        /// Which form field held the address.
        field: String,
        /// Parse failure.
        source: EmailError,
    },

    #[error("default club {name:?} cannot use the dorm category")]
    DormCategoryOnDefaultClub {
        /// Club name.
        name: String,
    },

    #[error("dorm {dorm:?} references unknown location {location}")]
    UnknownLocation {
        /// Dorm name.
        dorm: String,
        /// Location not among the campus locations.
        location: LocationId,
    },
}

/// Errors returned by a save.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Desired state is invalid; nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The campus could not be read from either storage shape.
    #[error("campus resolution failed: {0}")]
    ResolutionFailed(#[source] RepositoryError),

    /// The campus exists in neither storage shape.
    #[error("campus not found: {0}")]
    CampusNotFound(CampusId),

    /// A step failed after the earlier steps committed.
    #[error("{step} failed: {source}")]
    PartialWrite {
        /// Step that failed.
        step: ReconcileStep,
        /// Underlying error.
        #[source]
        source: RepositoryError,
    },
}

impl ReconcileError {
    /// Wrap a repository error raised during `step`.
    pub(crate) fn at(step: ReconcileStep) -> impl Fn(RepositoryError) -> Self {
        move |source| Self::PartialWrite { step, source }
    }
}

/// Errors returned by an edit session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Loading or saving failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The confirmation gate rejected the request.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// No dorm with this name is in the form.
    #[error("no dorm named {0:?}")]
    UnknownDorm(String),

    /// No default club with this name is in the form.
    #[error("no default club named {0:?}")]
    UnknownDefaultClub(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_numbered_in_order() {
        let numbers: Vec<u8> = ReconcileStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(ReconcileStep::CampusRecord < ReconcileStep::DefaultClubs);
    }

    #[test]
    fn test_partial_write_names_step() {
        let err = ReconcileError::at(ReconcileStep::LegacyPurge)(RepositoryError::Store(
            crate::store::StoreError::Unavailable("timeout".into()),
        ));
        assert_eq!(
            err.to_string(),
            "step 2 (legacy_purge) failed: store error: store unavailable: timeout"
        );
    }
}
