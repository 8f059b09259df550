//! Pending identity for rows created client-side before their first save.
//!
//! A dorm typed into the admin form has no document key until it is written.
//! Until then the only thing that identifies it is its name. `Identity` makes
//! that explicit: resolution tries the key first, then the natural key, and
//! the caller swaps in `Identified` once the write returns a key.

use serde::{Deserialize, Serialize};

/// Either a persisted document key or the natural key of a not-yet-saved row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Identity<Id> {
    /// The row exists in the store under this key.
    Identified(Id),
    /// The row has never been saved; matched by this natural key.
    Unidentified(String),
}

impl<Id> Identity<Id> {
    /// Returns the persisted key, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&Id> {
        match self {
            Self::Identified(id) => Some(id),
            Self::Unidentified(_) => None,
        }
    }

    /// Whether this row has been persisted.
    #[must_use]
    pub const fn is_identified(&self) -> bool {
        matches!(self, Self::Identified(_))
    }

    /// Promote to `Identified` with the key returned by the store.
    ///
    /// Already-identified values keep their key.
    #[must_use]
    pub fn promote(self, id: Id) -> Self {
        match self {
            Self::Identified(existing) => Self::Identified(existing),
            Self::Unidentified(_) => Self::Identified(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DormId;

    #[test]
    fn test_promote_unidentified() {
        let identity: Identity<DormId> = Identity::Unidentified("Pioneer Hall".into());
        assert!(!identity.is_identified());

        let promoted = identity.promote(DormId::new("d1"));
        assert_eq!(promoted.id(), Some(&DormId::new("d1")));
    }

    #[test]
    fn test_promote_keeps_existing_key() {
        let identity = Identity::Identified(DormId::new("d1"));
        let promoted = identity.promote(DormId::new("d2"));
        assert_eq!(promoted, Identity::Identified(DormId::new("d1")));
    }
}
