//! Edit session for one campus.
//!
//! Holds the form state between load and save: campus fields, the dorm and
//! default-club lists, and the queues of persisted entries the administrator
//! removed. Every save goes through the [`DeletionGate`]; a save that would
//! delete clubs waits for three acknowledgements before it reaches the
//! engine.

use tracing::{debug, instrument};

use campus_hub_core::{CampusId, Identity};

use super::deletion_gate::{DeletionGate, GateDecision, GateStage};
use super::reconcile::{ReconcileReport, ReconcileRequest, ReconciliationEngine};
use crate::error::SessionError;
use crate::models::{
    Actor, CampusSnapshot, DesiredCampus, DesiredDefaultClub, DesiredDorm, PendingClub,
    PendingDeletions, PendingDorm,
};

/// Result of [`EditSession::save`] or [`EditSession::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The save is held; show the prompt of this stage.
    AwaitingConfirmation(GateStage),
    /// The save ran.
    Saved(Box<ReconcileReport>),
}

/// Form state of one campus.
#[derive(Debug, Clone)]
pub struct EditSession {
    campus_id: CampusId,
    actor: Actor,
    campus: DesiredCampus,
    dorms: Vec<DesiredDorm>,
    default_clubs: Vec<DesiredDefaultClub>,
    pending: PendingDeletions,
    gate: DeletionGate,
}

impl EditSession {
    /// Load the campus and start editing.
    ///
    /// # Errors
    ///
    /// Returns an error if the campus cannot be resolved.
    #[instrument(skip(engine, actor), fields(campus_id = %campus_id))]
    pub async fn load(
        engine: &ReconciliationEngine<'_>,
        campus_id: CampusId,
        actor: Actor,
    ) -> Result<Self, SessionError> {
        let snapshot = engine.snapshot(&campus_id).await?;
        debug!(
            dorms = snapshot.dorms.len(),
            default_clubs = snapshot.default_clubs.len(),
            shape = ?snapshot.campus.shape,
            "Edit session loaded"
        );
        Ok(Self::from_snapshot(&snapshot, actor))
    }

    /// Start editing from an already loaded snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &CampusSnapshot, actor: Actor) -> Self {
        Self {
            campus_id: snapshot.campus.id.clone(),
            actor,
            campus: DesiredCampus::from(&snapshot.campus),
            dorms: snapshot.dorms.iter().map(DesiredDorm::from).collect(),
            default_clubs: snapshot
                .default_clubs
                .iter()
                .map(DesiredDefaultClub::from)
                .collect(),
            pending: PendingDeletions::default(),
            gate: DeletionGate::new(),
        }
    }

    #[must_use]
    pub const fn campus_id(&self) -> &CampusId {
        &self.campus_id
    }

    #[must_use]
    pub const fn campus(&self) -> &DesiredCampus {
        &self.campus
    }

    pub const fn campus_mut(&mut self) -> &mut DesiredCampus {
        &mut self.campus
    }

    #[must_use]
    pub fn dorms(&self) -> &[DesiredDorm] {
        &self.dorms
    }

    #[must_use]
    pub fn default_clubs(&self) -> &[DesiredDefaultClub] {
        &self.default_clubs
    }

    /// Removals waiting for a confirmed save.
    #[must_use]
    pub const fn pending(&self) -> &PendingDeletions {
        &self.pending
    }

    /// Current gate stage.
    #[must_use]
    pub const fn gate_stage(&self) -> GateStage {
        self.gate.stage()
    }

    /// Add a dorm to the form.
    ///
    /// Re-adding a dorm that was removed earlier in this session takes it off
    /// the deletion queue and keeps its stored row.
    pub fn add_dorm(&mut self, mut dorm: DesiredDorm) {
        if let Some(pos) = self.pending.dorms.iter().position(|p| p.name == dorm.name) {
            let restored = self.pending.dorms.remove(pos);
            debug!(dorm = %restored.name, "Dorm re-added; removed from deletion queue");
            if !dorm.identity.is_identified() {
                dorm.identity = dorm.identity.promote(restored.id);
            }
        }
        self.dorms.push(dorm);
    }

    /// Edit a dorm in place.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownDorm` if no dorm has this name.
    pub fn dorm_mut(&mut self, name: &str) -> Result<&mut DesiredDorm, SessionError> {
        self.dorms
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| SessionError::UnknownDorm(name.to_owned()))
    }

    /// Remove a dorm from the form. A stored dorm is queued for deletion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownDorm` if no dorm has this name.
    pub fn remove_dorm(&mut self, name: &str) -> Result<DesiredDorm, SessionError> {
        let pos = self
            .dorms
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| SessionError::UnknownDorm(name.to_owned()))?;
        let removed = self.dorms.remove(pos);
        if let Identity::Identified(id) = &removed.identity {
            self.pending.dorms.push(PendingDorm {
                id: id.clone(),
                name: removed.name.clone(),
            });
        }
        Ok(removed)
    }

    /// Add a default club to the form, taking it off the deletion queue if it
    /// was removed earlier in this session.
    pub fn add_default_club(&mut self, mut club: DesiredDefaultClub) {
        if let Some(pos) = self
            .pending
            .default_clubs
            .iter()
            .position(|p| p.name == club.name)
        {
            let restored = self.pending.default_clubs.remove(pos);
            debug!(club = %restored.name, "Default club re-added; removed from deletion queue");
            if !club.identity.is_identified() {
                club.identity = club.identity.promote(restored.id);
            }
        }
        self.default_clubs.push(club);
    }

    /// Edit a default club in place.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownDefaultClub` if no club has this name.
    pub fn default_club_mut(&mut self, name: &str) -> Result<&mut DesiredDefaultClub, SessionError> {
        self.default_clubs
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SessionError::UnknownDefaultClub(name.to_owned()))
    }

    /// Remove a default club from the form. A stored club is queued for deletion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownDefaultClub` if no club has this name.
    pub fn remove_default_club(&mut self, name: &str) -> Result<DesiredDefaultClub, SessionError> {
        let pos = self
            .default_clubs
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SessionError::UnknownDefaultClub(name.to_owned()))?;
        let removed = self.default_clubs.remove(pos);
        if let Identity::Identified(id) = &removed.identity {
            self.pending.default_clubs.push(PendingClub {
                id: id.clone(),
                name: removed.name.clone(),
            });
        }
        Ok(removed)
    }

    /// Save the form.
    ///
    /// With removals queued and no confirmation yet, nothing is written and
    /// the first prompt is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the save itself fails.
    pub async fn save(
        &mut self,
        engine: &ReconciliationEngine<'_>,
    ) -> Result<SaveOutcome, SessionError> {
        match self.gate.on_save(&self.pending) {
            GateDecision::Prompt(stage) => Ok(SaveOutcome::AwaitingConfirmation(stage)),
            GateDecision::Proceed => self.commit(engine).await,
        }
    }

    /// Acknowledge the current prompt; the last acknowledgement runs the save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Gate` when no prompt is showing, or the save error.
    pub async fn advance(
        &mut self,
        engine: &ReconciliationEngine<'_>,
    ) -> Result<SaveOutcome, SessionError> {
        match self.gate.advance()? {
            GateDecision::Prompt(stage) => Ok(SaveOutcome::AwaitingConfirmation(stage)),
            GateDecision::Proceed => self.commit(engine).await,
        }
    }

    /// Back out of the confirmation. The queues are kept.
    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    /// Run the save. The confirmation is spent either way; the queues are
    /// only cleared on success.
    async fn commit(
        &mut self,
        engine: &ReconciliationEngine<'_>,
    ) -> Result<SaveOutcome, SessionError> {
        let request = ReconcileRequest {
            campus_id: self.campus_id.clone(),
            campus: self.campus.clone(),
            dorms: self.dorms.clone(),
            default_clubs: self.default_clubs.clone(),
            pending: self.pending.clone(),
            actor: self.actor.clone(),
        };
        let result = engine.reconcile(request).await;
        self.gate.finish();
        let report = result?;

        let actor = self.actor.clone();
        *self = Self::from_snapshot(&report.snapshot, actor);
        Ok(SaveOutcome::Saved(Box::new(report)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use campus_hub_core::{AccountId, ClubId, DormId};

    use super::*;
    use crate::models::{Campus, Club, Dorm, StorageShape};

    fn snapshot() -> CampusSnapshot {
        CampusSnapshot {
            campus: Campus {
                id: CampusId::new("c1"),
                name: "State".into(),
                short_name: None,
                locations: vec![],
                is_active: true,
                admin_emails: vec![],
                admin_ids: vec![],
                is_university: true,
                logo_url: None,
                shape: StorageShape::Current,
            },
            dorms: vec![Dorm {
                id: DormId::new("d1"),
                name: "Pioneer Hall".into(),
                location_id: None,
                category: "dorm".into(),
                admin_email: None,
            }],
            default_clubs: vec![Club {
                id: ClubId::new("k1"),
                name: "Chess".into(),
                campus_id: CampusId::new("c1"),
                is_default: true,
                category: None,
                description: String::new(),
                admin_emails: vec![],
                admin_ids: vec![],
                member_ids: vec![],
                member_count: 0,
                is_private: false,
                cover_image_url: None,
                created_by: None,
                created_at: None,
            }],
        }
    }

    fn session() -> EditSession {
        EditSession::from_snapshot(&snapshot(), Actor::new(AccountId::new("admin-1")))
    }

    #[test]
    fn test_removing_stored_entries_queues_them() {
        let mut session = session();
        session.remove_dorm("Pioneer Hall").unwrap();
        session.remove_default_club("Chess").unwrap();

        assert_eq!(session.pending().dorms[0].id, DormId::new("d1"));
        assert_eq!(session.pending().default_clubs[0].id, ClubId::new("k1"));
        assert!(session.dorms().is_empty());
    }

    #[test]
    fn test_removing_unsaved_entry_queues_nothing() {
        let mut session = session();
        session.add_dorm(DesiredDorm::new("North Tower"));
        session.remove_dorm("North Tower").unwrap();
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_readding_unqueues_and_keeps_identity() {
        let mut session = session();
        session.remove_dorm("Pioneer Hall").unwrap();
        session.add_dorm(DesiredDorm::new("Pioneer Hall"));

        assert!(session.pending().is_empty());
        assert_eq!(
            session.dorms()[0].identity,
            Identity::Identified(DormId::new("d1"))
        );
    }

    #[test]
    fn test_names_match_exactly() {
        let mut session = session();
        assert!(matches!(
            session.remove_dorm("Pioneer Hall "),
            Err(SessionError::UnknownDorm(_))
        ));

        session.remove_dorm("Pioneer Hall").unwrap();
        session.add_dorm(DesiredDorm::new("Pioneer Hall "));

        assert_eq!(session.pending().dorms.len(), 1);
        assert!(!session.dorms()[0].identity.is_identified());
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let mut session = session();
        assert!(matches!(
            session.remove_dorm("Nowhere"),
            Err(SessionError::UnknownDorm(_))
        ));
        assert!(matches!(
            session.default_club_mut("Nowhere"),
            Err(SessionError::UnknownDefaultClub(_))
        ));
    }
}
