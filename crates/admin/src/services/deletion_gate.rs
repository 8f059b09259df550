//! Multi-step confirmation before a save that deletes clubs.
//!
//! A save with queued removals is held at the gate until the administrator
//! acknowledges three prompts in turn:
//!
//! ```text
//! Idle -> ReviewList -> IrreversibleWarning -> FinalWarning -> Confirmed -> Idle
//! ```
//!
//! Cancelling from any prompt returns to `Idle`. The gate never touches the
//! queues itself and its state is never persisted.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::models::PendingDeletions;

/// Where the gate currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GateStage {
    /// No confirmation in progress.
    #[default]
    Idle,
    /// Showing the list of items about to be deleted.
    ReviewList,
    /// Warning that deletion cannot be undone.
    IrreversibleWarning,
    /// Last chance to back out.
    FinalWarning,
    /// Acknowledged; the next save proceeds.
    Confirmed,
}

impl GateStage {
    /// Prompt shown to the administrator at this stage.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Idle | Self::Confirmed => "",
            Self::ReviewList => "The following clubs will be deleted along with their members.",
            Self::IrreversibleWarning => "Deleted clubs cannot be restored.",
            Self::FinalWarning => "Delete these clubs now?",
        }
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ReviewList => "review_list",
            Self::IrreversibleWarning => "irreversible_warning",
            Self::FinalWarning => "final_warning",
            Self::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}

/// What the caller should do after consulting the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the save.
    Proceed,
    /// Show the prompt of this stage and wait.
    Prompt(GateStage),
}

/// Gate errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    /// Advance was called while no prompt was showing.
    #[error("no deletion confirmation is in progress (gate is {0})")]
    NotAwaitingConfirmation(GateStage),
}

/// Deletion confirmation state machine.
#[derive(Debug, Clone, Default)]
pub struct DeletionGate {
    stage: GateStage,
}

impl DeletionGate {
    /// A gate in `Idle`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: GateStage::Idle,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> GateStage {
        self.stage
    }

    /// Consult the gate when a save is requested.
    ///
    /// Nothing queued, or already confirmed, passes through. Otherwise the gate
    /// enters `ReviewList`, or stays on the prompt already showing.
    pub fn on_save(&mut self, pending: &PendingDeletions) -> GateDecision {
        if pending.is_empty() || self.stage == GateStage::Confirmed {
            return GateDecision::Proceed;
        }
        if self.stage == GateStage::Idle {
            self.stage = GateStage::ReviewList;
            debug!(queued = pending.len(), "Save held for deletion confirmation");
        }
        GateDecision::Prompt(self.stage)
    }

    /// Acknowledge the current prompt.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NotAwaitingConfirmation` from `Idle` or `Confirmed`.
    pub fn advance(&mut self) -> Result<GateDecision, GateError> {
        let next = match self.stage {
            GateStage::ReviewList => GateStage::IrreversibleWarning,
            GateStage::IrreversibleWarning => GateStage::FinalWarning,
            GateStage::FinalWarning => GateStage::Confirmed,
            stage @ (GateStage::Idle | GateStage::Confirmed) => {
                return Err(GateError::NotAwaitingConfirmation(stage));
            }
        };
        debug!(from = %self.stage, to = %next, "Deletion gate advanced");
        self.stage = next;
        Ok(if next == GateStage::Confirmed {
            GateDecision::Proceed
        } else {
            GateDecision::Prompt(next)
        })
    }

    /// Back out of the confirmation.
    pub fn cancel(&mut self) {
        if self.stage != GateStage::Idle {
            debug!(from = %self.stage, "Deletion confirmation cancelled");
        }
        self.stage = GateStage::Idle;
    }

    /// Drop the confirmation once the save it authorized has finished,
    /// successfully or not.
    pub fn finish(&mut self) {
        self.stage = GateStage::Idle;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use campus_hub_core::DormId;

    use super::*;
    use crate::models::PendingDorm;

    fn queued() -> PendingDeletions {
        PendingDeletions {
            dorms: vec![PendingDorm {
                id: DormId::new("d1"),
                name: "Pioneer Hall".into(),
            }],
            default_clubs: vec![],
        }
    }

    #[test]
    fn test_nothing_queued_passes_through() {
        let mut gate = DeletionGate::new();
        assert_eq!(
            gate.on_save(&PendingDeletions::default()),
            GateDecision::Proceed
        );
        assert_eq!(gate.stage(), GateStage::Idle);
    }

    #[test]
    fn test_three_acknowledgements_required() {
        let mut gate = DeletionGate::new();
        let pending = queued();

        assert_eq!(
            gate.on_save(&pending),
            GateDecision::Prompt(GateStage::ReviewList)
        );
        assert_eq!(
            gate.advance().unwrap(),
            GateDecision::Prompt(GateStage::IrreversibleWarning)
        );
        assert_eq!(
            gate.advance().unwrap(),
            GateDecision::Prompt(GateStage::FinalWarning)
        );
        assert_eq!(gate.advance().unwrap(), GateDecision::Proceed);
        assert_eq!(gate.stage(), GateStage::Confirmed);
        assert_eq!(gate.on_save(&pending), GateDecision::Proceed);

        gate.finish();
        assert_eq!(gate.stage(), GateStage::Idle);
    }

    #[test]
    fn test_saving_again_does_not_skip_a_prompt() {
        let mut gate = DeletionGate::new();
        let pending = queued();
        gate.on_save(&pending);
        gate.advance().unwrap();

        assert_eq!(
            gate.on_save(&pending),
            GateDecision::Prompt(GateStage::IrreversibleWarning)
        );
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut gate = DeletionGate::new();
        gate.on_save(&queued());
        gate.advance().unwrap();
        gate.cancel();

        assert_eq!(gate.stage(), GateStage::Idle);
        assert_eq!(
            gate.on_save(&queued()),
            GateDecision::Prompt(GateStage::ReviewList)
        );
    }

    #[test]
    fn test_advance_outside_prompt_is_error() {
        let mut gate = DeletionGate::new();
        assert_eq!(
            gate.advance(),
            Err(GateError::NotAwaitingConfirmation(GateStage::Idle))
        );
    }
}
