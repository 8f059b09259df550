//! Business logic services for campus configuration.
//!
//! # Services
//!
//! - `club_binding` - Finds or creates the club derived from each dorm and default-club entry
//! - `deletion_gate` - Three-step confirmation before a save deletes clubs
//! - `reconcile` - Ordered, idempotent save pipeline
//! - `session` - Form state between load and save

pub mod club_binding;
pub mod deletion_gate;
pub mod reconcile;
pub mod session;

pub use club_binding::{Binding, ClubBindingResolver, DefaultClubBinding, DormBinding};
pub use deletion_gate::{DeletionGate, GateDecision, GateError, GateStage};
pub use reconcile::{ReconcileReport, ReconcileRequest, ReconcileStats, ReconciliationEngine};
pub use session::{EditSession, SaveOutcome};
