//! Inspection accounting: emission suppression and the pass/fail session

/// Recency window of emitted composite keys
pub mod dedup;
/// Inspection session state machine
pub mod session;

pub use dedup::{RECENT_CAPACITY, RecentDetections};
pub use session::{
    InspectionOutcome, InspectionSession, InspectionState, InspectionStateMachine, Verdict,
};
