//! Violations reported by configured entry checks.

use thiserror::Error;

/// Reason a configured entry check declined a transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateViolation {
    #[error("entry gate declined")]
    EntryGateDeclined,

    #[error("requirement failed: {message}")]
    RequirementFailed { message: String },
}
