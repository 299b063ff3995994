//! Transition bookkeeping: phases, rejection reasons and event payloads.

use crate::config::GateViolation;
use crate::core::{ModeId, Params};
use std::fmt;
use thiserror::Error;

/// Where the engine is in the transition protocol.
///
/// Synchronous transitions run start to finish inside one call and never
/// leave the engine outside `Idle`. Asynchronous transitions pass through
/// `Exiting` and `Entering`, and through `RollingBack` when entry fails.
/// A non-idle phase outside a running transition means its future was
/// dropped mid-flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    #[default]
    Idle,

    /// Awaiting the current mode's asynchronous exit. Nothing mutated yet.
    Exiting { from: ModeId, to: ModeId },

    /// Active/previous/history already updated; awaiting the target's entry.
    Entering { from: Option<ModeId>, to: ModeId },

    /// Target entry failed; re-entering the displaced mode.
    RollingBack { failed: ModeId, restoring: ModeId },
}

impl TransitionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, TransitionPhase::Idle)
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPhase::Idle => write!(f, "idle"),
            TransitionPhase::Exiting { from, to } => write!(f, "exiting {from} for {to}"),
            TransitionPhase::Entering { from: Some(from), to } => {
                write!(f, "entering {to} from {from}")
            }
            TransitionPhase::Entering { from: None, to } => write!(f, "entering {to}"),
            TransitionPhase::RollingBack { failed, restoring } => {
                write!(f, "rolling back from {failed} to {restoring}")
            }
        }
    }
}

/// Result of re-entering the displaced mode after a failed asynchronous entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The previous mode was re-entered and is active again.
    Restored,
    /// There was no previous mode; the engine has no active mode.
    NoPrevious,
    /// The previous mode is active again but its re-entry failed too.
    Failed(String),
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::Restored => write!(f, "previous mode restored"),
            RollbackOutcome::NoPrevious => write!(f, "no previous mode to restore"),
            RollbackOutcome::Failed(message) => write!(f, "rollback failed: {message}"),
        }
    }
}

/// Why a transition did not happen.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RejectReason {
    #[error("mode {to} is out of range (size {size})")]
    OutOfRange { to: ModeId, size: usize },

    #[error("mode {to} could not be resolved")]
    Unresolved { to: ModeId },

    #[error("cancelled")]
    Cancelled,

    #[error("entry gate declined: {}", join_violations(.violations))]
    EntryGate { violations: Vec<GateViolation> },

    #[error("exit condition of mode {from} declined")]
    ExitCondition { from: ModeId },

    #[error("mode {from} refused to exit")]
    ExitDeclined { from: ModeId },

    #[error("mode {to} refused to enter")]
    EnterDeclined { to: ModeId },

    #[error("another transition is in flight ({phase})")]
    InFlight { phase: TransitionPhase },

    #[error("exit failed: {message}")]
    ExitFailed { message: String },

    #[error("enter failed: {message} ({rollback})")]
    EnterFailed {
        message: String,
        rollback: RollbackOutcome,
    },
}

fn join_violations(violations: &[GateViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cancelable notification raised before any mutation.
#[derive(Debug)]
pub struct BeforeTransition<'a> {
    pub from: Option<ModeId>,
    pub to: ModeId,
    pub params: &'a Params,
    cancelled: bool,
}

impl<'a> BeforeTransition<'a> {
    pub(crate) fn new(from: Option<ModeId>, to: ModeId, params: &'a Params) -> Self {
        Self {
            from,
            to,
            params,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Notification raised after a completed transition.
#[derive(Clone, Copy, Debug)]
pub struct TransitionEvent<'a> {
    pub from: Option<ModeId>,
    pub to: ModeId,
    pub params: &'a Params,
}

/// Notification raised for every rejected transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionRejected {
    pub from: Option<ModeId>,
    pub to: ModeId,
    pub params: Params,
    pub reason: RejectReason,
}
