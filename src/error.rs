//! Error types for the mode engine and for state bodies.

use crate::core::ModeId;
use std::fmt;
use thiserror::Error;

/// Failure raised by a state's own lifecycle or tick hook.
///
/// The engine never inspects the message; it only forwards it, either to
/// the caller (synchronous transitions, ticks) or into a rejection
/// notification (asynchronous transitions).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StateError {
    message: String,
}

impl StateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for StateError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for StateError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result type returned by state hooks.
pub type StateResult = Result<(), StateError>;

/// Lifecycle hook that produced a [`StateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Init,
    Enter,
    Exit,
    Start,
    Update,
    LateUpdate,
    FixedUpdate,
    RenderGui,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::Init => "init",
            Hook::Enter => "enter",
            Hook::Exit => "exit",
            Hook::Start => "start",
            Hook::Update => "update",
            Hook::LateUpdate => "late_update",
            Hook::FixedUpdate => "fixed_update",
            Hook::RenderGui => "render_gui",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the mode engine.
///
/// Invalid or declined transitions are not errors: they are reported through
/// the rejection notification and a `false` return.
#[derive(Debug, Error)]
pub enum ModeError {
    #[error("mode {id} is already registered")]
    AlreadyRegistered { id: ModeId },

    #[error("mode {id} would leave a gap after the {size} registered modes")]
    NonContiguous { id: ModeId, size: usize },

    #[error("mode {id} is not registered")]
    UnknownMode { id: ModeId },

    #[error("mode {id} could not be materialized")]
    Unresolved { id: ModeId },

    #[error("mode {mode} failed in {hook}: {source}")]
    Lifecycle {
        mode: ModeId,
        hook: Hook,
        #[source]
        source: StateError,
    },
}

impl ModeError {
    pub(crate) fn lifecycle(mode: ModeId, hook: Hook, source: StateError) -> Self {
        ModeError::Lifecycle { mode, hook, source }
    }

    /// Returns the state-body failure, if this error wraps one.
    pub fn state_error(&self) -> Option<&StateError> {
        match self {
            ModeError::Lifecycle { source, .. } => Some(source),
            _ => None,
        }
    }
}
