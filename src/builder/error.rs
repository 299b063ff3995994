//! Build errors for the engine builder.

use crate::core::ModeId;
use crate::error::ModeError;
use thiserror::Error;

/// Errors that can occur when building a mode engine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Parent not specified. Call .parent(parent) before .build()")]
    MissingParent,

    #[error("Mode registration failed: {0}")]
    Registration(#[from] ModeError),

    #[error("Initial mode {id} was rejected")]
    InitialRejected { id: ModeId },
}
