//! The transition engine and its supporting tables.
//!
//! [`ModeEngine`] owns every mode instance registered for one parent, drives
//! the synchronous and asynchronous transition protocols, dispatches ticks to
//! the active mode and tears everything down on [`ModeEngine::destroy`].

mod events;
pub mod machine;
mod pool;
pub mod registry;
pub mod transition;

pub use machine::ModeEngine;
pub use registry::{DynMode, ModeFactory, ModeProvider};
pub use transition::{
    BeforeTransition, RejectReason, RollbackOutcome, TransitionEvent, TransitionPhase,
    TransitionRejected,
};
