//! Core types shared by the engine and by mode implementations.
//!
//! - The `ModeState` contract and the set-once `ParentSlot`
//! - Typed transition parameters
//! - Gate predicates
//! - The bounded history stack

mod guard;
mod history;
mod params;
mod state;

pub use guard::{GateContext, Guard};
pub use history::{HistoryEntry, ModeHistory};
pub use params::{ParamValue, Params};
pub use state::{ModeId, ModeState, ParentSlot};
