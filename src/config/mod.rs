//! Configuration for the engine and for individual modes.
//!
//! Entry checks use Stillwater's `Validation` type so that a declined
//! transition reports every failed check, not just the first one.
//!
//! # Example
//!
//! ```rust
//! use modeset::config::ModeConfig;
//! use modeset::core::{GateContext, ModeId, Params};
//!
//! let mut attack = ModeConfig::new();
//! attack
//!     .default_param("combo", 0)
//!     .entry_gate(|ctx| ctx.params.get_bool("armed") == Some(true))
//!     .set_priority(10);
//!
//! let params = Params::new().with("armed", true);
//! let ctx = GateContext::new(Some(ModeId(0)), ModeId(2), &params);
//! assert!(attack.check_entry(&ctx).is_success());
//! ```

pub mod engine;
pub mod mode;
pub mod violations;

pub use engine::EngineConfig;
pub use mode::{EntryCheck, ModeConfig};
pub use violations::GateViolation;
