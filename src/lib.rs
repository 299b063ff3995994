//! Modeset: a mode (state) management engine
//!
//! Modeset drives an owning object, the parent, through a set of mutually
//! exclusive modes. Each mode is a state body implementing [`ModeState`];
//! the [`ModeEngine`] owns every instance, validates transitions in a fixed
//! order, keeps a bounded history for back-navigation and routes per-frame
//! ticks to the active mode.
//!
//! # Core Concepts
//!
//! - **Modes**: state bodies registered under dense [`ModeId`]s, built
//!   eagerly or lazily on first access
//! - **Transitions**: synchronous or asynchronous, vetoable by subscribers,
//!   entry gates, exit conditions and the modes' own guards
//! - **History**: bounded stack of previously active modes for `go_back`
//! - **Pooling**: unloaded lazy instances are recycled instead of rebuilt
//!
//! # Example
//!
//! ```rust
//! use modeset::core::{ModeId, ModeState, ParentSlot, Params};
//! use modeset::{params, ModeEngine, StateResult};
//! use std::sync::Arc;
//!
//! struct Hero {
//!     stamina: u32,
//! }
//!
//! #[derive(Default)]
//! struct Idle {
//!     parent: ParentSlot<Hero>,
//! }
//!
//! impl ModeState<Hero> for Idle {
//!     fn parent(&self) -> &ParentSlot<Hero> {
//!         &self.parent
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Run {
//!     parent: ParentSlot<Hero>,
//!     speed: i64,
//! }
//!
//! impl ModeState<Hero> for Run {
//!     fn parent(&self) -> &ParentSlot<Hero> {
//!         &self.parent
//!     }
//!
//!     fn enter(&mut self, params: &Params) -> StateResult {
//!         self.speed = params.get_int("speed").unwrap_or(1);
//!         Ok(())
//!     }
//!
//!     fn can_enter(&self, _from: Option<ModeId>, _params: &Params) -> bool {
//!         self.parent.get().is_some_and(|hero| hero.stamina > 0)
//!     }
//! }
//!
//! let mut engine = ModeEngine::new(Arc::new(Hero { stamina: 3 }));
//! engine.create::<Idle>(ModeId(0)).unwrap();
//! let run = engine.register_lazy_default::<Run>();
//!
//! engine.select(ModeId(0), Params::new()).unwrap();
//! assert!(engine.select(run, params! { "speed" => 4 }).unwrap());
//! assert_eq!(engine.history_modes(), vec![ModeId(0)]);
//!
//! engine.update().unwrap();
//! assert!(engine.go_back(Params::new()).unwrap());
//! assert_eq!(engine.active(), Some(ModeId(0)));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;

#[cfg(feature = "diagnostics")]
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, ModeEngineBuilder};
pub use config::{EngineConfig, GateViolation, ModeConfig};
pub use crate::core::{GateContext, ModeId, ModeState, ParamValue, Params, ParentSlot};
pub use engine::{ModeEngine, ModeProvider, RejectReason, TransitionPhase, TransitionRejected};
pub use error::{Hook, ModeError, StateError, StateResult};

#[cfg(feature = "diagnostics")]
pub use snapshot::{ModeSnapshot, ModeStatus};
