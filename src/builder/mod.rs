//! Builder API for ergonomic engine construction.
//!
//! This module provides a fluent builder for mode engines and the `params!`
//! macro for parameter bags.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::ModeEngineBuilder;

use crate::engine::ModeEngine;

impl<P: Send + Sync + 'static> ModeEngine<P> {
    /// Start building an engine.
    ///
    /// # Example
    ///
    /// ```
    /// use modeset::core::{ModeId, ModeState, ParentSlot};
    /// use modeset::engine::ModeEngine;
    ///
    /// #[derive(Default)]
    /// struct Lamp;
    ///
    /// #[derive(Default)]
    /// struct Off {
    ///     parent: ParentSlot<Lamp>,
    /// }
    ///
    /// impl ModeState<Lamp> for Off {
    ///     fn parent(&self) -> &ParentSlot<Lamp> {
    ///         &self.parent
    ///     }
    /// }
    ///
    /// let engine = ModeEngine::<Lamp>::builder()
    ///     .default_parent()
    ///     .mode::<Off>()
    ///     .initial(ModeId(0))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(engine.active(), Some(ModeId(0)));
    /// ```
    pub fn builder() -> ModeEngineBuilder<P> {
        ModeEngineBuilder::new()
    }
}
