//! The contract every mode implements.
//!
//! A mode is a state body owned by the engine. It never holds a reference to
//! the engine itself, only a set-once back-reference to the parent object
//! the engine drives.

use super::params::Params;
use crate::error::StateResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Dense integer handle naming a mode.
///
/// Identifiers are assigned at registration, run contiguously from `0` to
/// `size - 1` and are never reused while the engine is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(pub usize);

impl ModeId {
    pub const fn new(index: usize) -> Self {
        ModeId(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ModeId {
    fn from(index: usize) -> Self {
        ModeId(index)
    }
}

/// Set-once back-reference from a mode to its parent.
///
/// The first [`bind`](ParentSlot::bind) wins; later calls are ignored, so a
/// recycled instance keeps the parent it was first bound to.
pub struct ParentSlot<P> {
    parent: OnceLock<Arc<P>>,
}

impl<P> ParentSlot<P> {
    pub const fn new() -> Self {
        Self {
            parent: OnceLock::new(),
        }
    }

    /// Binds the parent. Returns `false` if a parent was already bound.
    pub fn bind(&self, parent: Arc<P>) -> bool {
        self.parent.set(parent).is_ok()
    }

    pub fn get(&self) -> Option<&Arc<P>> {
        self.parent.get()
    }

    pub fn is_bound(&self) -> bool {
        self.parent.get().is_some()
    }
}

impl<P> Default for ParentSlot<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ParentSlot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentSlot")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Trait implemented by every mode the engine can drive.
///
/// Only [`parent`](ModeState::parent) is required. Every other hook defaults
/// to a no-op, and both guards default to "allow".
///
/// # Lifecycle
///
/// - `init` runs once per instance, right after construction and parent
///   binding. Instances recycled from the pool get `reset_state` instead.
/// - `enter` / `exit` run on every activation and deactivation.
/// - `start` runs once per activation span, on the first tick after `enter`.
/// - `destroy` runs at engine teardown or when the pool evicts the instance.
///
/// # Example
///
/// ```rust
/// use modeset::core::{ModeState, ParentSlot, Params};
/// use modeset::StateResult;
///
/// struct Player {
///     name: String,
/// }
///
/// #[derive(Default)]
/// struct Idle {
///     parent: ParentSlot<Player>,
///     ticks: u32,
/// }
///
/// impl ModeState<Player> for Idle {
///     fn parent(&self) -> &ParentSlot<Player> {
///         &self.parent
///     }
///
///     fn name(&self) -> &str {
///         "Idle"
///     }
///
///     fn update(&mut self) -> StateResult {
///         self.ticks += 1;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ModeState<P>: Send + 'static {
    /// Parent-binding accessor.
    fn parent(&self) -> &ParentSlot<P>;

    /// Display name used in logs and snapshots.
    fn name(&self) -> &str {
        "mode"
    }

    fn init(&mut self) -> StateResult {
        Ok(())
    }

    fn enter(&mut self, _params: &Params) -> StateResult {
        Ok(())
    }

    fn exit(&mut self, _params: &Params) -> StateResult {
        Ok(())
    }

    fn start(&mut self) -> StateResult {
        Ok(())
    }

    /// Asynchronous entry. May suspend, e.g. while loading resources.
    async fn enter_async(&mut self, params: &Params) -> StateResult {
        self.enter(params)
    }

    async fn exit_async(&mut self, params: &Params) -> StateResult {
        self.exit(params)
    }

    async fn start_async(&mut self) -> StateResult {
        self.start()
    }

    fn update(&mut self) -> StateResult {
        Ok(())
    }

    fn late_update(&mut self) -> StateResult {
        Ok(())
    }

    fn fixed_update(&mut self) -> StateResult {
        Ok(())
    }

    /// Immediate-mode rendering hook.
    fn render_gui(&mut self) -> StateResult {
        Ok(())
    }

    /// Whether this mode accepts activation coming from `from`.
    fn can_enter(&self, _from: Option<ModeId>, _params: &Params) -> bool {
        true
    }

    /// Whether this mode lets the engine leave it for `to`.
    fn can_exit(&self, _to: ModeId, _params: &Params) -> bool {
        true
    }

    /// Restores a pooled instance to a fresh-equivalent condition.
    fn reset_state(&mut self) {}

    /// Whether a pooled instance may be reused by another lazy slot of the
    /// same concrete type. Only safe when `reset_state` erases everything the
    /// originating factory put into the instance.
    fn poolable_across_slots(&self) -> bool {
        false
    }

    fn destroy(&mut self) {}
}
