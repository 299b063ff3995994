//! The mode engine: registry, transition protocols, tick dispatch and
//! teardown for one parent object.

use crate::config::{EngineConfig, GateViolation, ModeConfig};
use crate::core::{GateContext, ModeHistory, ModeId, ModeState, Params};
use crate::engine::events::TransitionEvents;
use crate::engine::pool::ModePool;
use crate::engine::registry::{DynMode, ModeKind, ModeProvider, Registry, Slot};
use crate::engine::transition::{
    BeforeTransition, RejectReason, RollbackOutcome, TransitionEvent, TransitionPhase,
    TransitionRejected,
};
use crate::error::{Hook, ModeError, StateError, StateResult};
use std::collections::HashMap;
use std::sync::Arc;
use stillwater::validation::Validation;
use uuid::Uuid;

/// What a transition does to the history stack when it commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HistoryOp {
    Record,
    Skip,
    /// Back-navigation: drop the entry being returned to.
    Pop,
}

impl HistoryOp {
    fn recording(record: bool) -> Self {
        if record {
            HistoryOp::Record
        } else {
            HistoryOp::Skip
        }
    }
}

/// Outcome of the validation steps shared by both transition protocols.
enum Preflight {
    /// Target is already active.
    Noop,
    /// Every check passed; carries the merged parameters.
    Proceed(Params),
    Rejected,
}

/// Finite-state-machine runtime driving a parent through mutually exclusive
/// modes.
///
/// The engine assumes a single driver. Transitions take `&mut self`, so two
/// transitions can never overlap on one engine; an asynchronous transition
/// whose future is dropped mid-flight leaves a non-idle
/// [`TransitionPhase`] that blocks further transitions until
/// [`abort_in_flight`](ModeEngine::abort_in_flight) is called.
///
/// # Example
///
/// ```rust
/// use modeset::core::{ModeId, ModeState, ParentSlot, Params};
/// use modeset::engine::ModeEngine;
/// use std::sync::Arc;
///
/// struct Hero;
///
/// #[derive(Default)]
/// struct Idle {
///     parent: ParentSlot<Hero>,
/// }
///
/// impl ModeState<Hero> for Idle {
///     fn parent(&self) -> &ParentSlot<Hero> {
///         &self.parent
///     }
/// }
///
/// #[derive(Default)]
/// struct Walk {
///     parent: ParentSlot<Hero>,
/// }
///
/// impl ModeState<Hero> for Walk {
///     fn parent(&self) -> &ParentSlot<Hero> {
///         &self.parent
///     }
/// }
///
/// let mut engine = ModeEngine::new(Arc::new(Hero));
/// engine.create::<Idle>(ModeId(0)).unwrap();
/// let walk = engine.register_lazy(Walk::default);
///
/// assert!(engine.select(ModeId(0), Params::new()).unwrap());
/// assert!(engine.select(walk, Params::new()).unwrap());
/// assert_eq!(engine.active(), Some(walk));
///
/// assert!(engine.go_back(Params::new()).unwrap());
/// assert_eq!(engine.active(), Some(ModeId(0)));
/// ```
pub struct ModeEngine<P: Send + Sync + 'static> {
    id: Uuid,
    parent: Arc<P>,
    settings: EngineConfig,
    registry: Registry<P>,
    configs: HashMap<ModeId, ModeConfig>,
    provider: Option<ModeProvider<P>>,
    pool: ModePool<P>,
    history: ModeHistory,
    active: Option<ModeId>,
    previous: Option<ModeId>,
    started: Option<ModeId>,
    phase: TransitionPhase,
    events: TransitionEvents,
    torn_down: bool,
}

impl<P: Send + Sync + 'static> ModeEngine<P> {
    /// Create an engine bound to `parent` with default settings.
    pub fn new(parent: Arc<P>) -> Self {
        Self::with_config(parent, EngineConfig::default())
    }

    pub fn with_config(parent: Arc<P>, settings: EngineConfig) -> Self {
        Self::assemble(parent, settings, None)
    }

    pub(crate) fn assemble(
        parent: Arc<P>,
        settings: EngineConfig,
        provider: Option<ModeProvider<P>>,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(
            engine = %id,
            history_limit = settings.history_limit,
            pool_capacity = settings.pool_capacity,
            "mode engine created"
        );
        Self {
            id,
            parent,
            registry: Registry::new(),
            configs: HashMap::new(),
            provider,
            pool: ModePool::new(settings.pool_capacity),
            history: ModeHistory::with_capacity(settings.history_limit),
            active: None,
            previous: None,
            started: None,
            phase: TransitionPhase::Idle,
            events: TransitionEvents::default(),
            torn_down: false,
            settings,
        }
    }

    /// Register mode `S` eagerly under `id`, built with `S::default()` unless
    /// the provider resolves it.
    pub fn create<S>(&mut self, id: ModeId) -> Result<(), ModeError>
    where
        S: ModeState<P> + Default,
    {
        self.create_with(id, S::default)
    }

    /// Register a mode eagerly under `id`, built by `factory` unless the
    /// provider resolves its type.
    ///
    /// `id` must be the next free identifier: registering an existing
    /// identifier fails, and so does skipping ahead.
    pub fn create_with<S, F>(&mut self, id: ModeId, factory: F) -> Result<(), ModeError>
    where
        S: ModeState<P>,
        F: FnOnce() -> S,
    {
        let size = self.registry.len();
        if id.index() < size {
            return Err(ModeError::AlreadyRegistered { id });
        }
        if id.index() > size {
            return Err(ModeError::NonContiguous { id, size });
        }

        let kind = ModeKind::of::<S>();
        let instance = match self.resolve_from_provider(kind) {
            Some(instance) => instance,
            None => Box::new(factory()) as Box<DynMode<P>>,
        };
        let instance = bind_and_init(&self.parent, id, instance)?;

        self.registry.push(Slot::eager(kind, instance));
        self.torn_down = false;
        tracing::debug!(engine = %self.id, mode = %id, kind = kind.short_name(), "mode created");
        Ok(())
    }

    /// Register a mode whose instance is built on first access. Returns the
    /// identifier allocated for it.
    pub fn register_lazy<S, F>(&mut self, factory: F) -> ModeId
    where
        S: ModeState<P>,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let kind = ModeKind::of::<S>();
        let id = self.registry.push(Slot::lazy(
            kind,
            Box::new(move || Box::new(factory()) as Box<DynMode<P>>),
        ));
        self.torn_down = false;
        tracing::debug!(engine = %self.id, mode = %id, kind = kind.short_name(), "lazy mode registered");
        id
    }

    pub fn register_lazy_default<S>(&mut self) -> ModeId
    where
        S: ModeState<P> + Default,
    {
        self.register_lazy(S::default)
    }

    /// Configuration record for `id`, created on first use.
    ///
    /// Configuring an identifier that is not registered yet is allowed.
    pub fn configure_mode(&mut self, id: ModeId) -> &mut ModeConfig {
        self.configs.entry(id).or_default()
    }

    pub fn set_provider(&mut self, provider: ModeProvider<P>) {
        self.provider = Some(provider);
    }

    /// Subscribe to the cancelable pre-transition notification.
    pub fn on_before_transition<F>(&mut self, handler: F)
    where
        F: FnMut(&mut BeforeTransition<'_>) + Send + 'static,
    {
        self.events.subscribe_before(handler);
    }

    pub fn on_after_transition<F>(&mut self, handler: F)
    where
        F: FnMut(&TransitionEvent<'_>) + Send + 'static,
    {
        self.events.subscribe_after(handler);
    }

    pub fn on_rejected<F>(&mut self, handler: F)
    where
        F: FnMut(&TransitionRejected) + Send + 'static,
    {
        self.events.subscribe_rejected(handler);
    }

    /// Transition to `to`, recording history per the engine settings.
    ///
    /// Returns `Ok(true)` when the transition happened or `to` was already
    /// active, `Ok(false)` when it was rejected. A failing `exit` aborts
    /// before any mutation; a failing `enter` is reported after the engine has
    /// already switched to `to`. Both surface as [`ModeError::Lifecycle`].
    pub fn select(&mut self, to: ModeId, params: Params) -> Result<bool, ModeError> {
        let op = HistoryOp::recording(self.settings.record_history);
        self.transition(to, params, op)
    }

    /// [`select`](ModeEngine::select) with an explicit history choice.
    pub fn select_with(
        &mut self,
        to: ModeId,
        params: Params,
        record_history: bool,
    ) -> Result<bool, ModeError> {
        self.transition(to, params, HistoryOp::recording(record_history))
    }

    /// Return to the most recently remembered mode without recording the mode
    /// being left. Returns `Ok(false)` when history is empty or the
    /// transition is rejected; history is only popped on success.
    pub fn go_back(&mut self, params: Params) -> Result<bool, ModeError> {
        let Some(target) = self.history.peek() else {
            return Ok(false);
        };
        self.transition(target, params, HistoryOp::Pop)
    }

    fn transition(&mut self, to: ModeId, params: Params, op: HistoryOp) -> Result<bool, ModeError> {
        let params = match self.preflight(to, params) {
            Preflight::Noop => {
                if op == HistoryOp::Pop {
                    self.history.pop();
                }
                return Ok(true);
            }
            Preflight::Rejected => return Ok(false),
            Preflight::Proceed(params) => params,
        };

        let from = self.active;
        if let Some(from_id) = from {
            if let Some(current) = self.registry.instance_mut(from_id) {
                current
                    .exit(&params)
                    .map_err(|source| ModeError::lifecycle(from_id, Hook::Exit, source))?;
            }
        }

        self.commit(from, to, op);

        if let Some(target) = self.registry.instance_mut(to) {
            target
                .enter(&params)
                .map_err(|source| ModeError::lifecycle(to, Hook::Enter, source))?;
        }

        self.events.emit_after(from, to, &params);
        Ok(true)
    }

    /// Asynchronous [`select`](ModeEngine::select).
    ///
    /// Never returns an error: a failing `exit_async` is reported as a
    /// rejection with nothing mutated, and a failing `enter_async` rolls back
    /// to the displaced mode before being reported.
    pub async fn select_async(&mut self, to: ModeId, params: Params) -> bool {
        let op = HistoryOp::recording(self.settings.record_history);
        self.transition_async(to, params, op).await
    }

    pub async fn select_with_async(&mut self, to: ModeId, params: Params, record_history: bool) -> bool {
        self.transition_async(to, params, HistoryOp::recording(record_history))
            .await
    }

    pub async fn go_back_async(&mut self, params: Params) -> bool {
        let Some(target) = self.history.peek() else {
            return false;
        };
        self.transition_async(target, params, HistoryOp::Pop).await
    }

    async fn transition_async(&mut self, to: ModeId, params: Params, op: HistoryOp) -> bool {
        let params = match self.preflight(to, params) {
            Preflight::Noop => {
                if op == HistoryOp::Pop {
                    self.history.pop();
                }
                return true;
            }
            Preflight::Rejected => return false,
            Preflight::Proceed(params) => params,
        };

        let from = self.active;
        if let Some(from_id) = from {
            self.phase = TransitionPhase::Exiting { from: from_id, to };
            let exited = match self.registry.instance_mut(from_id) {
                Some(current) => current.exit_async(&params).await,
                None => Ok(()),
            };
            if let Err(err) = exited {
                self.phase = TransitionPhase::Idle;
                tracing::warn!(
                    engine = %self.id,
                    from = %from_id,
                    to = %to,
                    error = %err,
                    "asynchronous exit failed"
                );
                let reason = RejectReason::ExitFailed {
                    message: err.message().to_string(),
                };
                self.reject(from, to, params, reason);
                return false;
            }
        }

        let saved_previous = self.previous;
        let saved_history = self.history.clone();
        self.commit(from, to, op);

        self.phase = TransitionPhase::Entering { from, to };
        let entered = match self.registry.instance_mut(to) {
            Some(target) => target.enter_async(&params).await,
            None => Err(StateError::new("target instance vanished before entry")),
        };

        match entered {
            Ok(()) => {
                self.phase = TransitionPhase::Idle;
                self.events.emit_after(from, to, &params);
                true
            }
            Err(err) => {
                tracing::warn!(
                    engine = %self.id,
                    to = %to,
                    error = %err,
                    "asynchronous enter failed; rolling back"
                );
                let rollback = self
                    .roll_back(from, to, saved_previous, saved_history, &params)
                    .await;
                self.phase = TransitionPhase::Idle;
                let reason = RejectReason::EnterFailed {
                    message: err.message().to_string(),
                    rollback,
                };
                self.reject(from, to, params, reason);
                false
            }
        }
    }

    /// Undo a committed transition whose target failed to enter: restore
    /// active, previous and history, then re-enter the displaced mode. The
    /// failed target is not exited.
    async fn roll_back(
        &mut self,
        from: Option<ModeId>,
        failed: ModeId,
        previous: Option<ModeId>,
        history: ModeHistory,
        params: &Params,
    ) -> RollbackOutcome {
        self.active = from;
        self.previous = previous;
        self.history = history;
        self.started = None;

        let Some(restoring) = from else {
            return RollbackOutcome::NoPrevious;
        };

        self.phase = TransitionPhase::RollingBack { failed, restoring };
        let restored = match self.registry.instance_mut(restoring) {
            Some(state) => state.enter_async(params).await,
            None => Err(StateError::new("displaced instance is no longer materialized")),
        };

        match restored {
            Ok(()) => RollbackOutcome::Restored,
            Err(err) => {
                tracing::warn!(
                    engine = %self.id,
                    mode = %restoring,
                    error = %err,
                    "rollback re-entry failed"
                );
                RollbackOutcome::Failed(err.message().to_string())
            }
        }
    }

    /// Reset a phase left behind by an asynchronous transition whose future
    /// was dropped. Returns the abandoned phase.
    ///
    /// Active, previous and history are left exactly as the dropped
    /// transition left them.
    pub fn abort_in_flight(&mut self) -> TransitionPhase {
        let abandoned = std::mem::take(&mut self.phase);
        if !abandoned.is_idle() {
            tracing::warn!(engine = %self.id, phase = %abandoned, "abandoned in-flight transition");
        }
        abandoned
    }

    /// Every check that runs before mutation, in protocol order. Rejections
    /// fire the rejection notification here.
    fn preflight(&mut self, to: ModeId, params: Params) -> Preflight {
        let from = self.active;

        if !self.phase.is_idle() {
            let phase = self.phase;
            return self.reject(from, to, params, RejectReason::InFlight { phase });
        }

        let size = self.registry.len();
        if to.index() >= size {
            return self.reject(from, to, params, RejectReason::OutOfRange { to, size });
        }

        if from == Some(to) {
            return Preflight::Noop;
        }

        if let Err(err) = self.materialize(to) {
            tracing::warn!(engine = %self.id, mode = %to, error = %err, "target could not be materialized");
            return self.reject(from, to, params, RejectReason::Unresolved { to });
        }

        if self.events.emit_before(from, to, &params) {
            return self.reject(from, to, params, RejectReason::Cancelled);
        }

        let mut params = params;
        let mut violations: Vec<GateViolation> = Vec::new();
        if let Some(config) = self.configs.get(&to) {
            params.merge_defaults(config.defaults());
            let ctx = GateContext::new(from, to, &params);
            if let Validation::Failure(errors) = config.check_entry(&ctx) {
                violations.extend(errors.iter().cloned());
            }
        }
        if !violations.is_empty() {
            return self.reject(from, to, params, RejectReason::EntryGate { violations });
        }

        if let Some(from_id) = from {
            let ctx = GateContext::new(from, to, &params);
            let exit_allowed = self
                .configs
                .get(&from_id)
                .is_none_or(|config| config.check_exit(&ctx));
            if !exit_allowed {
                return self.reject(from, to, params, RejectReason::ExitCondition { from: from_id });
            }

            let current_allows = self
                .registry
                .instance(from_id)
                .is_none_or(|current| current.can_exit(to, &params));
            if !current_allows {
                return self.reject(from, to, params, RejectReason::ExitDeclined { from: from_id });
            }
        }

        let target_allows = self
            .registry
            .instance(to)
            .map(|target| target.can_enter(from, &params));
        match target_allows {
            Some(true) => Preflight::Proceed(params),
            Some(false) => self.reject(from, to, params, RejectReason::EnterDeclined { to }),
            None => self.reject(from, to, params, RejectReason::Unresolved { to }),
        }
    }

    /// The only place active, previous and history change during a
    /// transition, apart from rollback.
    fn commit(&mut self, from: Option<ModeId>, to: ModeId, op: HistoryOp) {
        self.previous = from;
        self.active = Some(to);
        self.started = None;

        match op {
            HistoryOp::Record => {
                if let Some(prev) = from {
                    self.history.push(prev);
                }
            }
            HistoryOp::Pop => {
                self.history.pop();
            }
            HistoryOp::Skip => {}
        }

        tracing::debug!(
            engine = %self.id,
            from = ?from,
            to = %to,
            history = self.history.len(),
            "mode transition committed"
        );
    }

    fn reject(
        &mut self,
        from: Option<ModeId>,
        to: ModeId,
        params: Params,
        reason: RejectReason,
    ) -> Preflight {
        tracing::debug!(engine = %self.id, from = ?from, to = %to, reason = %reason, "mode transition rejected");
        let rejection = TransitionRejected {
            from,
            to,
            params,
            reason,
        };
        self.events.emit_rejected(&rejection);
        Preflight::Rejected
    }

    /// Build the instance for `id` if it is not materialized yet.
    ///
    /// Lazy slots draw from the pool first (resetting the recycled instance
    /// instead of re-running `init`), then the provider, then their factory.
    /// A pooled instance is only reused by the slot it was unloaded from,
    /// unless it opts in to `poolable_across_slots`.
    fn materialize(&mut self, id: ModeId) -> Result<(), ModeError> {
        let slot = self.registry.get(id).ok_or(ModeError::UnknownMode { id })?;
        if slot.is_materialized() {
            return Ok(());
        }
        let kind = slot.kind;

        if let Some(mut recycled) = self.pool.take(kind.type_id, id) {
            recycled.reset_state();
            recycled.parent().bind(Arc::clone(&self.parent));
            if let Some(slot) = self.registry.get_mut(id) {
                slot.instance = Some(recycled);
            }
            tracing::debug!(engine = %self.id, mode = %id, kind = kind.short_name(), "mode reused from pool");
            return Ok(());
        }

        let instance = match self.resolve_from_provider(kind) {
            Some(instance) => instance,
            None => {
                let factory = self
                    .registry
                    .get(id)
                    .and_then(|slot| slot.factory.as_ref())
                    .ok_or(ModeError::Unresolved { id })?;
                factory()
            }
        };
        let instance = bind_and_init(&self.parent, id, instance)?;

        if let Some(slot) = self.registry.get_mut(id) {
            slot.instance = Some(instance);
        }
        tracing::debug!(engine = %self.id, mode = %id, kind = kind.short_name(), "mode materialized");
        Ok(())
    }

    fn resolve_from_provider(&self, kind: ModeKind) -> Option<Box<DynMode<P>>> {
        self.provider
            .as_ref()
            .and_then(|provider| provider.resolve(kind.type_id))
    }

    /// Materialize `id` without activating it.
    pub fn preload_mode(&mut self, id: ModeId) -> Result<(), ModeError> {
        self.materialize(id)
    }

    /// Return the instances of inactive lazy modes to the pool.
    ///
    /// The active mode is never unloaded, nor is any mode still in history
    /// when `keep_history` is set. Eager modes are never unloaded. Returns
    /// the number of instances unloaded.
    pub fn unload_inactive_modes(&mut self, keep_history: bool) -> usize {
        let mut unloaded = 0;
        let mut evicted = Vec::new();

        for (id, slot) in self.registry.iter_mut() {
            if Some(id) == self.active || !slot.is_lazy() {
                continue;
            }
            if keep_history && self.history.contains(id) {
                continue;
            }
            let Some(instance) = slot.instance.take() else {
                continue;
            };
            if let Some(overflow) = self.pool.put(slot.kind.type_id, id, instance) {
                evicted.push((id, overflow));
            }
            unloaded += 1;
        }

        for (id, mut instance) in evicted {
            tracing::debug!(engine = %self.id, mode = %id, "pool full; destroying unloaded instance");
            instance.destroy();
        }

        if unloaded > 0 {
            tracing::debug!(engine = %self.id, unloaded, pooled = self.pool.len(), "inactive modes unloaded");
        }
        unloaded
    }

    pub fn update(&mut self) -> Result<(), ModeError> {
        self.tick(Hook::Update, |state| state.update())
    }

    pub fn late_update(&mut self) -> Result<(), ModeError> {
        self.tick(Hook::LateUpdate, |state| state.late_update())
    }

    pub fn fixed_update(&mut self) -> Result<(), ModeError> {
        self.tick(Hook::FixedUpdate, |state| state.fixed_update())
    }

    pub fn render_gui(&mut self) -> Result<(), ModeError> {
        self.tick(Hook::RenderGui, |state| state.render_gui())
    }

    /// `update` that runs the asynchronous `start` on the first tick after
    /// activation.
    pub async fn update_async(&mut self) -> Result<(), ModeError> {
        let Some(id) = self.active_for_tick()? else {
            return Ok(());
        };
        let needs_start = self.started != Some(id);
        let Some(state) = self.registry.instance_mut(id) else {
            return Ok(());
        };
        if needs_start {
            self.started = Some(id);
            state
                .start_async()
                .await
                .map_err(|source| ModeError::lifecycle(id, Hook::Start, source))?;
        }
        state
            .update()
            .map_err(|source| ModeError::lifecycle(id, Hook::Update, source))
    }

    fn tick<F>(&mut self, hook: Hook, run: F) -> Result<(), ModeError>
    where
        F: FnOnce(&mut DynMode<P>) -> StateResult,
    {
        let Some(id) = self.active_for_tick()? else {
            return Ok(());
        };
        let needs_start = self.started != Some(id);
        let Some(state) = self.registry.instance_mut(id) else {
            return Ok(());
        };
        if needs_start {
            self.started = Some(id);
            state
                .start()
                .map_err(|source| ModeError::lifecycle(id, Hook::Start, source))?;
        }
        run(state).map_err(|source| ModeError::lifecycle(id, hook, source))
    }

    /// Active mode, materialized, or `None` when ticks should be skipped.
    fn active_for_tick(&mut self) -> Result<Option<ModeId>, ModeError> {
        match self.active {
            Some(id) if id.index() < self.registry.len() => {
                self.materialize(id)?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    /// Exit the active mode, destroy every materialized and pooled instance
    /// and clear all tables. Calling it again is a no-op.
    ///
    /// Transition subscribers are kept, so an engine re-armed by registering
    /// new modes after teardown still notifies them.
    pub fn destroy(&mut self) {
        if self.torn_down {
            return;
        }

        let params = Params::new();
        if let Some(id) = self.active {
            if let Some(state) = self.registry.instance_mut(id) {
                if let Err(err) = state.exit(&params) {
                    tracing::warn!(engine = %self.id, mode = %id, error = %err, "exit failed during teardown");
                }
            }
        }

        let mut destroyed = 0;
        for (_, slot) in self.registry.iter_mut() {
            if let Some(mut instance) = slot.instance.take() {
                instance.destroy();
                destroyed += 1;
            }
        }
        for mut instance in self.pool.drain() {
            instance.destroy();
            destroyed += 1;
        }

        self.registry.clear();
        self.configs.clear();
        self.history.clear();
        self.active = None;
        self.previous = None;
        self.started = None;
        self.phase = TransitionPhase::Idle;
        self.torn_down = true;

        tracing::info!(engine = %self.id, destroyed, "mode engine torn down");
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parent(&self) -> &Arc<P> {
        &self.parent
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    pub fn active(&self) -> Option<ModeId> {
        self.active
    }

    pub fn previous(&self) -> Option<ModeId> {
        self.previous
    }

    /// Number of registered identifiers.
    pub fn size(&self) -> usize {
        self.registry.len()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.torn_down
    }

    pub fn is_registered(&self, id: ModeId) -> bool {
        id.index() < self.registry.len()
    }

    pub fn is_lazy(&self, id: ModeId) -> bool {
        self.registry.get(id).is_some_and(Slot::is_lazy)
    }

    pub fn is_materialized(&self, id: ModeId) -> bool {
        self.registry.get(id).is_some_and(Slot::is_materialized)
    }

    /// Materialized instance for `id`, without forcing materialization.
    pub fn mode(&self, id: ModeId) -> Option<&DynMode<P>> {
        self.registry.instance(id)
    }

    pub fn mode_mut(&mut self, id: ModeId) -> Option<&mut DynMode<P>> {
        self.registry.instance_mut(id)
    }

    pub fn config(&self, id: ModeId) -> Option<&ModeConfig> {
        self.configs.get(&id)
    }

    /// Declared priority of `id`. The engine itself never consults it.
    pub fn priority(&self, id: ModeId) -> Option<i32> {
        self.configs.get(&id).map(ModeConfig::priority)
    }

    pub fn history(&self) -> &ModeHistory {
        &self.history
    }

    /// Remembered modes, most recent first.
    pub fn history_modes(&self) -> Vec<ModeId> {
        self.history.modes()
    }

    pub fn peek_history(&self) -> Option<ModeId> {
        self.history.peek()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of retired instances waiting in the pool.
    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of pooled instances of mode type `S`.
    pub fn pooled_of<S: ModeState<P>>(&self) -> usize {
        self.pool.count(ModeKind::of::<S>().type_id)
    }

    #[cfg(feature = "diagnostics")]
    pub fn snapshot(&self) -> crate::snapshot::ModeSnapshot {
        use crate::snapshot::{ModeSnapshot, ModeStatus, SNAPSHOT_VERSION};

        let modes = self
            .registry
            .iter()
            .map(|(id, slot)| ModeStatus {
                id,
                name: slot
                    .instance
                    .as_deref()
                    .map(|state| state.name().to_string())
                    .unwrap_or_else(|| slot.kind.short_name().to_string()),
                lazy: slot.is_lazy(),
                materialized: slot.is_materialized(),
                in_history: self.history.contains(id),
                priority: self.priority(id),
            })
            .collect();

        ModeSnapshot {
            version: SNAPSHOT_VERSION,
            engine_id: self.id,
            taken_at: chrono::Utc::now(),
            active: self.active,
            previous: self.previous,
            history: self.history.modes(),
            modes,
            pooled: self.pool.len(),
            phase: self.phase.to_string(),
        }
    }
}

impl<P: Send + Sync + 'static> Drop for ModeEngine<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Bind the parent and run the one-time `init`.
fn bind_and_init<P: Send + Sync + 'static>(
    parent: &Arc<P>,
    id: ModeId,
    mut instance: Box<DynMode<P>>,
) -> Result<Box<DynMode<P>>, ModeError> {
    instance.parent().bind(Arc::clone(parent));
    instance
        .init()
        .map_err(|source| ModeError::lifecycle(id, Hook::Init, source))?;
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParentSlot;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Hero {
        name: &'static str,
    }

    struct Probe {
        parent: ParentSlot<Hero>,
        label: &'static str,
        log: Log,
        allow_enter: bool,
        allow_exit: bool,
        fail_enter: bool,
        fail_exit: bool,
    }

    impl Probe {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                parent: ParentSlot::new(),
                label,
                log: Arc::clone(log),
                allow_enter: true,
                allow_exit: true,
                fail_enter: false,
                fail_exit: false,
            }
        }

        fn record(&self, what: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.label, what));
        }
    }

    impl ModeState<Hero> for Probe {
        fn parent(&self) -> &ParentSlot<Hero> {
            &self.parent
        }

        fn name(&self) -> &str {
            self.label
        }

        fn init(&mut self) -> StateResult {
            self.record("init");
            Ok(())
        }

        fn enter(&mut self, params: &Params) -> StateResult {
            match params.get_int("speed") {
                Some(speed) => self.record(&format!("enter@{speed}")),
                None => self.record("enter"),
            }
            if self.fail_enter {
                return Err(StateError::new("enter exploded"));
            }
            Ok(())
        }

        fn exit(&mut self, _params: &Params) -> StateResult {
            self.record("exit");
            if self.fail_exit {
                return Err(StateError::new("exit exploded"));
            }
            Ok(())
        }

        fn start(&mut self) -> StateResult {
            self.record("start");
            Ok(())
        }

        fn update(&mut self) -> StateResult {
            self.record("update");
            Ok(())
        }

        fn late_update(&mut self) -> StateResult {
            self.record("late_update");
            Ok(())
        }

        fn fixed_update(&mut self) -> StateResult {
            self.record("fixed_update");
            Ok(())
        }

        fn can_enter(&self, _from: Option<ModeId>, _params: &Params) -> bool {
            self.allow_enter
        }

        fn can_exit(&self, _to: ModeId, _params: &Params) -> bool {
            self.allow_exit
        }

        fn reset_state(&mut self) {
            self.record("reset");
        }

        fn destroy(&mut self) {
            self.record("destroy");
        }
    }

    const IDLE: ModeId = ModeId(0);
    const WALK: ModeId = ModeId(1);
    const ATTACK: ModeId = ModeId(2);

    fn engine_with(log: &Log) -> ModeEngine<Hero> {
        let mut engine = ModeEngine::new(Arc::new(Hero { name: "ayla" }));
        let idle_log = Arc::clone(log);
        engine
            .create_with(IDLE, move || Probe::new("idle", &idle_log))
            .unwrap();
        let walk_log = Arc::clone(log);
        engine
            .create_with(WALK, move || Probe::new("walk", &walk_log))
            .unwrap();
        let attack_log = Arc::clone(log);
        engine.register_lazy(move || Probe::new("attack", &attack_log));
        engine
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn create_rejects_duplicate_and_gaps() {
        let log = Log::default();
        let mut engine = engine_with(&log);

        let dup = engine.create_with(WALK, || Probe::new("dup", &log));
        assert!(matches!(dup, Err(ModeError::AlreadyRegistered { id }) if id == WALK));

        let gap = engine.create_with(ModeId(7), || Probe::new("gap", &log));
        assert!(matches!(gap, Err(ModeError::NonContiguous { size: 3, .. })));
        assert_eq!(engine.size(), 3);
    }

    #[test]
    fn create_binds_parent_and_inits() {
        let log = Log::default();
        let engine = engine_with(&log);

        let idle = engine.mode(IDLE).unwrap();
        assert_eq!(idle.parent().get().unwrap().name, "ayla");
        assert_eq!(entries(&log), vec!["idle:init", "walk:init"]);
    }

    #[test]
    fn lazy_mode_materializes_on_select() {
        let log = Log::default();
        let mut engine = engine_with(&log);

        assert!(engine.is_lazy(ATTACK));
        assert!(!engine.is_materialized(ATTACK));

        assert!(engine.select(ATTACK, Params::new()).unwrap());
        assert!(engine.is_materialized(ATTACK));
        assert!(entries(&log).contains(&"attack:init".to_string()));
    }

    #[test]
    fn select_runs_exit_then_enter() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        log.lock().unwrap().clear();

        assert!(engine.select(WALK, Params::new()).unwrap());

        assert_eq!(entries(&log), vec!["idle:exit", "walk:enter"]);
        assert_eq!(engine.active(), Some(WALK));
        assert_eq!(engine.previous(), Some(IDLE));
        assert_eq!(engine.history_modes(), vec![IDLE]);
    }

    #[test]
    fn self_transition_is_silent_noop() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();

        let fired = Arc::new(Mutex::new(0));
        let before = Arc::clone(&fired);
        engine.on_before_transition(move |_| *before.lock().unwrap() += 1);
        let after = Arc::clone(&fired);
        engine.on_after_transition(move |_| *after.lock().unwrap() += 1);

        assert!(engine.select(IDLE, Params::new()).unwrap());
        assert_eq!(*fired.lock().unwrap(), 0);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn out_of_range_is_rejected() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        let rejections = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rejections);
        engine.on_rejected(move |event| sink.lock().unwrap().push(event.reason.clone()));

        assert!(!engine.select(ModeId(9), Params::new()).unwrap());
        assert_eq!(
            rejections.lock().unwrap().as_slice(),
            &[RejectReason::OutOfRange {
                to: ModeId(9),
                size: 3
            }]
        );
        assert_eq!(engine.active(), None);
    }

    #[test]
    fn cancelled_transition_changes_nothing() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        engine.on_before_transition(|event| {
            if event.to == WALK {
                event.cancel();
            }
        });

        assert!(!engine.select(WALK, Params::new()).unwrap());
        assert_eq!(engine.active(), Some(IDLE));
        assert_eq!(engine.previous(), None);
        assert!(engine.history().is_empty());
        assert!(!entries(&log).contains(&"idle:exit".to_string()));
    }

    #[test]
    fn guards_can_decline() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();

        let mut stubborn = Probe::new("stubborn", &log);
        stubborn.allow_exit = false;
        engine.create_with(ModeId(3), move || stubborn).unwrap();
        let mut picky = Probe::new("picky", &log);
        picky.allow_enter = false;
        engine.create_with(ModeId(4), move || picky).unwrap();

        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        engine.on_rejected(move |event| sink.lock().unwrap().push(event.reason.clone()));

        assert!(!engine.select(ModeId(4), Params::new()).unwrap());
        assert!(engine.select(ModeId(3), Params::new()).unwrap());
        assert!(!engine.select(WALK, Params::new()).unwrap());

        assert_eq!(
            reasons.lock().unwrap().as_slice(),
            &[
                RejectReason::EnterDeclined { to: ModeId(4) },
                RejectReason::ExitDeclined { from: ModeId(3) },
            ]
        );
        assert_eq!(engine.active(), Some(ModeId(3)));
    }

    #[test]
    fn exit_condition_blocks_leaving() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        engine
            .configure_mode(IDLE)
            .exit_condition(|ctx| ctx.params.get_bool("ready") == Some(true));

        assert!(!engine.select(WALK, Params::new()).unwrap());
        assert!(engine
            .select(WALK, Params::new().with("ready", true))
            .unwrap());
    }

    #[test]
    fn defaults_merge_under_caller_params() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.configure_mode(WALK).default_param("speed", 0);

        engine.select(WALK, Params::new().with("speed", 5)).unwrap();
        engine.select(IDLE, Params::new()).unwrap();
        engine.select(WALK, Params::new()).unwrap();

        let entered: Vec<String> = entries(&log)
            .into_iter()
            .filter(|entry| entry.starts_with("walk:enter"))
            .collect();
        assert_eq!(entered, vec!["walk:enter@5", "walk:enter@0"]);
    }

    #[test]
    fn exit_failure_propagates_before_mutation() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        let mut fragile = Probe::new("fragile", &log);
        fragile.fail_exit = true;
        engine.create_with(ModeId(3), move || fragile).unwrap();
        engine.select(ModeId(3), Params::new()).unwrap();

        let err = engine.select(IDLE, Params::new()).unwrap_err();

        assert!(matches!(err, ModeError::Lifecycle { hook: Hook::Exit, .. }));
        assert_eq!(engine.active(), Some(ModeId(3)));
        assert!(engine.history().is_empty());
    }

    #[test]
    fn enter_failure_propagates_after_mutation() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        let mut fragile = Probe::new("fragile", &log);
        fragile.fail_enter = true;
        engine.create_with(ModeId(3), move || fragile).unwrap();
        engine.select(IDLE, Params::new()).unwrap();

        let after = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&after);
        engine.on_after_transition(move |_| *counter.lock().unwrap() += 1);

        let err = engine.select(ModeId(3), Params::new()).unwrap_err();

        assert!(matches!(err, ModeError::Lifecycle { hook: Hook::Enter, .. }));
        assert_eq!(engine.active(), Some(ModeId(3)));
        assert_eq!(engine.previous(), Some(IDLE));
        assert_eq!(engine.history_modes(), vec![IDLE]);
        assert_eq!(*after.lock().unwrap(), 0);
    }

    #[test]
    fn start_fires_once_per_activation() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        log.lock().unwrap().clear();

        engine.update().unwrap();
        engine.late_update().unwrap();
        engine.fixed_update().unwrap();
        engine.update().unwrap();

        assert_eq!(
            entries(&log),
            vec!["idle:start", "idle:update", "idle:late_update", "idle:fixed_update", "idle:update"]
        );

        engine.select(WALK, Params::new()).unwrap();
        engine.select(IDLE, Params::new()).unwrap();
        log.lock().unwrap().clear();
        engine.update().unwrap();
        assert_eq!(entries(&log), vec!["idle:start", "idle:update"]);
    }

    #[test]
    fn ticks_without_active_mode_do_nothing() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        log.lock().unwrap().clear();

        engine.update().unwrap();
        engine.render_gui().unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn go_back_pops_without_pushing() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        engine.select(WALK, Params::new()).unwrap();

        assert!(engine.go_back(Params::new()).unwrap());
        assert_eq!(engine.active(), Some(IDLE));
        assert!(engine.history().is_empty());
        assert!(!engine.go_back(Params::new()).unwrap());
    }

    #[test]
    fn rejected_go_back_keeps_history() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(IDLE, Params::new()).unwrap();
        engine.select(WALK, Params::new()).unwrap();
        engine.configure_mode(IDLE).entry_gate(|_| false);

        assert!(!engine.go_back(Params::new()).unwrap());
        assert_eq!(engine.history_modes(), vec![IDLE]);
        assert_eq!(engine.active(), Some(WALK));
    }

    #[test]
    fn unload_returns_lazy_instances_to_pool_and_reuses_them() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(ATTACK, Params::new()).unwrap();
        engine.select(IDLE, Params::new()).unwrap();

        assert_eq!(engine.unload_inactive_modes(true), 0);
        assert_eq!(engine.unload_inactive_modes(false), 1);
        assert!(!engine.is_materialized(ATTACK));
        assert_eq!(engine.pooled_count(), 1);

        log.lock().unwrap().clear();
        engine.preload_mode(ATTACK).unwrap();

        assert!(engine.is_materialized(ATTACK));
        assert_eq!(engine.pooled_count(), 0);
        assert_eq!(entries(&log), vec!["attack:reset"]);
    }

    #[test]
    fn destroy_exits_active_and_is_idempotent() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.select(WALK, Params::new()).unwrap();
        log.lock().unwrap().clear();

        engine.destroy();
        engine.destroy();

        assert_eq!(entries(&log), vec!["walk:exit", "idle:destroy", "walk:destroy"]);
        assert_eq!(engine.active(), None);
        assert_eq!(engine.size(), 0);
        assert!(engine.is_destroyed());
    }

    #[test]
    fn drop_tears_down() {
        let log = Log::default();
        {
            let _engine = engine_with(&log);
        }
        let entries = entries(&log);
        assert!(entries.contains(&"idle:destroy".to_string()));
        assert!(entries.contains(&"walk:destroy".to_string()));
    }

    #[test]
    fn stuck_phase_blocks_until_aborted() {
        let log = Log::default();
        let mut engine = engine_with(&log);
        engine.phase = TransitionPhase::Exiting {
            from: IDLE,
            to: WALK,
        };

        assert!(!engine.select(WALK, Params::new()).unwrap());
        assert_eq!(
            engine.abort_in_flight(),
            TransitionPhase::Exiting {
                from: IDLE,
                to: WALK
            }
        );
        assert!(engine.select(WALK, Params::new()).unwrap());
    }
}
