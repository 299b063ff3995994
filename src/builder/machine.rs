//! Builder for constructing mode engines.

use crate::builder::error::BuildError;
use crate::config::EngineConfig;
use crate::core::{ModeId, ModeState, Params};
use crate::engine::{ModeEngine, ModeProvider};
use crate::error::ModeError;
use std::sync::Arc;

type Registration<P> = Box<dyn FnOnce(&mut ModeEngine<P>) -> Result<(), ModeError>>;

fn registration<P, F>(register: F) -> Registration<P>
where
    P: Send + Sync + 'static,
    F: FnOnce(&mut ModeEngine<P>) -> Result<(), ModeError> + 'static,
{
    Box::new(register)
}

/// Builder for constructing mode engines with a fluent API.
///
/// Modes are registered in call order, so the first `mode`/`lazy` call gets
/// identifier `0`, the next `1`, and so on.
pub struct ModeEngineBuilder<P: Send + Sync + 'static> {
    parent: Option<Arc<P>>,
    config: EngineConfig,
    provider: Option<ModeProvider<P>>,
    registrations: Vec<Registration<P>>,
    initial: Option<ModeId>,
}

impl<P: Send + Sync + 'static> ModeEngineBuilder<P> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            parent: None,
            config: EngineConfig::default(),
            provider: None,
            registrations: Vec::new(),
            initial: None,
        }
    }

    /// Set the parent object (required).
    pub fn parent(mut self, parent: Arc<P>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Replace all engine settings at once.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.config.pool_capacity = capacity;
        self
    }

    pub fn record_history(mut self, record: bool) -> Self {
        self.config.record_history = record;
        self
    }

    /// Consult `provider` before any factory when materializing modes.
    pub fn provider(mut self, provider: ModeProvider<P>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register an eager mode built with `S::default()`.
    pub fn mode<S>(self) -> Self
    where
        S: ModeState<P> + Default,
    {
        self.mode_with(S::default)
    }

    /// Register an eager mode built by `factory`.
    pub fn mode_with<S, F>(mut self, factory: F) -> Self
    where
        S: ModeState<P>,
        F: FnOnce() -> S + 'static,
    {
        self.registrations.push(registration(move |engine: &mut ModeEngine<P>| {
            let id = ModeId(engine.size());
            engine.create_with(id, factory)
        }));
        self
    }

    /// Register a mode built on first access.
    pub fn lazy<S, F>(mut self, factory: F) -> Self
    where
        S: ModeState<P>,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.registrations.push(registration(move |engine: &mut ModeEngine<P>| {
            engine.register_lazy(factory);
            Ok(())
        }));
        self
    }

    pub fn lazy_default<S>(self) -> Self
    where
        S: ModeState<P> + Default,
    {
        self.lazy(S::default)
    }

    /// Select `id` right after registration.
    pub fn initial(mut self, id: ModeId) -> Self {
        self.initial = Some(id);
        self
    }

    /// Build the engine, register every mode and select the initial one.
    /// Returns an error if the parent is missing, a registration fails or
    /// the initial mode is rejected.
    pub fn build(self) -> Result<ModeEngine<P>, BuildError> {
        let parent = self.parent.ok_or(BuildError::MissingParent)?;

        let mut engine = ModeEngine::assemble(parent, self.config, self.provider);
        for register in self.registrations {
            register(&mut engine)?;
        }

        if let Some(id) = self.initial {
            if !engine.select(id, Params::new())? {
                return Err(BuildError::InitialRejected { id });
            }
        }

        Ok(engine)
    }
}

impl<P: Send + Sync + Default + 'static> ModeEngineBuilder<P> {
    /// Use `P::default()` as the parent.
    pub fn default_parent(self) -> Self {
        self.parent(Arc::new(P::default()))
    }
}

impl<P: Send + Sync + 'static> Default for ModeEngineBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParentSlot;
    use crate::error::StateResult;

    #[derive(Default)]
    struct Door {
        label: String,
    }

    #[derive(Default)]
    struct Closed {
        parent: ParentSlot<Door>,
    }

    impl ModeState<Door> for Closed {
        fn parent(&self) -> &ParentSlot<Door> {
            &self.parent
        }

        fn name(&self) -> &str {
            "Closed"
        }
    }

    #[derive(Default)]
    struct Open {
        parent: ParentSlot<Door>,
        provided: bool,
    }

    impl ModeState<Door> for Open {
        fn parent(&self) -> &ParentSlot<Door> {
            &self.parent
        }

        fn name(&self) -> &str {
            if self.provided {
                "Open (provided)"
            } else {
                "Open"
            }
        }
    }

    struct Jammed {
        parent: ParentSlot<Door>,
    }

    impl ModeState<Door> for Jammed {
        fn parent(&self) -> &ParentSlot<Door> {
            &self.parent
        }

        fn init(&mut self) -> StateResult {
            Err("hinge missing".into())
        }
    }

    #[test]
    fn builder_validates_required_fields() {
        let result = ModeEngineBuilder::<Door>::new().mode::<Closed>().build();

        assert!(matches!(result, Err(BuildError::MissingParent)));
    }

    #[test]
    fn fluent_api_builds_engine() {
        let engine = ModeEngineBuilder::new()
            .parent(Arc::new(Door {
                label: "front".to_string(),
            }))
            .history_limit(3)
            .pool_capacity(1)
            .record_history(false)
            .mode::<Closed>()
            .lazy_default::<Open>()
            .initial(ModeId(0))
            .build()
            .unwrap();

        assert_eq!(engine.size(), 2);
        assert_eq!(engine.active(), Some(ModeId(0)));
        assert!(engine.is_lazy(ModeId(1)));
        assert_eq!(engine.settings().history_limit, 3);
        assert!(!engine.settings().record_history);
        assert_eq!(engine.parent().label, "front");
    }

    #[test]
    fn provider_takes_precedence_over_factory() {
        let provider = ModeProvider::new().with(|| Open {
            parent: ParentSlot::new(),
            provided: true,
        });

        let engine = ModeEngineBuilder::new()
            .default_parent()
            .provider(provider)
            .mode::<Closed>()
            .mode::<Open>()
            .build()
            .unwrap();

        assert_eq!(engine.mode(ModeId(1)).unwrap().name(), "Open (provided)");
    }

    #[test]
    fn failing_init_surfaces_as_registration_error() {
        let result = ModeEngineBuilder::new()
            .default_parent()
            .mode_with(|| Jammed {
                parent: ParentSlot::new(),
            })
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Registration(ModeError::Lifecycle { .. }))
        ));
    }

    #[test]
    fn rejected_initial_mode_fails_build() {
        let result = ModeEngineBuilder::<Door>::new()
            .default_parent()
            .mode::<Closed>()
            .initial(ModeId(5))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::InitialRejected { id }) if id == ModeId(5)
        ));
    }
}
