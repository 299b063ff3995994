//! Per-mode configuration: default parameters, entry checks, an exit
//! condition and a priority tag.

use crate::config::violations::GateViolation;
use crate::core::{GateContext, Guard, ParamValue, Params};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Type alias for entry check functions
pub type EntryCheck =
    Box<dyn Fn(&GateContext<'_>) -> Validation<(), NonEmptyVec<GateViolation>> + Send + Sync>;

/// Configuration record for one mode.
///
/// Obtained from `ModeEngine::configure_mode`, which creates it on first use.
/// Setters return `&mut Self` so calls can be chained.
///
/// Entry checks (the entry gate plus every `require`) are all evaluated and
/// their violations accumulated, so a rejection reports every reason at once.
/// The priority is recorded for callers that arbitrate between modes; the
/// transition protocol never reads it.
#[derive(Default)]
pub struct ModeConfig {
    default_params: Params,
    entry_gate: Option<Guard>,
    entry_checks: Vec<EntryCheck>,
    exit_condition: Option<Guard>,
    priority: i32,
}

impl ModeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default parameter merged under caller-supplied values.
    pub fn default_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.default_params.insert(key, value);
        self
    }

    /// Add several default parameters; later values replace earlier defaults
    /// with the same key.
    pub fn default_params(&mut self, params: Params) -> &mut Self {
        for (key, value) in params.iter() {
            self.default_params.insert(key, value.clone());
        }
        self
    }

    /// Set the entry gate predicate.
    pub fn entry_gate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&GateContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.entry_gate = Some(Guard::new(predicate));
        self
    }

    /// Add a named entry requirement.
    pub fn require<F>(&mut self, predicate: F, message: impl Into<String>) -> &mut Self
    where
        F: Fn(&GateContext<'_>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.require_with(move |ctx| {
            if predicate(ctx) {
                Validation::success(())
            } else {
                Validation::fail(GateViolation::RequirementFailed {
                    message: message.clone(),
                })
            }
        })
    }

    /// Add a custom entry check that may report several violations.
    pub fn require_with<F>(&mut self, check: F) -> &mut Self
    where
        F: Fn(&GateContext<'_>) -> Validation<(), NonEmptyVec<GateViolation>> + Send + Sync + 'static,
    {
        self.entry_checks.push(Box::new(check));
        self
    }

    /// Set the condition that must hold to leave this mode.
    pub fn exit_condition<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&GateContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.exit_condition = Some(Guard::new(predicate));
        self
    }

    pub fn set_priority(&mut self, priority: i32) -> &mut Self {
        self.priority = priority;
        self
    }

    pub fn defaults(&self) -> &Params {
        &self.default_params
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn has_entry_gate(&self) -> bool {
        self.entry_gate.is_some()
    }

    pub fn has_exit_condition(&self) -> bool {
        self.exit_condition.is_some()
    }

    /// Evaluate every entry check, accumulating ALL violations.
    pub fn check_entry(&self, ctx: &GateContext<'_>) -> Validation<(), NonEmptyVec<GateViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<GateViolation>>> = Vec::new();

        if let Some(gate) = &self.entry_gate {
            let check = if gate.check(ctx) {
                Validation::success(())
            } else {
                Validation::fail(GateViolation::EntryGateDeclined)
            };
            checks.push(check);
        }

        for check_fn in &self.entry_checks {
            checks.push(check_fn(ctx));
        }

        if checks.is_empty() {
            return Validation::success(());
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Whether the exit condition, if any, lets the engine leave this mode.
    pub fn check_exit(&self, ctx: &GateContext<'_>) -> bool {
        self.exit_condition
            .as_ref()
            .is_none_or(|condition| condition.check(ctx))
    }
}

impl std::fmt::Debug for ModeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeConfig")
            .field("default_params", &self.default_params)
            .field("entry_gate", &self.entry_gate.is_some())
            .field("entry_checks", &self.entry_checks.len())
            .field("exit_condition", &self.exit_condition.is_some())
            .field("priority", &self.priority)
            .finish()
    }
}
