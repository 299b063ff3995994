//! Gate predicates for vetoing transitions.
//!
//! Gates are evaluated before any state mutation. They see where the engine
//! is coming from, where it is going and the merged parameters, and
//! nothing else.

use super::params::Params;
use super::state::ModeId;

/// What a gate can observe about the transition being attempted.
#[derive(Clone, Copy, Debug)]
pub struct GateContext<'a> {
    pub from: Option<ModeId>,
    pub to: ModeId,
    pub params: &'a Params,
}

impl<'a> GateContext<'a> {
    pub fn new(from: Option<ModeId>, to: ModeId, params: &'a Params) -> Self {
        Self { from, to, params }
    }
}

/// Predicate that may veto a transition independently of the mode's own
/// `can_enter` / `can_exit`.
///
/// # Example
///
/// ```rust
/// use modeset::core::{GateContext, Guard, ModeId, Params};
///
/// let needs_stamina = Guard::new(|ctx| {
///     ctx.params.get_int("stamina").unwrap_or(0) > 10
/// });
///
/// let params = Params::new().with("stamina", 25);
/// assert!(needs_stamina.check(&GateContext::new(None, ModeId(2), &params)));
///
/// let tired = Params::new().with("stamina", 3);
/// assert!(!needs_stamina.check(&GateContext::new(None, ModeId(2), &tired)));
/// ```
pub struct Guard {
    predicate: Box<dyn Fn(&GateContext<'_>) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate.
    ///
    /// The predicate should be deterministic: the engine may evaluate it once
    /// per transition attempt and expects no side effects.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&GateContext<'_>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Guard that always allows.
    pub fn allow() -> Self {
        Guard::new(|_| true)
    }

    /// Guard that always declines.
    pub fn deny() -> Self {
        Guard::new(|_| false)
    }

    pub fn check(&self, ctx: &GateContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_sees_source_and_target() {
        let guard = Guard::new(|ctx| {
            ctx.from == Some(ModeId(0)) && ctx.to == ModeId(1)
        });
        let params = Params::new();

        assert!(guard.check(&GateContext::new(Some(ModeId(0)), ModeId(1), &params)));
        assert!(!guard.check(&GateContext::new(None, ModeId(1), &params)));
        assert!(!guard.check(&GateContext::new(Some(ModeId(0)), ModeId(2), &params)));
    }

    #[test]
    fn guard_reads_params() {
        let guard = Guard::new(|ctx| ctx.params.get_bool("armed") == Some(true));

        let armed = Params::new().with("armed", true);
        let unarmed = Params::new().with("armed", false);

        assert!(guard.check(&GateContext::new(None, ModeId(0), &armed)));
        assert!(!guard.check(&GateContext::new(None, ModeId(0), &unarmed)));
    }

    #[test]
    fn constant_guards() {
        let params = Params::new();
        let ctx = GateContext::new(None, ModeId(0), &params);

        assert!(Guard::allow().check(&ctx));
        assert!(!Guard::deny().check(&ctx));
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::new(|ctx| ctx.to.index() % 2 == 0);
        let params = Params::new();
        let ctx = GateContext::new(None, ModeId(4), &params);

        assert_eq!(guard.check(&ctx), guard.check(&ctx));
    }
}
