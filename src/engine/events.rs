//! Subscriber lists for the three transition notifications.

use super::transition::{BeforeTransition, TransitionEvent, TransitionRejected};
use crate::core::{ModeId, Params};

type BeforeHandler = Box<dyn FnMut(&mut BeforeTransition<'_>) + Send>;
type AfterHandler = Box<dyn FnMut(&TransitionEvent<'_>) + Send>;
type RejectedHandler = Box<dyn FnMut(&TransitionRejected) + Send>;

/// Every subscriber is invoked, in subscription order, even after one of
/// them cancels.
#[derive(Default)]
pub(crate) struct TransitionEvents {
    before: Vec<BeforeHandler>,
    after: Vec<AfterHandler>,
    rejected: Vec<RejectedHandler>,
}

impl TransitionEvents {
    pub(crate) fn subscribe_before<F>(&mut self, handler: F)
    where
        F: FnMut(&mut BeforeTransition<'_>) + Send + 'static,
    {
        self.before.push(Box::new(handler));
    }

    pub(crate) fn subscribe_after<F>(&mut self, handler: F)
    where
        F: FnMut(&TransitionEvent<'_>) + Send + 'static,
    {
        self.after.push(Box::new(handler));
    }

    pub(crate) fn subscribe_rejected<F>(&mut self, handler: F)
    where
        F: FnMut(&TransitionRejected) + Send + 'static,
    {
        self.rejected.push(Box::new(handler));
    }

    /// Returns `true` when a subscriber cancelled the transition.
    pub(crate) fn emit_before(&mut self, from: Option<ModeId>, to: ModeId, params: &Params) -> bool {
        let mut event = BeforeTransition::new(from, to, params);
        for handler in &mut self.before {
            handler(&mut event);
        }
        event.is_cancelled()
    }

    pub(crate) fn emit_after(&mut self, from: Option<ModeId>, to: ModeId, params: &Params) {
        let event = TransitionEvent { from, to, params };
        for handler in &mut self.after {
            handler(&event);
        }
    }

    pub(crate) fn emit_rejected(&mut self, event: &TransitionRejected) {
        for handler in &mut self.rejected {
            handler(event);
        }
    }
}
