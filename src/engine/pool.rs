//! Recycling store for unloaded mode instances, keyed by concrete type.

use super::registry::DynMode;
use crate::core::ModeId;
use std::any::TypeId;
use std::collections::{HashMap, VecDeque};

/// A retired instance and the slot it was unloaded from.
struct Retired<P> {
    origin: ModeId,
    instance: Box<DynMode<P>>,
}

pub(crate) struct ModePool<P> {
    queues: HashMap<TypeId, VecDeque<Retired<P>>>,
    capacity: usize,
}

impl<P: Send + Sync + 'static> ModePool<P> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queues: HashMap::new(),
            capacity,
        }
    }

    /// Retire an instance. Returns it back if its type's queue is full; the
    /// caller is responsible for destroying what comes back.
    pub(crate) fn put(
        &mut self,
        type_id: TypeId,
        origin: ModeId,
        instance: Box<DynMode<P>>,
    ) -> Option<Box<DynMode<P>>> {
        let queue = self.queues.entry(type_id).or_default();
        if queue.len() >= self.capacity {
            return Some(instance);
        }
        queue.push_back(Retired { origin, instance });
        None
    }

    /// Oldest retired instance of the given type for slot `slot`.
    ///
    /// An instance unloaded from `slot` itself wins. Instances from other
    /// slots are only handed out when they opt in through
    /// `ModeState::poolable_across_slots`.
    pub(crate) fn take(&mut self, type_id: TypeId, slot: ModeId) -> Option<Box<DynMode<P>>> {
        let queue = self.queues.get_mut(&type_id)?;
        let position = queue
            .iter()
            .position(|retired| retired.origin == slot)
            .or_else(|| {
                queue
                    .iter()
                    .position(|retired| retired.instance.poolable_across_slots())
            })?;
        queue.remove(position).map(|retired| retired.instance)
    }

    pub(crate) fn count(&self, type_id: TypeId) -> usize {
        self.queues.get(&type_id).map_or(0, VecDeque::len)
    }

    pub(crate) fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub(crate) fn drain(&mut self) -> Vec<Box<DynMode<P>>> {
        self.queues
            .drain()
            .flat_map(|(_, queue)| queue.into_iter())
            .map(|retired| retired.instance)
            .collect()
    }
}
