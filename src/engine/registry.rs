//! Identifier-indexed storage of mode instances and their factories.
//!
//! Slots live in a dense `Vec` owned by one engine; identifiers are slot
//! indices. A slot is either eager (its instance was built at registration)
//! or lazy (it keeps a factory and builds its instance on first access).

use crate::core::{ModeId, ModeState};
use std::any::TypeId;
use std::collections::HashMap;

/// Mode object as stored by the engine.
pub type DynMode<P> = dyn ModeState<P>;

/// Boxed constructor for a mode instance.
pub type ModeFactory<P> = Box<dyn Fn() -> Box<DynMode<P>> + Send + Sync>;

/// Concrete type behind a slot, used to key the pool and the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ModeKind {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl ModeKind {
    pub(crate) fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
        }
    }

    /// Type name without its module path.
    pub(crate) fn short_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }
}

pub(crate) struct Slot<P> {
    pub(crate) kind: ModeKind,
    pub(crate) instance: Option<Box<DynMode<P>>>,
    pub(crate) factory: Option<ModeFactory<P>>,
}

impl<P> Slot<P> {
    pub(crate) fn eager(kind: ModeKind, instance: Box<DynMode<P>>) -> Self {
        Self {
            kind,
            instance: Some(instance),
            factory: None,
        }
    }

    pub(crate) fn lazy(kind: ModeKind, factory: ModeFactory<P>) -> Self {
        Self {
            kind,
            instance: None,
            factory: Some(factory),
        }
    }

    pub(crate) fn is_lazy(&self) -> bool {
        self.factory.is_some()
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.instance.is_some()
    }
}

pub(crate) struct Registry<P> {
    slots: Vec<Slot<P>>,
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn next_id(&self) -> ModeId {
        ModeId(self.slots.len())
    }

    pub(crate) fn push(&mut self, slot: Slot<P>) -> ModeId {
        let id = self.next_id();
        self.slots.push(slot);
        id
    }

    pub(crate) fn get(&self, id: ModeId) -> Option<&Slot<P>> {
        self.slots.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: ModeId) -> Option<&mut Slot<P>> {
        self.slots.get_mut(id.index())
    }

    pub(crate) fn instance(&self, id: ModeId) -> Option<&DynMode<P>> {
        self.get(id).and_then(|slot| slot.instance.as_deref())
    }

    pub(crate) fn instance_mut(&mut self, id: ModeId) -> Option<&mut DynMode<P>> {
        self.get_mut(id).and_then(|slot| slot.instance.as_deref_mut())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ModeId, &Slot<P>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (ModeId(index), slot))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ModeId, &mut Slot<P>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(index, slot)| (ModeId(index), slot))
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Resolves concrete mode types to constructors.
///
/// When present on an engine, the provider is asked first whenever a mode
/// is constructed; the factory supplied at registration is the fallback.
///
/// # Example
///
/// ```rust
/// use modeset::core::{ModeState, ParentSlot};
/// use modeset::engine::ModeProvider;
///
/// struct Game;
///
/// #[derive(Default)]
/// struct Menu {
///     parent: ParentSlot<Game>,
///     title: String,
/// }
///
/// impl ModeState<Game> for Menu {
///     fn parent(&self) -> &ParentSlot<Game> {
///         &self.parent
///     }
/// }
///
/// let provider = ModeProvider::<Game>::new().with(|| Menu {
///     title: "Main".to_string(),
///     ..Menu::default()
/// });
/// assert!(provider.provides::<Menu>());
/// ```
pub struct ModeProvider<P> {
    constructors: HashMap<TypeId, ModeFactory<P>>,
}

impl<P> ModeProvider<P> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register the constructor used for mode type `S`.
    pub fn register<S, F>(&mut self, constructor: F) -> &mut Self
    where
        S: ModeState<P>,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.constructors.insert(
            TypeId::of::<S>(),
            Box::new(move || Box::new(constructor()) as Box<DynMode<P>>),
        );
        self
    }

    /// Builder-style [`register`](ModeProvider::register).
    pub fn with<S, F>(mut self, constructor: F) -> Self
    where
        S: ModeState<P>,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.register(constructor);
        self
    }

    pub fn provides<S: 'static>(&self) -> bool {
        self.constructors.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub(crate) fn resolve(&self, type_id: TypeId) -> Option<Box<DynMode<P>>> {
        self.constructors.get(&type_id).map(|constructor| constructor())
    }
}

impl<P> Default for ModeProvider<P> {
    fn default() -> Self {
        Self::new()
    }
}
