use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::arena::Index;
use crate::entity::EntityId;

/// Marker trait for types that can be attached to entities as components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Stable type tag of a component. Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type name, for logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKind {}

impl Hash for ComponentKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKind({})", self.short_name())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Handle to a component instance in the world's component arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) Index);

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-erased component instance plus its bookkeeping.
pub(crate) struct ComponentSlot {
    pub(crate) kind: ComponentKind,
    /// Weak back-reference; validated against the entity arena on use.
    pub(crate) owner: EntityId,
    /// Set exactly once, after the owning system's `create` hook ran.
    pub(crate) initialized: bool,
    /// Queued in the owner's layer and not yet visible to systems.
    pub(crate) pending: bool,
    pub(crate) value: Box<dyn Any + Send + Sync>,
}

impl ComponentSlot {
    pub(crate) fn new<T: Component>(owner: EntityId, value: T) -> Self {
        Self {
            kind: ComponentKind::of::<T>(),
            owner,
            initialized: false,
            pending: true,
            value: Box::new(value),
        }
    }

    pub(crate) fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub(crate) fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    pub(crate) fn into_value<T: Component>(self) -> Option<T> {
        self.value.downcast::<T>().ok().map(|boxed| *boxed)
    }
}
