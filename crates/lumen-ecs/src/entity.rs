use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::arena::Index;
use crate::component::{ComponentId, ComponentKind};
use crate::layer::LayerId;
use crate::render::Renderer;
use crate::world::World;

/// A generational entity handle. Stays `Copy`; resolving it after the entity was compacted
/// away fails instead of aliasing a newer entity in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) Index);

impl EntityId {
    /// Create an entity handle from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self(Index { index, generation })
    }

    /// The slot index of this entity.
    pub fn index(&self) -> u32 {
        self.0.index
    }

    /// The generation of this entity (incremented on reuse).
    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The concrete behavior type an entity was created with. Used by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKind {
    id: TypeId,
    name: &'static str,
}

impl EntityKind {
    pub fn of<B: EntityBehavior>() -> Self {
        Self {
            id: TypeId::of::<B>(),
            name: std::any::type_name::<B>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Per-entity event hooks. Every hook defaults to a no-op, so a kind overrides only what it
/// needs. Component hooks run before the matching entity hook within each phase.
#[allow(unused_variables)]
pub trait EntityBehavior: 'static {
    fn fixed_update_begin(&mut self, world: &mut World, entity: EntityId) {}
    fn fixed_update(&mut self, world: &mut World, entity: EntityId) {}
    fn fixed_update_end(&mut self, world: &mut World, entity: EntityId) {}

    fn update_begin(&mut self, world: &mut World, entity: EntityId) {}
    fn update(&mut self, world: &mut World, entity: EntityId) {}
    fn update_end(&mut self, world: &mut World, entity: EntityId) {}

    fn draw_begin(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {}
    /// Runs after every component of the entity was drawn by its system.
    fn draw(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {}
    fn draw_end(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {}
    /// Screen-space pass, not depth sorted.
    fn draw_gui(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {}

    /// Triggers once, at the moment of destruction, if the entity is enabled.
    fn destroy(&mut self, world: &mut World, entity: EntityId) {}
}

/// Entity record stored in the world arena.
pub struct Entity {
    pub(crate) tag: String,
    pub(crate) kind: Option<EntityKind>,
    pub(crate) depth: i32,
    pub(crate) enabled: bool,
    pub(crate) visible: bool,
    pub(crate) destroyed: bool,
    /// Destroyed while its own behavior was running; the hook fires once that call returns.
    pub(crate) destroy_deferred: bool,
    /// Set once the scheduler merged the entity into the live list.
    pub(crate) live: bool,
    pub(crate) layer: LayerId,
    pub(crate) components: HashMap<ComponentKind, ComponentId>,
    pub(crate) behavior: Option<Box<dyn EntityBehavior>>,
}

impl Entity {
    pub(crate) fn new(layer: LayerId, tag: String, kind: Option<EntityKind>) -> Self {
        Self {
            tag,
            kind,
            depth: 0,
            enabled: true,
            visible: true,
            destroyed: false,
            destroy_deferred: false,
            live: false,
            layer,
            components: HashMap::new(),
            behavior: None,
        }
    }

    /// Human-readable identifier. Not guaranteed to be unique.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    /// Draw ordering key. Higher depth draws earlier.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the entity has been merged into the live list yet.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn component_id(&self, kind: ComponentKind) -> Option<ComponentId> {
        self.components.get(&kind).copied()
    }

    /// Whether event passes should run for this entity.
    pub(crate) fn is_active(&self) -> bool {
        self.enabled && !self.destroyed
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("tag", &self.tag)
            .field("depth", &self.depth)
            .field("enabled", &self.enabled)
            .field("visible", &self.visible)
            .field("destroyed", &self.destroyed)
            .field("layer", &self.layer)
            .field("components", &self.components.len())
            .finish()
    }
}
