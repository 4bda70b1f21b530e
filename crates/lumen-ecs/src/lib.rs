//! Lumen ECS - Entity Component System with a frame scheduler
//!
//! Entities own at most one component per type and live on layers. Logic lives in one
//! [`System`] per component type; the [`SystemRegistry`] activates systems when components of
//! their type appear and returns them to the pool once they go idle.
//! Entities and components are stored in generational arenas, so stale handles are detected.

mod arena;
mod component;
mod entity;
mod error;
mod layer;
mod query;
mod render;
mod resource;
mod scene;
mod scheduler;
mod system;
mod world;

pub use component::{Component, ComponentId, ComponentKind};
pub use entity::{Entity, EntityBehavior, EntityId, EntityKind};
pub use error::{EcsError, EcsResult};
pub use layer::{Layer, LayerId};
pub use query::EntityFilter;
pub use render::{CommandBuffer, DrawCommand, DrawPass, NullRenderer, Renderer};
pub use resource::Resources;
pub use scene::Scene;
pub use scheduler::Scheduler;
pub use system::{System, SystemRegistry};
pub use world::World;
