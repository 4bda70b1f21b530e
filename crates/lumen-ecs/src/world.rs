use std::cmp::Reverse;

use lumen_core::FrameTime;
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::component::{Component, ComponentId, ComponentKind, ComponentSlot};
use crate::entity::{Entity, EntityBehavior, EntityId, EntityKind};
use crate::error::{EcsError, EcsResult};
use crate::layer::{Layer, LayerId};
use crate::resource::Resources;
use crate::scene::Scene;

/// The central container. Owns every entity, component, layer, and resource.
///
/// Structural changes made while the scheduler is iterating are buffered: new entities wait
/// in a creation buffer until the next frame, new components wait in their layer's pending
/// queue until the next step, and destroyed entities stay in place until compaction.
pub struct World {
    pub(crate) entities: Arena<Entity>,
    pub(crate) components: Arena<ComponentSlot>,
    scene: Scene,
    /// Entities the event passes iterate.
    live: Vec<EntityId>,
    /// Entities created since the last merge.
    spawned: Vec<EntityId>,
    /// Set by every component removal; read by the registry's purge.
    components_removed: bool,
    resources: Resources,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: Arena::new(),
            components: Arena::new(),
            scene: Scene::new(),
            live: Vec::new(),
            spawned: Vec::new(),
            components_removed: false,
            resources: Resources::new(),
        }
    }

    // ---- Layers ----

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let name = name.into();
        let id = self.scene.add_layer(name.as_str());
        debug!(layer = %id, name = %name, "layer added");
        id
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.scene.layer(id)
    }

    // ---- Entity management ----

    /// Create an entity on a layer. It joins the event passes at the start of the next frame.
    pub fn create_entity(&mut self, layer: LayerId, tag: impl Into<String>) -> EcsResult<EntityId> {
        self.spawn(layer, tag.into(), None)
    }

    /// Create an entity whose hooks are provided by `behavior`.
    pub fn create_entity_with<B: EntityBehavior>(
        &mut self,
        layer: LayerId,
        tag: impl Into<String>,
        behavior: B,
    ) -> EcsResult<EntityId> {
        self.spawn(
            layer,
            tag.into(),
            Some((EntityKind::of::<B>(), Box::new(behavior))),
        )
    }

    fn spawn(
        &mut self,
        layer: LayerId,
        tag: String,
        behavior: Option<(EntityKind, Box<dyn EntityBehavior>)>,
    ) -> EcsResult<EntityId> {
        let Some(target) = self.scene.layer_mut(layer) else {
            return Err(EcsError::UnknownLayer(layer));
        };
        let (kind, behavior) = match behavior {
            Some((kind, behavior)) => (Some(kind), Some(behavior)),
            None => (None, None),
        };
        let mut record = Entity::new(layer, tag, kind);
        record.behavior = behavior;

        let id = EntityId(self.entities.insert(record));
        target.add_entity(id);
        self.spawned.push(id);
        trace!(entity = %id, layer = %layer, "entity created");
        Ok(id)
    }

    pub fn entity(&self, entity: EntityId) -> Option<&Entity> {
        self.entities.get(entity.0)
    }

    /// Whether the handle still refers to an entity. Destroyed entities exist until the
    /// next compaction.
    pub fn exists(&self, entity: EntityId) -> bool {
        self.entities.contains(entity.0)
    }

    /// Number of entities in the arena, including ones not merged yet.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities the event passes iterate this frame.
    pub fn live_entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Entities waiting for the next merge.
    pub fn spawned_entities(&self) -> &[EntityId] {
        &self.spawned
    }

    fn record_mut(&mut self, entity: EntityId) -> EcsResult<&mut Entity> {
        self.entities
            .get_mut(entity.0)
            .ok_or(EcsError::DeadEntity(entity))
    }

    /// Set the draw depth. A changed value marks the owning layer's order stale.
    pub fn set_depth(&mut self, entity: EntityId, depth: i32) -> EcsResult<()> {
        let record = self.record_mut(entity)?;
        if record.depth == depth {
            return Ok(());
        }
        record.depth = depth;
        let layer = record.layer;
        if let Some(layer) = self.scene.layer_mut(layer) {
            layer.mark_depth_dirty();
        }
        Ok(())
    }

    /// Enable or disable fixed-update and update events for an entity.
    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) -> EcsResult<()> {
        self.record_mut(entity)?.enabled = enabled;
        Ok(())
    }

    /// Show or hide an entity in the draw passes.
    pub fn set_visible(&mut self, entity: EntityId, visible: bool) -> EcsResult<()> {
        self.record_mut(entity)?.visible = visible;
        Ok(())
    }

    /// Move an entity and all of its components to another layer.
    ///
    /// Components are queued as pending in the new layer, so they skip the rest of the current
    /// step. Initialized components are not created again.
    pub fn set_layer(&mut self, entity: EntityId, layer: LayerId) -> EcsResult<()> {
        if !self.scene.contains(layer) {
            return Err(EcsError::UnknownLayer(layer));
        }
        let record = self.record_mut(entity)?;
        let old = record.layer;
        if old == layer {
            return Ok(());
        }
        record.layer = layer;
        let mut owned: Vec<(ComponentKind, ComponentId)> = record
            .components
            .iter()
            .map(|(&kind, &id)| (kind, id))
            .collect();
        owned.sort_by_key(|&(_, id)| id);

        if let Some(from) = self.scene.layer_mut(old) {
            for &(kind, id) in &owned {
                from.remove_component(kind, id);
            }
            from.remove_entity(entity);
        }
        if let Some(to) = self.scene.layer_mut(layer) {
            for &(kind, id) in &owned {
                to.add_component(kind, id);
            }
            to.add_entity(entity);
        }
        for &(_, id) in &owned {
            if let Some(slot) = self.components.get_mut(id.0) {
                slot.pending = true;
            }
        }
        if !owned.is_empty() {
            self.components_removed = true;
        }
        debug!(entity = %entity, from = %old, to = %layer, components = owned.len(), "entity moved");
        Ok(())
    }

    /// Mark an entity destroyed and run its `destroy` hook if it is enabled.
    ///
    /// The entity stays in the live list until the next compaction but no further event pass
    /// runs for it. Returns `false` if it was already destroyed or does not exist.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        let Some(record) = self.entities.get_mut(entity.0) else {
            return false;
        };
        if record.destroyed {
            return false;
        }
        record.destroyed = true;
        trace!(entity = %entity, "entity destroyed");
        if !record.enabled {
            return true;
        }
        if record.behavior.is_none() && record.kind.is_some() {
            // The behavior is out running one of its own hooks.
            record.destroy_deferred = true;
            return true;
        }
        self.with_behavior(entity, |behavior, world| behavior.destroy(world, entity));
        true
    }

    // ---- Component management ----

    /// Attach a component. Fails if the entity already owns one of the same type.
    ///
    /// The component is queued in the entity's layer; its system sees it from the next step.
    pub fn add_component<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> EcsResult<ComponentId> {
        let kind = ComponentKind::of::<T>();
        let record = self
            .entities
            .get(entity.0)
            .ok_or(EcsError::DeadEntity(entity))?;
        if record.components.contains_key(&kind) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: kind.short_name(),
            });
        }
        let layer = record.layer;

        let id = ComponentId(self.components.insert(ComponentSlot::new(entity, component)));
        if let Some(record) = self.entities.get_mut(entity.0) {
            record.components.insert(kind, id);
        }
        if let Some(layer) = self.scene.layer_mut(layer) {
            layer.add_component(kind, id);
        }
        Ok(id)
    }

    /// Detach a component and hand it back. `None` if the entity has no such component.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        let id = self.detach(entity, ComponentKind::of::<T>())?;
        self.components.remove(id.0)?.into_value::<T>()
    }

    fn detach(&mut self, entity: EntityId, kind: ComponentKind) -> Option<ComponentId> {
        let record = self.entities.get_mut(entity.0)?;
        let id = record.components.remove(&kind)?;
        let layer = record.layer;
        if let Some(layer) = self.scene.layer_mut(layer) {
            layer.remove_component(kind, id);
        }
        self.components_removed = true;
        Some(id)
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        let id = self.component_id::<T>(entity)?;
        self.components
            .get(id.0)
            .and_then(ComponentSlot::downcast_ref::<T>)
            .ok_or_else(|| missing::<T>(entity))
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let id = self.component_id::<T>(entity)?;
        self.components
            .get_mut(id.0)
            .and_then(ComponentSlot::downcast_mut::<T>)
            .ok_or_else(|| missing::<T>(entity))
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.entities
            .get(entity.0)
            .is_some_and(|record| record.has_kind(ComponentKind::of::<T>()))
    }

    /// Handle of an entity's component of type `T`.
    pub fn component_id<T: Component>(&self, entity: EntityId) -> EcsResult<ComponentId> {
        let record = self
            .entities
            .get(entity.0)
            .ok_or(EcsError::DeadEntity(entity))?;
        record
            .component_id(ComponentKind::of::<T>())
            .ok_or_else(|| missing::<T>(entity))
    }

    /// Every component handle an entity owns, oldest first.
    pub fn components_of(&self, entity: EntityId) -> Vec<ComponentId> {
        let mut ids: Vec<ComponentId> = self
            .entities
            .get(entity.0)
            .map(|record| record.components.values().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    // ---- Component handles ----

    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components.get(id.0)?.downcast_ref::<T>()
    }

    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components.get_mut(id.0)?.downcast_mut::<T>()
    }

    pub fn component_kind(&self, id: ComponentId) -> Option<ComponentKind> {
        self.components.get(id.0).map(|slot| slot.kind)
    }

    /// The entity owning a component, if both are still alive.
    pub fn owner(&self, id: ComponentId) -> Option<EntityId> {
        let owner = self.components.get(id.0)?.owner;
        self.entities.contains(owner.0).then_some(owner)
    }

    /// Whether the owning system's `create` hook has run for this component.
    pub fn is_initialized(&self, id: ComponentId) -> bool {
        self.components.get(id.0).is_some_and(|slot| slot.initialized)
    }

    /// Whether the component is still waiting for the next step's flush.
    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.components.get(id.0).is_some_and(|slot| slot.pending)
    }

    /// Component of type `T` owned by the same entity as `id`.
    pub fn sibling<T: Component>(&self, id: ComponentId) -> Option<&T> {
        let owner = self.owner(id)?;
        self.get_component::<T>(owner).ok()
    }

    pub fn sibling_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        let owner = self.owner(id)?;
        self.get_component_mut::<T>(owner).ok()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // ---- Resources ----

    /// Insert a singleton resource, returning the one it replaced.
    pub fn insert_resource<T: 'static>(&mut self, value: T) -> Option<T> {
        self.resources.insert(value)
    }

    pub fn resource<T: 'static>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    pub fn resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    pub fn remove_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    /// Timing of the frame being processed.
    pub fn frame_time(&self) -> FrameTime {
        self.resources.get::<FrameTime>().copied().unwrap_or_default()
    }

    // ---- Scheduler plumbing ----

    /// Drop destroyed entities from the live list and the creation buffer and return them.
    pub(crate) fn take_destroyed(&mut self) -> Vec<EntityId> {
        let entities = &self.entities;
        let is_gone = |id: &EntityId| entities.get(id.0).map_or(true, |e| e.destroyed);
        let (mut destroyed, kept): (Vec<EntityId>, Vec<EntityId>) =
            self.live.iter().copied().partition(is_gone);
        let (unmerged, waiting): (Vec<EntityId>, Vec<EntityId>) =
            self.spawned.iter().copied().partition(is_gone);
        destroyed.extend(unmerged);
        self.live = kept;
        self.spawned = waiting;
        destroyed
    }

    /// Detach an entity from its layer and free it together with its components.
    pub(crate) fn release(&mut self, entity: EntityId) {
        let Some(record) = self.entities.remove(entity.0) else {
            return;
        };
        if let Some(layer) = self.scene.layer_mut(record.layer) {
            for (&kind, &id) in &record.components {
                layer.remove_component(kind, id);
            }
            layer.remove_entity(entity);
        }
        for id in record.components.values() {
            self.components.remove(id.0);
        }
        if !record.components.is_empty() {
            self.components_removed = true;
        }
    }

    /// Append the creation buffer to the live list.
    pub(crate) fn merge_spawned(&mut self) -> usize {
        let spawned = std::mem::take(&mut self.spawned);
        for id in &spawned {
            if let Some(record) = self.entities.get_mut(id.0) {
                record.live = true;
            }
        }
        let merged = spawned.len();
        self.live.extend(spawned);
        merged
    }

    /// Flush every layer's pending queue into its live lists.
    pub(crate) fn flush_pending(&mut self) -> Vec<(ComponentKind, ComponentId)> {
        let mut flushed = Vec::new();
        for layer in self.scene.layers_mut() {
            flushed.extend(layer.flush_pending());
        }
        for (_, id) in &flushed {
            if let Some(slot) = self.components.get_mut(id.0) {
                slot.pending = false;
            }
        }
        flushed
    }

    pub(crate) fn layer_ids(&self) -> Vec<LayerId> {
        self.scene.layers().iter().map(Layer::id).collect()
    }

    /// Live components of `kind` in `layer` whose owner is enabled and not destroyed.
    pub(crate) fn active_components(&self, layer: LayerId, kind: ComponentKind) -> Vec<ComponentId> {
        let Some(layer) = self.scene.layer(layer) else {
            return Vec::new();
        };
        layer
            .components(kind)
            .iter()
            .copied()
            .filter(|id| {
                self.components
                    .get(id.0)
                    .and_then(|slot| self.entities.get(slot.owner.0))
                    .is_some_and(Entity::is_active)
            })
            .collect()
    }

    /// Live components of `kind` in any layer that were never initialized.
    pub(crate) fn uninitialized_components(&self, kind: ComponentKind) -> Vec<ComponentId> {
        self.scene
            .layers()
            .iter()
            .flat_map(|layer| layer.components(kind).iter().copied())
            .filter(|id| self.components.get(id.0).is_some_and(|slot| !slot.initialized))
            .collect()
    }

    pub(crate) fn mark_initialized(&mut self, id: ComponentId) {
        if let Some(slot) = self.components.get_mut(id.0) {
            slot.initialized = true;
        }
    }

    pub(crate) fn components_removed(&self) -> bool {
        self.components_removed
    }

    #[cfg(test)]
    pub(crate) fn mark_components_removed(&mut self) {
        self.components_removed = true;
    }

    pub(crate) fn clear_components_removed(&mut self) {
        self.components_removed = false;
    }

    /// Whether update passes run for the entity.
    pub(crate) fn is_updatable(&self, entity: EntityId) -> bool {
        self.entities.get(entity.0).is_some_and(Entity::is_active)
    }

    /// Whether draw passes run for the entity.
    pub(crate) fn is_drawable(&self, entity: EntityId) -> bool {
        self.entities
            .get(entity.0)
            .is_some_and(|e| e.visible && !e.destroyed)
    }

    /// Live entities sorted by descending depth. Ties keep layer order, then insertion order.
    pub(crate) fn draw_order(&mut self) -> Vec<EntityId> {
        let entities = &self.entities;
        let depth_of = |id: EntityId| entities.get(id.0).map_or(0, |e| e.depth);
        let mut order = Vec::with_capacity(self.live.len());
        for layer in self.scene.layers_mut() {
            order.extend(
                layer
                    .depth_sorted(depth_of)
                    .iter()
                    .copied()
                    .filter(|id| entities.get(id.0).is_some_and(|e| e.live)),
            );
        }
        // Each layer is already sorted, so this stable sort only merges runs.
        order.sort_by_key(|&id| Reverse(depth_of(id)));
        order
    }

    /// Run `f` with the entity's behavior temporarily taken out of the arena, so the hook
    /// can borrow the world mutably.
    pub(crate) fn with_behavior(
        &mut self,
        entity: EntityId,
        f: impl FnOnce(&mut dyn EntityBehavior, &mut World),
    ) {
        let Some(mut behavior) = self
            .entities
            .get_mut(entity.0)
            .and_then(|record| record.behavior.take())
        else {
            return;
        };
        f(behavior.as_mut(), self);
        let deferred = self
            .entities
            .get_mut(entity.0)
            .is_some_and(|record| std::mem::take(&mut record.destroy_deferred));
        if deferred {
            behavior.destroy(self, entity);
        }
        if let Some(record) = self.entities.get_mut(entity.0) {
            if record.behavior.is_none() {
                record.behavior = Some(behavior);
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn missing<T: Component>(entity: EntityId) -> EcsError {
    EcsError::MissingComponent {
        entity,
        component: ComponentKind::of::<T>().short_name(),
    }
}
