use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use crate::component::{ComponentId, ComponentKind};
use crate::entity::EntityId;

/// Index of a layer within its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bucket of entities with per-kind mirrors of their components.
///
/// Newly added components wait in a pending queue until the scheduler flushes it at the start
/// of the next step, so processing never observes a component added in the same step.
pub struct Layer {
    id: LayerId,
    name: String,
    entities: Vec<EntityId>,
    components: HashMap<ComponentKind, Vec<ComponentId>>,
    pending: Vec<(ComponentKind, ComponentId)>,
    depth_dirty: bool,
    depth_order: Vec<EntityId>,
}

impl Layer {
    pub(crate) fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            entities: Vec::new(),
            components: HashMap::new(),
            pending: Vec::new(),
            depth_dirty: false,
            depth_order: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- Entities ----

    pub(crate) fn add_entity(&mut self, entity: EntityId) {
        self.entities.push(entity);
        self.depth_dirty = true;
    }

    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(position) = self.entities.iter().position(|&e| e == entity) else {
            return false;
        };
        self.entities.remove(position);
        self.depth_dirty = true;
        true
    }

    /// Entities attached to this layer, in insertion order.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    // ---- Components ----

    /// Queue a component. It joins the live lists at the next flush.
    pub(crate) fn add_component(&mut self, kind: ComponentKind, component: ComponentId) {
        self.pending.push((kind, component));
    }

    /// Drop a component from the live list and the pending queue.
    pub(crate) fn remove_component(&mut self, kind: ComponentKind, component: ComponentId) -> bool {
        let mut removed = false;
        if let Some(list) = self.components.get_mut(&kind) {
            if let Some(position) = list.iter().position(|&c| c == component) {
                list.remove(position);
                removed = true;
            }
        }
        let queued = self.pending.len();
        self.pending.retain(|&(_, c)| c != component);
        removed || self.pending.len() != queued
    }

    /// Move every pending component into its live list and return what was moved.
    pub(crate) fn flush_pending(&mut self) -> Vec<(ComponentKind, ComponentId)> {
        let flushed = std::mem::take(&mut self.pending);
        for &(kind, component) in &flushed {
            self.components.entry(kind).or_default().push(component);
        }
        flushed
    }

    /// Live components of a kind, in insertion order.
    pub fn components(&self, kind: ComponentKind) -> &[ComponentId] {
        self.components.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Components queued since the last flush.
    pub fn pending(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.pending.iter().map(|&(_, component)| component)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // ---- Depth ordering ----

    pub(crate) fn mark_depth_dirty(&mut self) {
        self.depth_dirty = true;
    }

    pub fn is_depth_dirty(&self) -> bool {
        self.depth_dirty
    }

    /// Entities sorted by descending depth; ties keep insertion order. The cached order is
    /// rebuilt only when a depth or membership change marked it stale.
    pub(crate) fn depth_sorted(&mut self, depth_of: impl Fn(EntityId) -> i32) -> &[EntityId] {
        if self.depth_dirty {
            self.depth_order.clear();
            self.depth_order.extend_from_slice(&self.entities);
            self.depth_order.sort_by_key(|&entity| Reverse(depth_of(entity)));
            self.depth_dirty = false;
        }
        &self.depth_order
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entities", &self.entities.len())
            .field("kinds", &self.components.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
