use std::any::TypeId;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::component::{ComponentId, ComponentKind};
use crate::entity::EntityId;
use crate::error::{EcsError, EcsResult};
use crate::render::Renderer;
use crate::world::World;

/// Logic bound to exactly one component type.
///
/// Systems keep no per-component state; everything lives in the components, reached through
/// the world with the handles each hook receives.
#[allow(unused_variables)]
pub trait System: 'static {
    /// The component type this system processes.
    fn component_kind(&self) -> ComponentKind;

    /// Ordering key in the active set. Lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Runs exactly once per component, at the first step begin after it was added.
    fn create(&mut self, world: &mut World, component: ComponentId) {}

    /// Runs once per fixed pass and layer with the enabled-owner components of that layer.
    fn fixed_update(&mut self, world: &mut World, components: &[ComponentId]) {}

    /// Runs once per frame and layer with the enabled-owner components of that layer.
    fn update(&mut self, world: &mut World, components: &[ComponentId]) {}

    /// Runs inside the owning entity's draw, in depth order.
    fn draw(&mut self, world: &mut World, renderer: &mut dyn Renderer, component: ComponentId) {}

    /// Runs when the owning entity is compacted away, for initialized components only.
    fn destroy(&mut self, world: &mut World, component: ComponentId) {}
}

struct SystemEntry {
    system: Box<dyn System>,
    type_id: TypeId,
    name: &'static str,
    priority: i32,
    /// Registration order, the tie-breaker for equal priorities.
    order: usize,
    /// Whether an update saw a non-empty component list this step.
    used: bool,
    /// Enabled by hand; exempt from the purge.
    forced: bool,
    /// Create any component of this kind that was flushed while the system was pooled.
    init_sweep: bool,
}

/// Pool of every registered system plus the active, priority-ordered subset.
///
/// With auto-management on, a system joins the active set when a component of its type is
/// flushed, and leaves it at the end of a step in which it processed nothing, provided a
/// component removal happened since the last purge.
pub struct SystemRegistry {
    pool: HashMap<ComponentKind, SystemEntry>,
    active: Vec<ComponentKind>,
    auto_management: bool,
    purge_requested: bool,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            pool: HashMap::new(),
            active: Vec::new(),
            auto_management: true,
            purge_requested: false,
        }
    }

    // ---- Registration ----

    /// Add a system to the pool. It stays pooled until activated.
    pub fn register<S: System>(&mut self, system: S) -> EcsResult<()> {
        let kind = system.component_kind();
        if self.pool.contains_key(&kind) {
            return Err(EcsError::DuplicateSystem(kind.short_name()));
        }
        let name = system.name();
        debug!(system = name, component = %kind, "system registered");
        self.pool.insert(
            kind,
            SystemEntry {
                type_id: TypeId::of::<S>(),
                name,
                priority: system.priority(),
                order: self.pool.len(),
                used: false,
                forced: false,
                init_sweep: false,
                system: Box::new(system),
            },
        );
        Ok(())
    }

    pub fn register_default<S: System + Default>(&mut self) -> EcsResult<()> {
        self.register(S::default())
    }

    // ---- Inspection ----

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_registered<S: System>(&self) -> bool {
        self.kind_of_type(TypeId::of::<S>()).is_some()
    }

    pub fn is_active<S: System>(&self) -> bool {
        self.kind_of_type(TypeId::of::<S>())
            .is_some_and(|kind| self.is_kind_active(kind))
    }

    pub fn is_kind_active(&self, kind: ComponentKind) -> bool {
        self.active.contains(&kind)
    }

    /// Whether the system was enabled by hand and is exempt from the purge.
    pub fn is_forced<S: System>(&self) -> bool {
        self.kind_of_type(TypeId::of::<S>())
            .and_then(|kind| self.pool.get(&kind))
            .is_some_and(|entry| entry.forced)
    }

    /// Names of the active systems in execution order.
    pub fn active_systems(&self) -> Vec<&'static str> {
        self.active
            .iter()
            .filter_map(|kind| self.pool.get(kind))
            .map(|entry| entry.name)
            .collect()
    }

    pub fn auto_management(&self) -> bool {
        self.auto_management
    }

    /// Toggle auto-management. The next step end re-evaluates every active system.
    pub fn set_auto_management(&mut self, enabled: bool) {
        self.auto_management = enabled;
        self.purge_requested = true;
    }

    fn kind_of_type(&self, type_id: TypeId) -> Option<ComponentKind> {
        self.pool
            .iter()
            .find(|(_, entry)| entry.type_id == type_id)
            .map(|(&kind, _)| kind)
    }

    fn kind_of_name(&self, name: &str) -> EcsResult<ComponentKind> {
        self.pool
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(&kind, _)| kind)
            .ok_or_else(|| EcsError::UnknownSystemType(name.to_string()))
    }

    // ---- Manual control ----

    /// Activate a system regardless of component population and exempt it from the purge.
    /// Returns `false` if no such system is registered.
    pub fn enable_system<S: System>(&mut self) -> bool {
        match self.kind_of_type(TypeId::of::<S>()) {
            Some(kind) => {
                self.force_enable(kind);
                true
            }
            None => {
                debug!(system = std::any::type_name::<S>(), "enable ignored: not registered");
                false
            }
        }
    }

    /// Return a system to the pool. Returns `false` if no such system is registered.
    pub fn disable_system<S: System>(&mut self) -> bool {
        match self.kind_of_type(TypeId::of::<S>()) {
            Some(kind) => {
                self.deactivate(kind);
                true
            }
            None => {
                debug!(system = std::any::type_name::<S>(), "disable ignored: not registered");
                false
            }
        }
    }

    pub fn enable_system_by_name(&mut self, name: &str) -> EcsResult<()> {
        let kind = self.kind_of_name(name)?;
        self.force_enable(kind);
        Ok(())
    }

    pub fn disable_system_by_name(&mut self, name: &str) -> EcsResult<()> {
        let kind = self.kind_of_name(name)?;
        self.deactivate(kind);
        Ok(())
    }

    fn force_enable(&mut self, kind: ComponentKind) {
        if let Some(entry) = self.pool.get_mut(&kind) {
            entry.forced = true;
        }
        self.activate(kind);
    }

    fn activate(&mut self, kind: ComponentKind) -> bool {
        if self.active.contains(&kind) {
            return false;
        }
        let Some(entry) = self.pool.get_mut(&kind) else {
            return false;
        };
        entry.used = false;
        entry.init_sweep = true;
        let key = (entry.priority, entry.order);
        let name = entry.name;

        let pool = &self.pool;
        let position = self
            .active
            .partition_point(|k| pool.get(k).is_some_and(|e| (e.priority, e.order) <= key));
        self.active.insert(position, kind);
        debug!(system = name, "system activated");
        true
    }

    fn deactivate(&mut self, kind: ComponentKind) -> bool {
        let Some(entry) = self.pool.get_mut(&kind) else {
            return false;
        };
        entry.forced = false;
        entry.used = false;
        let name = entry.name;
        let Some(position) = self.active.iter().position(|&k| k == kind) else {
            return false;
        };
        self.active.remove(position);
        debug!(system = name, "system deactivated");
        true
    }

    // ---- Step plumbing ----

    /// Reset usage, flush pending components, activate their systems, and run `create`.
    pub(crate) fn begin_step(&mut self, world: &mut World) {
        for kind in &self.active {
            if let Some(entry) = self.pool.get_mut(kind) {
                entry.used = false;
            }
        }

        let flushed = world.flush_pending();
        if !flushed.is_empty() {
            trace!(components = flushed.len(), "pending components flushed");
        }
        for (kind, id) in flushed {
            // An earlier create hook may have removed it.
            if world.component_kind(id).is_none() {
                continue;
            }
            if !self.is_kind_active(kind) {
                if !self.auto_management || !self.pool.contains_key(&kind) {
                    continue;
                }
                self.activate(kind);
            }
            self.create(world, kind, id);
        }

        let sweeps: Vec<ComponentKind> = self
            .active
            .iter()
            .copied()
            .filter(|kind| self.pool.get(kind).is_some_and(|e| e.init_sweep))
            .collect();
        for kind in sweeps {
            if let Some(entry) = self.pool.get_mut(&kind) {
                entry.init_sweep = false;
            }
            for id in world.uninitialized_components(kind) {
                self.create(world, kind, id);
            }
        }
    }

    fn create(&mut self, world: &mut World, kind: ComponentKind, id: ComponentId) {
        if world.is_initialized(id) {
            return;
        }
        let Some(entry) = self.pool.get_mut(&kind) else {
            return;
        };
        entry.system.create(world, id);
        world.mark_initialized(id);
    }

    pub(crate) fn fixed_update(&mut self, world: &mut World) {
        let layers = world.layer_ids();
        for kind in &self.active {
            let Some(entry) = self.pool.get_mut(kind) else {
                continue;
            };
            for &layer in &layers {
                let components = world.active_components(layer, *kind);
                if !components.is_empty() {
                    entry.system.fixed_update(world, &components);
                }
            }
        }
    }

    pub(crate) fn update(&mut self, world: &mut World) {
        let layers = world.layer_ids();
        for kind in &self.active {
            let Some(entry) = self.pool.get_mut(kind) else {
                continue;
            };
            for &layer in &layers {
                let components = world.active_components(layer, *kind);
                if !components.is_empty() {
                    entry.used = true;
                    entry.system.update(world, &components);
                }
            }
        }
    }

    /// Draw every flushed component of `entity` whose system is active, in priority order.
    pub(crate) fn draw_entity(
        &mut self,
        world: &mut World,
        renderer: &mut dyn Renderer,
        entity: EntityId,
    ) {
        for kind in &self.active {
            let Some(id) = world.entity(entity).and_then(|e| e.component_id(*kind)) else {
                continue;
            };
            if world.is_pending(id) {
                continue;
            }
            if let Some(entry) = self.pool.get_mut(kind) {
                entry.system.draw(world, renderer, id);
            }
        }
    }

    /// Run `destroy` for every initialized component of an entity about to be released.
    pub(crate) fn destroy_components(&mut self, world: &mut World, entity: EntityId) {
        for id in world.components_of(entity) {
            if !world.is_initialized(id) {
                continue;
            }
            let Some(kind) = world.component_kind(id) else {
                continue;
            };
            if let Some(entry) = self.pool.get_mut(&kind) {
                entry.system.destroy(world, id);
            }
        }
    }

    /// Purge active systems that processed nothing this step. Returns how many were purged.
    pub(crate) fn end_step(&mut self, world: &mut World) -> usize {
        if !self.auto_management || !(world.components_removed() || self.purge_requested) {
            return 0;
        }
        let unused: Vec<ComponentKind> = self
            .active
            .iter()
            .copied()
            .filter(|kind| self.pool.get(kind).is_some_and(|e| !e.used && !e.forced))
            .collect();
        for &kind in &unused {
            self.deactivate(kind);
        }
        if !unused.is_empty() {
            world.clear_components_removed();
            self.purge_requested = false;
        }
        unused.len()
    }
}

impl Default for SystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
