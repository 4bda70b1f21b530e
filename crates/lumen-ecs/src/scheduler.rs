//! Frame driver.
//!
//! A [`Scheduler`] owns the [`World`], the [`SystemRegistry`], and the [`FrameClock`]. The host
//! calls [`Scheduler::frame`] once per rendered frame with the elapsed wall time.

use lumen_core::{ConfigError, FrameClock, FrameTime, SchedulerConfig};
use tracing::{debug, trace};

use crate::component::{Component, ComponentId};
use crate::entity::{EntityBehavior, EntityId};
use crate::error::EcsResult;
use crate::layer::LayerId;
use crate::render::{DrawPass, NullRenderer, Renderer};
use crate::system::{System, SystemRegistry};
use crate::world::World;

pub struct Scheduler {
    world: World,
    systems: SystemRegistry,
    clock: FrameClock,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        Self::with_systems(config, SystemRegistry::new())
    }

    /// Build a scheduler around an already populated registry.
    pub fn with_systems(
        config: SchedulerConfig,
        mut systems: SystemRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if systems.auto_management() != config.auto_system_management {
            systems.set_auto_management(config.auto_system_management);
        }
        Ok(Self {
            world: World::new(),
            systems,
            clock: FrameClock::new(&config),
            config,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemRegistry {
        &mut self.systems
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ---- Facade ----

    pub fn register<S: System>(&mut self, system: S) -> EcsResult<()> {
        self.systems.register(system)
    }

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        self.world.add_layer(name)
    }

    pub fn create_entity(&mut self, layer: LayerId, tag: impl Into<String>) -> EcsResult<EntityId> {
        self.world.create_entity(layer, tag)
    }

    pub fn create_entity_with<B: EntityBehavior>(
        &mut self,
        layer: LayerId,
        tag: impl Into<String>,
        behavior: B,
    ) -> EcsResult<EntityId> {
        self.world.create_entity_with(layer, tag, behavior)
    }

    pub fn add_component<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> EcsResult<ComponentId> {
        self.world.add_component(entity, component)
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.world.remove_component(entity)
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.world.get_component(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.world.get_component_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.world.has_component::<T>(entity)
    }

    pub fn destroy(&mut self, entity: EntityId) -> bool {
        self.world.destroy(entity)
    }

    pub fn enable_system<S: System>(&mut self) -> bool {
        self.systems.enable_system::<S>()
    }

    pub fn disable_system<S: System>(&mut self) -> bool {
        self.systems.disable_system::<S>()
    }

    pub fn set_auto_system_management(&mut self, enabled: bool) {
        self.config.auto_system_management = enabled;
        self.systems.set_auto_management(enabled);
    }

    // ---- Frame ----

    /// Run one frame without drawing anything.
    pub fn step(&mut self, elapsed: f64) -> FrameTime {
        self.frame(elapsed, &mut NullRenderer)
    }

    /// Run one full frame: compaction, merge, step begin, fixed passes, update, draw, step end.
    pub fn frame(&mut self, elapsed: f64, renderer: &mut dyn Renderer) -> FrameTime {
        let compacted = self.compact();
        let merged = self.world.merge_spawned();

        self.systems.begin_step(&mut self.world);

        let time = self.clock.advance(elapsed);
        self.world.insert_resource(time);
        if time.fixed_overflow > time.fixed_steps {
            debug!(
                overflow = time.fixed_overflow,
                passes = time.fixed_steps,
                "fixed steps dropped"
            );
        }
        for _ in 0..time.fixed_steps {
            self.fixed_pass();
        }

        self.update_pass();
        self.draw_pass(renderer);

        let purged = self.systems.end_step(&mut self.world);
        trace!(
            frame = time.frame,
            compacted,
            merged,
            purged,
            fixed = time.fixed_steps,
            "frame complete"
        );
        time
    }

    /// Release destroyed entities, running the system `destroy` hook for their components.
    fn compact(&mut self) -> usize {
        let destroyed = self.world.take_destroyed();
        for &entity in &destroyed {
            self.systems.destroy_components(&mut self.world, entity);
            self.world.release(entity);
        }
        destroyed.len()
    }

    fn fixed_pass(&mut self) {
        let live = self.world.live_entities().to_vec();
        each_updatable(&mut self.world, &live, |b, w, e| b.fixed_update_begin(w, e));
        self.systems.fixed_update(&mut self.world);
        each_updatable(&mut self.world, &live, |b, w, e| b.fixed_update(w, e));
        each_updatable(&mut self.world, &live, |b, w, e| b.fixed_update_end(w, e));
    }

    fn update_pass(&mut self) {
        let live = self.world.live_entities().to_vec();
        each_updatable(&mut self.world, &live, |b, w, e| b.update_begin(w, e));
        self.systems.update(&mut self.world);
        each_updatable(&mut self.world, &live, |b, w, e| b.update(w, e));
        each_updatable(&mut self.world, &live, |b, w, e| b.update_end(w, e));
    }

    fn draw_pass(&mut self, renderer: &mut dyn Renderer) {
        let world = &mut self.world;
        let order = world.draw_order();

        renderer.begin_pass(DrawPass::World);
        for &entity in &order {
            if world.is_drawable(entity) {
                world.with_behavior(entity, |b, w| b.draw_begin(w, &mut *renderer, entity));
            }
        }
        for &entity in &order {
            if !world.is_drawable(entity) {
                continue;
            }
            self.systems.draw_entity(world, &mut *renderer, entity);
            if world.is_drawable(entity) {
                world.with_behavior(entity, |b, w| b.draw(w, &mut *renderer, entity));
            }
        }
        for &entity in &order {
            if world.is_drawable(entity) {
                world.with_behavior(entity, |b, w| b.draw_end(w, &mut *renderer, entity));
            }
        }
        renderer.end_pass(DrawPass::World);

        let live = world.live_entities().to_vec();
        renderer.begin_pass(DrawPass::Gui);
        for &entity in &live {
            if world.is_drawable(entity) {
                world.with_behavior(entity, |b, w| b.draw_gui(w, &mut *renderer, entity));
            }
        }
        renderer.end_pass(DrawPass::Gui);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        let config = SchedulerConfig::default();
        Self {
            world: World::new(),
            systems: SystemRegistry::new(),
            clock: FrameClock::new(&config),
            config,
        }
    }
}

/// Run an entity hook for every entity of a snapshot that is still enabled and not destroyed.
fn each_updatable(
    world: &mut World,
    entities: &[EntityId],
    mut hook: impl FnMut(&mut dyn EntityBehavior, &mut World, EntityId),
) {
    for &entity in entities {
        if world.is_updatable(entity) {
            world.with_behavior(entity, |behavior, world| hook(behavior, world, entity));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::render::{CommandBuffer, DrawCommand};
    use lumen_core::{FixedStepPolicy, Vec2};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug, PartialEq)]
    struct Health(i32);

    #[derive(Debug, PartialEq)]
    struct Position(Vec2);

    struct HealthSystem {
        log: Log,
    }

    impl System for HealthSystem {
        fn component_kind(&self) -> ComponentKind {
            ComponentKind::of::<Health>()
        }

        fn create(&mut self, _world: &mut World, _component: ComponentId) {
            self.log.borrow_mut().push("create health".into());
        }

        fn fixed_update(&mut self, _world: &mut World, components: &[ComponentId]) {
            self.log
                .borrow_mut()
                .push(format!("fixed health x{}", components.len()));
        }

        fn update(&mut self, world: &mut World, components: &[ComponentId]) {
            for &id in components {
                if let Some(health) = world.component_mut::<Health>(id) {
                    health.0 -= 1;
                }
            }
            self.log
                .borrow_mut()
                .push(format!("update health x{}", components.len()));
        }

        fn draw(&mut self, _world: &mut World, _renderer: &mut dyn Renderer, _component: ComponentId) {
            self.log.borrow_mut().push("draw health".into());
        }

        fn destroy(&mut self, _world: &mut World, _component: ComponentId) {
            self.log.borrow_mut().push("destroy health".into());
        }
    }

    /// Logs every hook; optionally destroys or disables itself in one of them.
    struct Actor {
        name: &'static str,
        log: Log,
        kill_in: Option<&'static str>,
        disable_in: Option<&'static str>,
    }

    impl Actor {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                kill_in: None,
                disable_in: None,
            }
        }

        fn killed_in(mut self, phase: &'static str) -> Self {
            self.kill_in = Some(phase);
            self
        }

        fn disabled_in(mut self, phase: &'static str) -> Self {
            self.disable_in = Some(phase);
            self
        }

        fn hit(&self, world: &mut World, entity: EntityId, phase: &'static str) {
            self.log.borrow_mut().push(format!("{} {phase}", self.name));
            if self.kill_in == Some(phase) {
                world.destroy(entity);
            }
            if self.disable_in == Some(phase) {
                world.set_enabled(entity, false).unwrap();
            }
        }
    }

    impl EntityBehavior for Actor {
        fn fixed_update_begin(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "fixed_begin");
        }

        fn fixed_update(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "fixed");
        }

        fn fixed_update_end(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "fixed_end");
        }

        fn update_begin(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "update_begin");
        }

        fn update(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "update");
        }

        fn update_end(&mut self, world: &mut World, entity: EntityId) {
            self.hit(world, entity, "update_end");
        }

        fn draw_begin(&mut self, world: &mut World, _renderer: &mut dyn Renderer, entity: EntityId) {
            self.hit(world, entity, "draw_begin");
        }

        fn draw(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {
            renderer.submit(DrawCommand::Sprite {
                sprite: self.name.to_string(),
                position: Vec2::ZERO,
            });
            self.hit(world, entity, "draw");
        }

        fn draw_end(&mut self, world: &mut World, _renderer: &mut dyn Renderer, entity: EntityId) {
            self.hit(world, entity, "draw_end");
        }

        fn draw_gui(&mut self, world: &mut World, renderer: &mut dyn Renderer, entity: EntityId) {
            renderer.submit(DrawCommand::Text {
                font: "mono".into(),
                text: self.name.to_string(),
                position: Vec2::ZERO,
            });
            self.hit(world, entity, "gui");
        }

        fn destroy(&mut self, _world: &mut World, _entity: EntityId) {
            self.log.borrow_mut().push(format!("{} destroy", self.name));
        }
    }

    /// Adds a `Health` to its own entity during its first update.
    struct LateHealer;

    impl EntityBehavior for LateHealer {
        fn update(&mut self, world: &mut World, entity: EntityId) {
            if !world.has_component::<Health>(entity) {
                world.add_component(entity, Health(3)).unwrap();
            }
        }
    }

    /// Adds a `Health` to its own entity at the start of its first fixed pass.
    struct FixedHealer;

    impl EntityBehavior for FixedHealer {
        fn fixed_update_begin(&mut self, world: &mut World, entity: EntityId) {
            if !world.has_component::<Health>(entity) {
                world.add_component(entity, Health(3)).unwrap();
            }
        }
    }

    fn config(policy: FixedStepPolicy) -> SchedulerConfig {
        SchedulerConfig {
            fixed_timestep: 0.5,
            fixed_step_policy: policy,
            max_fixed_steps: 4,
            max_delta_time: 10.0,
            ..Default::default()
        }
    }

    fn scheduler(log: &Log) -> (Scheduler, LayerId) {
        let mut scheduler = Scheduler::new(config(FixedStepPolicy::CatchUp)).unwrap();
        scheduler
            .register(HealthSystem { log: log.clone() })
            .unwrap();
        let layer = scheduler.add_layer("main");
        (scheduler, layer)
    }

    fn count(log: &Log, entry: &str) -> usize {
        log.borrow().iter().filter(|l| *l == entry).count()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = SchedulerConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(Scheduler::new(bad), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn health_scenario() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler.create_entity(layer, "e1").unwrap();
        scheduler.add_component(e, Position(Vec2::ZERO)).unwrap();
        let health = scheduler.add_component(e, Health(10)).unwrap();

        scheduler.step(0.1);
        assert_eq!(count(&log, "create health"), 1);
        assert!(scheduler.world().is_initialized(health));
        assert!(scheduler.systems().is_active::<HealthSystem>());
        assert_eq!(scheduler.get_component::<Health>(e), Ok(&Health(9)));

        assert_eq!(scheduler.remove_component::<Health>(e), Some(Health(9)));
        scheduler.step(0.1);
        assert!(!scheduler.systems().is_active::<HealthSystem>());
        assert_eq!(count(&log, "create health"), 1);
    }

    #[test]
    fn full_frame_order() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "hero", Actor::new("hero", &log))
            .unwrap();
        scheduler.add_component(e, Health(5)).unwrap();

        scheduler.step(0.5);
        assert_eq!(
            *log.borrow(),
            vec![
                "create health",
                "hero fixed_begin",
                "fixed health x1",
                "hero fixed",
                "hero fixed_end",
                "hero update_begin",
                "update health x1",
                "hero update",
                "hero update_end",
                "hero draw_begin",
                "draw health",
                "hero draw",
                "hero draw_end",
                "hero gui",
            ]
        );
    }

    #[test]
    fn new_entities_join_next_frame() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log))
            .unwrap();
        assert!(scheduler.world().live_entities().is_empty());
        scheduler.step(0.1);
        assert_eq!(scheduler.world().live_entities().len(), 1);
        assert_eq!(count(&log, "a update"), 1);
    }

    #[test]
    fn component_added_mid_step_waits_for_next_step() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "healer", LateHealer)
            .unwrap();

        scheduler.step(0.1);
        let id = scheduler.world().component_id::<Health>(e).unwrap();
        assert!(scheduler.world().is_pending(id));
        assert!(log.borrow().is_empty());

        scheduler.step(0.1);
        assert_eq!(
            *log.borrow(),
            vec!["create health", "update health x1", "draw health"]
        );
    }

    #[test]
    fn component_added_in_fixed_pass_skips_remaining_fixed_passes() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        assert!(scheduler.enable_system::<HealthSystem>());
        let e = scheduler
            .create_entity_with(layer, "healer", FixedHealer)
            .unwrap();

        // Two fixed passes; the second must not see the component added in the first.
        let time = scheduler.step(1.0);
        assert_eq!(time.fixed_steps, 2);
        let id = scheduler.world().component_id::<Health>(e).unwrap();
        assert!(scheduler.world().is_pending(id));
        assert!(log.borrow().is_empty());

        scheduler.step(1.0);
        assert_eq!(
            *log.borrow(),
            vec![
                "create health",
                "fixed health x1",
                "fixed health x1",
                "update health x1",
                "draw health"
            ]
        );
    }

    #[test]
    fn deeper_entities_draw_first() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let low = scheduler
            .create_entity_with(layer, "low", Actor::new("low", &log))
            .unwrap();
        let high = scheduler
            .create_entity_with(layer, "high", Actor::new("high", &log))
            .unwrap();
        scheduler.world_mut().set_depth(low, 5).unwrap();
        scheduler.world_mut().set_depth(high, 10).unwrap();

        let sprites = |buffer: &CommandBuffer| -> Vec<String> {
            buffer
                .pass(DrawPass::World)
                .filter_map(|c| match c {
                    DrawCommand::Sprite { sprite, .. } => Some(sprite.clone()),
                    _ => None,
                })
                .collect()
        };

        let mut buffer = CommandBuffer::new();
        scheduler.frame(0.1, &mut buffer);
        assert_eq!(sprites(&buffer), vec!["high", "low"]);
        // The gui pass keeps live order.
        assert!(matches!(
            buffer.pass(DrawPass::Gui).next(),
            Some(DrawCommand::Text { text, .. }) if text == "low"
        ));

        scheduler.world_mut().set_depth(low, 20).unwrap();
        buffer.clear();
        scheduler.frame(0.1, &mut buffer);
        assert_eq!(sprites(&buffer), vec!["low", "high"]);
        assert_eq!(buffer.pass_count(), 2);
    }

    #[test]
    fn equal_depths_keep_insertion_order() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        for name in ["a", "b", "c"] {
            scheduler
                .create_entity_with(layer, name, Actor::new(name, &log))
                .unwrap();
        }
        scheduler.step(0.1);
        let draws: Vec<String> = log
            .borrow()
            .iter()
            .filter(|l| l.ends_with(" draw"))
            .cloned()
            .collect();
        assert_eq!(draws, vec!["a draw", "b draw", "c draw"]);
    }

    #[test]
    fn invisible_entities_are_skipped_in_draw() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "ghost", Actor::new("ghost", &log))
            .unwrap();
        scheduler.add_component(e, Health(1)).unwrap();
        scheduler.world_mut().set_visible(e, false).unwrap();

        scheduler.step(0.1);
        assert_eq!(count(&log, "ghost update"), 1);
        assert_eq!(count(&log, "ghost draw"), 0);
        assert_eq!(count(&log, "ghost gui"), 0);
        assert_eq!(count(&log, "draw health"), 0);
    }

    #[test]
    fn catch_up_runs_one_pass_per_step() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log))
            .unwrap();

        let time = scheduler.step(1.5);
        assert_eq!(time.fixed_overflow, 3);
        assert_eq!(time.fixed_steps, 3);
        assert_eq!(count(&log, "a fixed"), 3);

        // Capped at max_fixed_steps; the rest is drained.
        let time = scheduler.step(2.5);
        assert_eq!(time.fixed_overflow, 5);
        assert_eq!(time.fixed_steps, 4);
        assert_eq!(count(&log, "a fixed"), 7);
        assert_eq!(scheduler.clock().accumulator(), 0.0);
    }

    #[test]
    fn once_runs_a_single_pass_and_drains_overflow() {
        let log = Log::default();
        let mut scheduler = Scheduler::new(config(FixedStepPolicy::Once)).unwrap();
        let layer = scheduler.add_layer("main");
        scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log))
            .unwrap();

        let time = scheduler.step(1.5);
        assert_eq!(time.fixed_overflow, 3);
        assert_eq!(time.fixed_steps, 1);
        assert_eq!(count(&log, "a fixed"), 1);
        assert_eq!(scheduler.clock().accumulator(), 0.0);

        scheduler.step(0.25);
        assert_eq!(count(&log, "a fixed"), 1);
        scheduler.step(0.25);
        assert_eq!(count(&log, "a fixed"), 2);
    }

    #[test]
    fn frame_time_is_published() {
        let log = Log::default();
        let (mut scheduler, _) = scheduler(&log);
        scheduler.step(0.25);
        scheduler.step(0.25);
        let time = scheduler.world().frame_time();
        assert_eq!(time.frame, 2);
        assert_eq!(time.total, 0.5);
        assert_eq!(time.delta, 0.25);
    }

    #[test]
    fn destroyed_in_update_begin_skips_rest_of_frame() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(
                layer,
                "doomed",
                Actor::new("doomed", &log).killed_in("update_begin"),
            )
            .unwrap();
        let health = scheduler.add_component(e, Health(1)).unwrap();

        scheduler.step(0.1);
        assert_eq!(count(&log, "doomed update_begin"), 1);
        assert_eq!(count(&log, "doomed destroy"), 1);
        assert_eq!(count(&log, "update health x1"), 0);
        assert_eq!(count(&log, "doomed update"), 0);
        assert_eq!(count(&log, "doomed draw"), 0);
        assert_eq!(count(&log, "doomed gui"), 0);
        assert!(scheduler.world().exists(e));

        scheduler.step(0.1);
        assert!(!scheduler.world().exists(e));
        assert!(scheduler.world().component::<Health>(health).is_none());
        assert_eq!(count(&log, "destroy health"), 1);
        assert_eq!(count(&log, "doomed destroy"), 1);
        assert!(scheduler.world().live_entities().is_empty());
    }

    #[test]
    fn destroyed_in_fixed_pass_skips_update() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        scheduler
            .create_entity_with(layer, "doomed", Actor::new("doomed", &log).killed_in("fixed"))
            .unwrap();

        scheduler.step(1.0);
        assert_eq!(count(&log, "doomed fixed"), 1);
        assert_eq!(count(&log, "doomed fixed_end"), 0);
        assert_eq!(count(&log, "doomed update_begin"), 0);
        assert_eq!(count(&log, "doomed destroy"), 1);
    }

    #[test]
    fn destroyed_in_draw_skips_gui() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        scheduler
            .create_entity_with(layer, "doomed", Actor::new("doomed", &log).killed_in("draw"))
            .unwrap();

        scheduler.step(0.1);
        assert_eq!(count(&log, "doomed draw"), 1);
        assert_eq!(count(&log, "doomed draw_end"), 0);
        assert_eq!(count(&log, "doomed gui"), 0);
    }

    #[test]
    fn destroyed_between_frames_is_compacted() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log))
            .unwrap();
        scheduler.add_component(e, Health(1)).unwrap();
        scheduler.step(0.1);

        assert!(scheduler.destroy(e));
        assert!(!scheduler.destroy(e));
        scheduler.step(0.1);
        assert!(!scheduler.world().exists(e));
        assert_eq!(count(&log, "a destroy"), 1);
        assert_eq!(count(&log, "destroy health"), 1);
        assert_eq!(count(&log, "a update"), 1);
        // Its component went away, so the idle system is purged in the same frame.
        assert!(!scheduler.systems().is_active::<HealthSystem>());
    }

    #[test]
    fn destroyed_before_merge_never_runs() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log))
            .unwrap();
        scheduler.add_component(e, Health(1)).unwrap();
        scheduler.destroy(e);

        scheduler.step(0.1);
        assert!(!scheduler.world().exists(e));
        assert_eq!(*log.borrow(), vec!["a destroy"]);
    }

    #[test]
    fn disabled_mid_frame_leaves_system_lists() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        let e = scheduler
            .create_entity_with(layer, "a", Actor::new("a", &log).disabled_in("update_begin"))
            .unwrap();
        scheduler.add_component(e, Health(1)).unwrap();

        scheduler.step(0.1);
        assert_eq!(count(&log, "update health x1"), 0);
        assert_eq!(count(&log, "a update"), 0);
        // Disabled entities are still drawn.
        assert_eq!(count(&log, "a draw"), 1);
        assert_eq!(count(&log, "draw health"), 1);
    }

    #[test]
    fn manually_enabled_system_survives_purge() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        assert!(scheduler.enable_system::<HealthSystem>());
        let e = scheduler.create_entity(layer, "a").unwrap();
        scheduler.add_component(e, Position(Vec2::ZERO)).unwrap();
        scheduler.step(0.1);
        scheduler.remove_component::<Position>(e);

        scheduler.step(0.1);
        assert!(scheduler.systems().is_active::<HealthSystem>());

        assert!(scheduler.disable_system::<HealthSystem>());
        assert!(!scheduler.systems().is_active::<HealthSystem>());
    }

    #[test]
    fn auto_management_off_waits_for_manual_enable() {
        let log = Log::default();
        let (mut scheduler, layer) = scheduler(&log);
        scheduler.set_auto_system_management(false);
        let e = scheduler.create_entity(layer, "a").unwrap();
        let health = scheduler.add_component(e, Health(4)).unwrap();

        scheduler.step(0.1);
        assert!(log.borrow().is_empty());
        assert!(!scheduler.world().is_initialized(health));

        scheduler.enable_system::<HealthSystem>();
        scheduler.step(0.1);
        assert_eq!(
            *log.borrow(),
            vec!["create health", "update health x1", "draw health"]
        );
        assert_eq!(scheduler.get_component::<Health>(e), Ok(&Health(3)));
    }

    #[test]
    fn layer_change_keeps_component_initialized() {
        let log = Log::default();
        let (mut scheduler, ground) = scheduler(&log);
        let sky = scheduler.add_layer("sky");
        let e = scheduler.create_entity(ground, "bird").unwrap();
        scheduler.add_component(e, Health(10)).unwrap();
        scheduler.step(0.1);

        scheduler.world_mut().set_layer(e, sky).unwrap();
        scheduler.step(0.1);
        assert_eq!(count(&log, "create health"), 1);
        assert_eq!(count(&log, "update health x1"), 2);
        assert_eq!(scheduler.get_component::<Health>(e), Ok(&Health(8)));
    }

    #[test]
    fn systems_run_per_layer() {
        let log = Log::default();
        let (mut scheduler, ground) = scheduler(&log);
        let sky = scheduler.add_layer("sky");
        for layer in [ground, ground, sky] {
            let e = scheduler.create_entity(layer, "x").unwrap();
            scheduler.add_component(e, Health(1)).unwrap();
        }
        scheduler.step(0.1);
        assert_eq!(count(&log, "update health x2"), 1);
        assert_eq!(count(&log, "update health x1"), 1);
    }
}
