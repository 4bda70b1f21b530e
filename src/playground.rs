//! Demo scene for the playground binary
//!
//! A spawner releases wanderers that drift around an arena, age, and expire. Health, sprites,
//! movement, and lifetimes are each handled by one system.

use anyhow::Context;
use lumen_core::Vec2;
use lumen_ecs::{
    ComponentId, ComponentKind, DrawCommand, DrawPass, EntityBehavior, EntityId, LayerId,
    Renderer, Scheduler, System, SystemRegistry, World,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::settings::PlaygroundSettings;

/// Half extent of the square arena.
pub const ARENA: f32 = 200.0;

// ---- Components ----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

/// Seconds left before the owner is destroyed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime(pub f64);

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite(pub String);

// ---- Systems ----

/// Integrates velocities at the fixed rate and bounces off the arena walls.
#[derive(Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    fn component_kind(&self) -> ComponentKind {
        ComponentKind::of::<Velocity>()
    }

    fn fixed_update(&mut self, world: &mut World, components: &[ComponentId]) {
        let step = world.frame_time().fixed_timestep as f32;
        for &id in components {
            let Some(mut velocity) = world.component::<Velocity>(id).copied() else {
                continue;
            };
            let Some(position) = world.sibling_mut::<Position>(id) else {
                continue;
            };
            position.0 += velocity.0 * step;
            if position.0.x.abs() > ARENA {
                velocity.0.x = -velocity.0.x;
            }
            if position.0.y.abs() > ARENA {
                velocity.0.y = -velocity.0.y;
            }
            position.0 = position.0.clamp(Vec2::splat(-ARENA), Vec2::splat(ARENA));
            if let Some(v) = world.component_mut::<Velocity>(id) {
                *v = velocity;
            }
        }
    }
}

/// Drains health over time and destroys entities that run out.
#[derive(Default)]
pub struct HealthSystem;

impl System for HealthSystem {
    fn component_kind(&self) -> ComponentKind {
        ComponentKind::of::<Health>()
    }

    fn priority(&self) -> i32 {
        10
    }

    fn create(&mut self, world: &mut World, component: ComponentId) {
        if let Some(health) = world.component_mut::<Health>(component) {
            health.current = health.max;
        }
    }

    fn update(&mut self, world: &mut World, components: &[ComponentId]) {
        let delta = world.frame_time().delta as f32;
        for &id in components {
            let Some(health) = world.component_mut::<Health>(id) else {
                continue;
            };
            health.current -= delta;
            if health.current <= 0.0 {
                if let Some(owner) = world.owner(id) {
                    debug!(entity = %owner, "out of health");
                    world.destroy(owner);
                }
            }
        }
    }

    fn draw(&mut self, world: &mut World, renderer: &mut dyn Renderer, component: ComponentId) {
        let (Some(health), Some(position)) = (
            world.component::<Health>(component),
            world.sibling::<Position>(component),
        ) else {
            return;
        };
        let fill = (health.current / health.max).clamp(0.0, 1.0);
        let min = position.0 + Vec2::new(-8.0, 10.0);
        renderer.submit(DrawCommand::Rect {
            min,
            max: min + Vec2::new(16.0 * fill, 2.0),
            filled: true,
        });
    }
}

#[derive(Default)]
pub struct LifetimeSystem;

impl System for LifetimeSystem {
    fn component_kind(&self) -> ComponentKind {
        ComponentKind::of::<Lifetime>()
    }

    fn update(&mut self, world: &mut World, components: &[ComponentId]) {
        let delta = world.frame_time().delta;
        for &id in components {
            let Some(lifetime) = world.component_mut::<Lifetime>(id) else {
                continue;
            };
            lifetime.0 -= delta;
            if lifetime.0 <= 0.0 {
                if let Some(owner) = world.owner(id) {
                    world.destroy(owner);
                }
            }
        }
    }
}

#[derive(Default)]
pub struct SpriteSystem;

impl System for SpriteSystem {
    fn component_kind(&self) -> ComponentKind {
        ComponentKind::of::<Sprite>()
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn draw(&mut self, world: &mut World, renderer: &mut dyn Renderer, component: ComponentId) {
        let (Some(sprite), Some(position)) = (
            world.component::<Sprite>(component),
            world.sibling::<Position>(component),
        ) else {
            return;
        };
        renderer.submit(DrawCommand::Sprite {
            sprite: sprite.0.clone(),
            position: position.0,
        });
    }
}

/// Registry with every playground system pooled.
pub fn registry() -> lumen_ecs::EcsResult<SystemRegistry> {
    let mut systems = SystemRegistry::new();
    systems.register_default::<MovementSystem>()?;
    systems.register_default::<HealthSystem>()?;
    systems.register_default::<LifetimeSystem>()?;
    systems.register_default::<SpriteSystem>()?;
    Ok(systems)
}

// ---- Behaviors ----

/// Spawns one wanderer every `interval` seconds until `remaining` reaches zero.
pub struct Spawner {
    rng: StdRng,
    layer: LayerId,
    interval: f64,
    timer: f64,
    remaining: u32,
}

impl Spawner {
    pub fn new(layer: LayerId, count: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            layer,
            interval: 0.1,
            timer: 0.0,
            remaining: count,
        }
    }

    fn spawn(&mut self, world: &mut World) -> lumen_ecs::EcsResult<EntityId> {
        let entity = world.create_entity_with(self.layer, "wanderer", Wanderer)?;
        let position = Vec2::new(
            self.rng.gen_range(-ARENA..ARENA),
            self.rng.gen_range(-ARENA..ARENA),
        );
        let velocity = Vec2::new(self.rng.gen_range(-60.0..60.0), self.rng.gen_range(-60.0..60.0));
        world.set_depth(entity, self.rng.gen_range(0..8))?;
        world.add_component(entity, Position(position))?;
        world.add_component(entity, Velocity(velocity))?;
        world.add_component(
            entity,
            Health {
                current: 0.0,
                max: self.rng.gen_range(2.0..6.0),
            },
        )?;
        world.add_component(entity, Lifetime(self.rng.gen_range(1.0..8.0)))?;
        world.add_component(entity, Sprite("wanderer".into()))?;
        Ok(entity)
    }
}

impl EntityBehavior for Spawner {
    fn update(&mut self, world: &mut World, entity: EntityId) {
        if self.remaining == 0 {
            return;
        }
        self.timer += world.frame_time().delta;
        while self.timer >= self.interval && self.remaining > 0 {
            self.timer -= self.interval;
            self.remaining -= 1;
            match self.spawn(world) {
                Ok(spawned) => trace!(spawner = %entity, entity = %spawned, "wanderer spawned"),
                Err(e) => debug!(spawner = %entity, "spawn failed: {}", e),
            }
        }
    }
}

pub struct Wanderer;

impl EntityBehavior for Wanderer {
    fn destroy(&mut self, world: &mut World, entity: EntityId) {
        let hp = world.get_component::<Health>(entity).map_or(0.0, |h| h.current);
        trace!(entity = %entity, hp, "wanderer gone");
    }
}

/// Draws a population counter in the gui pass.
pub struct Hud;

impl EntityBehavior for Hud {
    fn draw_gui(&mut self, world: &mut World, renderer: &mut dyn Renderer, _entity: EntityId) {
        renderer.submit(DrawCommand::Text {
            font: "mono".into(),
            text: format!("wanderers: {}", world.count_of::<Wanderer>()),
            position: Vec2::new(4.0, 4.0),
        });
    }
}

// ---- Renderer ----

/// Counts commands per pass and traces them.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    pub world_commands: usize,
    pub gui_commands: usize,
    current: Option<DrawPass>,
}

impl Renderer for LoggingRenderer {
    fn begin_pass(&mut self, pass: DrawPass) {
        self.current = Some(pass);
    }

    fn end_pass(&mut self, _pass: DrawPass) {
        self.current = None;
    }

    fn submit(&mut self, command: DrawCommand) {
        match self.current {
            Some(DrawPass::Gui) => self.gui_commands += 1,
            _ => self.world_commands += 1,
        }
        trace!(?command, "draw");
    }
}

// ---- Runner ----

/// Build the scheduler and populate the scene.
pub fn setup(settings: &PlaygroundSettings) -> anyhow::Result<Scheduler> {
    let systems = registry().context("Failed to register playground systems")?;
    let mut scheduler = Scheduler::with_systems(settings.scheduler.clone(), systems)
        .context("Invalid scheduler configuration")?;

    for name in &settings.run.force_enabled_systems {
        if let Err(e) = scheduler.systems_mut().enable_system_by_name(name) {
            warn!("Skipping forced system: {}", e);
        }
    }

    let actors = scheduler.add_layer("actors");
    let overlay = scheduler.add_layer("overlay");
    scheduler.create_entity_with(
        actors,
        "spawner",
        Spawner::new(actors, settings.run.wanderers, settings.run.seed),
    )?;
    scheduler.create_entity_with(overlay, "hud", Hud)?;
    Ok(scheduler)
}

/// Summary of a playground run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub frames: u32,
    pub total_time: f64,
    pub peak_entities: usize,
    pub remaining_entities: usize,
    pub world_commands: usize,
    pub gui_commands: usize,
    /// Systems still active after the last frame
    pub active_systems: Vec<&'static str>,
}

pub fn run(settings: &PlaygroundSettings) -> anyhow::Result<RunReport> {
    let mut scheduler = setup(settings)?;
    let mut renderer = LoggingRenderer::default();
    let mut peak_entities = 0;

    for _ in 0..settings.run.frames {
        let time = scheduler.frame(settings.run.frame_time, &mut renderer);
        peak_entities = peak_entities.max(scheduler.world().entity_count());
        if time.frame % 60 == 0 {
            info!(
                frame = time.frame,
                entities = scheduler.world().live_entities().len(),
                systems = ?scheduler.systems().active_systems(),
                "tick"
            );
        }
    }

    Ok(RunReport {
        frames: settings.run.frames,
        total_time: scheduler.clock().total_time(),
        peak_entities,
        remaining_entities: scheduler.world().entity_count(),
        world_commands: renderer.world_commands,
        gui_commands: renderer.gui_commands,
        active_systems: scheduler.systems().active_systems(),
    })
}
