//! Physbox Simulation Core
//!
//! ECS-ядро на Bevy 0.16: collision damage + entity lifecycle
//!
//! Поток данных (один FixedUpdate tick):
//! - Timers: Scheduler → TimerFired
//! - Requests: round boundaries, spawn/respawn, pickups, истёкшие таймеры
//! - Contacts: rapier / ContactReport / LandingReport → CollisionQueue
//! - Resolve: drain очереди → life-state / ownership
//! - Lifecycle: death hooks, debris, cleanup
//! - Broadcast: domain events → BroadcastSink
//!
//! Физический step, рендер, UI и scoring живут снаружи.

use bevy::ecs::component::Tick;
use bevy::ecs::event::EventRegistry;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod broadcast;
pub mod collision;
pub mod components;
pub mod config;
pub mod damage;
pub mod lifecycle;
pub mod logger;
pub mod ownership;
pub mod timer;

// Re-export базовых типов для удобства
pub use broadcast::{BroadcastPlugin, BroadcastSink, Broadcaster, LifecycleBroadcast};
pub use collision::{
    CollisionEvent, CollisionListener, CollisionPlugin, CollisionQueue, ContactReport,
    LandingReport, ObjectKind,
};
pub use components::*;
pub use config::{ConfigFile, GameMode, GameRules, NetworkRole, PhysboxConfig, Team};
pub use damage::DamagePlugin;
pub use lifecycle::{
    spawn_player, DamageApplied, Dead, DespawnAfter, EntityKilled, FallImpact, HitConfirmed,
    LifecyclePlugin, PlayerDied, PlayerSpawned, PropBroken, RespawnRequested, RoundEnded,
    RoundStarted, RoundState, SpawnRequested, SuicideRequested, WorldMeshDestroyed,
};
pub use logger::{init_logger, log, log_error, log_info, log_warning};
pub use ownership::{
    ClearReason, OwnershipCleared, OwnershipPlugin, OwnershipRecord, PickupRequested,
    PropPickedUp, PropReleased, ReleaseRequested,
};
pub use timer::{Scheduler, TimerFired, TimerHandle, TimerKey, TimerKind};

/// Фазы FixedUpdate (выполняются строго по порядку)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysboxSet {
    Timers,
    Requests,
    Contacts,
    Resolve,
    Lifecycle,
    Broadcast,
}

/// Главный plugin симуляции (объединяет все подсистемы)
#[derive(Default)]
pub struct SimulationPlugin {
    pub config: ConfigFile,
    pub role: NetworkRole,
}

impl SimulationPlugin {
    pub fn new(config: ConfigFile, role: NetworkRole) -> Self {
        Self { config, role }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .insert_resource(self.config.tuning.clone())
            .insert_resource(self.config.rules.clone())
            .insert_resource(self.role)
            .init_resource::<Scheduler>()
            .add_event::<TimerFired>();

        // Детерминистичный RNG (seed по умолчанию, если хост не вставил свой)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app.configure_sets(
            FixedUpdate,
            (
                PhysboxSet::Timers,
                PhysboxSet::Requests,
                PhysboxSet::Contacts,
                PhysboxSet::Resolve,
                PhysboxSet::Lifecycle,
                PhysboxSet::Broadcast,
            )
                .chain(),
        );

        app.add_systems(FixedUpdate, timer::tick_scheduler.in_set(PhysboxSet::Timers));

        // Подсистемы
        app.add_plugins((
            CollisionPlugin,
            DamagePlugin,
            LifecyclePlugin,
            OwnershipPlugin,
            BroadcastPlugin,
        ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Один детерминированный FixedUpdate tick длиной `dt`
///
/// Fixed clock двигается вручную, поэтому результат не зависит от wall clock.
/// Буферы событий не обновляются: тесты читают всё, что накопилось за сценарий.
/// Долгий цикл (демо, хост) вызывает `flush_events` после каждого шага.
pub fn step_fixed(app: &mut App, dt: Duration) {
    app.world_mut().resource_mut::<Time<Fixed>>().advance_by(dt);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Double-buffer update всех зарегистрированных событий (то, что делает `First`)
///
/// Событие живёт два вызова, после чего отбрасывается.
pub fn flush_events(app: &mut App) {
    app.world_mut()
        .resource_scope(|world, mut registry: Mut<EventRegistry>| {
            registry.run_updates(world, Tick::new(0));
        });
}

/// `step_fixed` с шагом 1/60 s, пока не пройдёт `seconds`
pub fn run_for(app: &mut App, seconds: f32) {
    let dt = Duration::from_secs_f64(1.0 / 60.0);
    let ticks = (seconds * 60.0).round().max(0.0) as u32;
    for _ in 0..ticks {
        step_fixed(app, dt);
    }
}
