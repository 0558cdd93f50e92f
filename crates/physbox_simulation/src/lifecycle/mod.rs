//! Entity lifecycle: spawn, respawn, death hooks, round boundaries
//!
//! ECS ответственность:
//! - Spawn(): health, immunity window, hit volume
//! - Death hooks: ragdoll, drop held prop, debris, destroy world mesh
//! - Round контракт: reset очереди, отмена respawn
//!
//! Game mode (scoring, респавн-правила): внешний, читает события отсюда.

use bevy::prelude::*;

use crate::collision::ObjectKind;
use crate::components::{DamageRecord, PropDefinitionId};
use crate::PhysboxSet;

pub mod death;
pub mod round;
pub mod spawn;

pub use death::{Dead, DespawnAfter};
pub use round::{RoundEnded, RoundStarted, RoundState};
pub use spawn::{spawn_player, RespawnRequested, SpawnRequested, SuicideRequested};

/// Событие: урон применён (health уменьшился)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageApplied {
    pub victim: Entity,
    pub kind: ObjectKind,
    pub record: DamageRecord,
    pub remaining: u32,
}

/// Событие: entity перешёл Alive → Dead
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKilled {
    pub entity: Entity,
    pub kind: ObjectKind,
    pub cause: DamageRecord,
}

/// Событие: игрок умер (для scoring / killfeed)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDied {
    pub player: Entity,
    pub cause: DamageRecord,
}

/// Событие: игрок (re)spawned
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSpawned {
    pub player: Entity,
}

/// Событие: проп развалился на обломки
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropBroken {
    pub prop: Entity,
    pub definition: PropDefinitionId,
    pub debris: u32,
}

/// Событие: разрушаемый world mesh уничтожен
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct WorldMeshDestroyed {
    pub entity: Entity,
    pub name: String,
}

/// Событие: fall damage cue (звук приземления: снаружи)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct FallImpact {
    pub player: Entity,
    pub speed: f32,
}

/// Событие: человек попал пропом в игрока (hitsound + chat line: снаружи)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitConfirmed {
    pub attacker: Entity,
    pub victim: Entity,
    pub amount: u32,
}

/// Lifecycle Plugin
///
/// Порядок выполнения:
/// Requests:
/// 1. on_round_ended / on_round_started: round контракт
/// 2. handle_respawn_requests / handle_suicide_requests
/// 3. process_spawns: SpawnRequested + Respawn таймеры + новые пропы
/// 4. clear_damage_immunity
/// Lifecycle (после drain):
/// 5. on_entity_killed: death hooks по kind
/// 6. break_apart_props: BreakApart таймеры (debris + despawn)
/// 7. despawn_after_timeout: ragdoll / debris cleanup
pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DamageApplied>()
            .add_event::<EntityKilled>()
            .add_event::<PlayerDied>()
            .add_event::<PlayerSpawned>()
            .add_event::<PropBroken>()
            .add_event::<WorldMeshDestroyed>()
            .add_event::<FallImpact>()
            .add_event::<HitConfirmed>()
            .add_event::<SpawnRequested>()
            .add_event::<RespawnRequested>()
            .add_event::<SuicideRequested>()
            .add_event::<RoundStarted>()
            .add_event::<RoundEnded>()
            .init_resource::<RoundState>();

        app.add_systems(
            FixedUpdate,
            (
                // Фаза 1: Round boundaries
                round::on_round_ended,
                round::on_round_started,
                // Фаза 2: Запросы
                spawn::handle_respawn_requests,
                spawn::handle_suicide_requests,
                // Фаза 3: Spawn
                spawn::process_spawns,
                spawn::clear_damage_immunity,
            )
                .chain()
                .in_set(PhysboxSet::Requests),
        );

        app.add_systems(
            FixedUpdate,
            (
                death::on_entity_killed,
                death::break_apart_props,
                death::despawn_after_timeout,
            )
                .chain()
                .in_set(PhysboxSet::Lifecycle),
        );
    }
}
