//! Round boundaries (контракт с внешним game mode)
//!
//! RoundStarted: очистить очередь, отменить pending respawns, Spawn() участников.
//! RoundEnded: отменить pending respawns, бросить пропы, запретить pickups.
//! Ownership attribution на границах раунда НЕ сбрасывается.

use bevy::prelude::*;

use super::spawn::SpawnRequested;
use crate::collision::CollisionQueue;
use crate::components::tags::TAG_HELD;
use crate::components::PlayerLife;
use crate::config::{GameRules, NetworkRole, PhysboxConfig, Team};
use crate::ownership::{release_held, HeldProps, PropReleased};
use crate::timer::{Scheduler, TimerKind};

/// Событие: game mode начал раунд
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RoundStarted;

/// Событие: game mode закончил раунд
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RoundEnded;

/// Состояние раунда (видно drain'у: over → урон не наносится)
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundState {
    pub over: bool,
    pub rounds_played: u32,
}

/// Система: OnRoundEnd()
pub fn on_round_ended(
    mut ended: EventReader<RoundEnded>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut round: ResMut<RoundState>,
    mut scheduler: ResMut<Scheduler>,
    mut players: Query<(Entity, &mut PlayerLife)>,
    mut props: HeldProps,
    mut released: EventWriter<PropReleased>,
) {
    if ended.is_empty() {
        return;
    }
    ended.clear();

    if !role.is_authority() {
        return;
    }

    round.over = true;
    let cancelled = scheduler.cancel_kind(TimerKind::Respawn);

    for (entity, mut player) in players.iter_mut() {
        player.can_pickup = false;

        if let Some(prop) = release_held(
            &mut player,
            &mut props,
            &mut scheduler,
            config.ownership_expiry_seconds,
        ) {
            released.write(PropReleased {
                prop,
                holder: entity,
            });
        }
    }

    crate::logger::log_info(&format!(
        "Round ended: {} pending respawns cancelled",
        cancelled
    ));
}

/// Система: OnRoundStart()
///
/// С `use_teams` игрок без команды не спавнится (ждёт team assignment снаружи).
pub fn on_round_started(
    mut started: EventReader<RoundStarted>,
    role: Res<NetworkRole>,
    rules: Res<GameRules>,
    mut round: ResMut<RoundState>,
    mut queue: ResMut<CollisionQueue>,
    mut scheduler: ResMut<Scheduler>,
    mut players: Query<(Entity, &mut PlayerLife)>,
    mut props: HeldProps,
    mut spawns: EventWriter<SpawnRequested>,
) {
    if started.is_empty() {
        return;
    }
    started.clear();

    queue.clear();

    if !role.is_authority() {
        return;
    }

    round.over = false;
    round.rounds_played += 1;
    scheduler.cancel_kind(TimerKind::Respawn);

    // Пропы, оставшиеся в руках, больше никто не держит
    for (mut record, mut tags) in props.iter_mut() {
        record.in_hand = false;
        tags.remove(TAG_HELD);
    }

    let mut spawned = 0;
    for (entity, mut player) in players.iter_mut() {
        player.can_pickup = true;
        player.held_object = None;

        if rules.use_teams && player.team == Team::None {
            continue;
        }

        spawns.write(SpawnRequested { entity });
        spawned += 1;
    }

    crate::logger::log_info(&format!(
        "Round {} started: {} players spawning",
        round.rounds_played, spawned
    ));
}
