//! Spawn / respawn / suicide

use bevy::prelude::*;

use super::death::Dead;
use super::PlayerSpawned;
use crate::collision::{CollisionListener, ObjectKind};
use crate::components::{
    hitbox_bundle, player_bundle, DamageRecord, LifeState, PlayerLife, PropLife,
};
use crate::config::{NetworkRole, PhysboxConfig};
use crate::damage::{damage_player, DamageReport};
use crate::ownership::{release_held, HeldProps, PropReleased};
use crate::timer::{Scheduler, TimerFired, TimerHandle, TimerKey, TimerKind};

/// Запрос: немедленный Spawn() (игрок или проп)
#[derive(Event, Debug, Clone, Copy)]
pub struct SpawnRequested {
    pub entity: Entity,
}

/// Запрос: Spawn() игрока после `player_respawn_delay_seconds`
#[derive(Event, Debug, Clone, Copy)]
pub struct RespawnRequested {
    pub player: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct SuicideRequested {
    pub player: Entity,
}

/// Создаёт игрока + отдельный hitbox entity (listener проксирует в игрока)
pub fn spawn_player(commands: &mut Commands, mut player: PlayerLife) -> (Entity, Entity) {
    let player_entity = commands.spawn_empty().id();
    let hitbox = commands.spawn(hitbox_bundle(player_entity)).id();

    player.hitbox = Some(hitbox);
    commands.entity(player_entity).insert(player_bundle(player));

    (player_entity, hitbox)
}

/// Re-arm respawn таймера: предыдущий pending respawn инвалидируется
pub fn request_respawn(scheduler: &mut Scheduler, player: Entity, delay_secs: f32) -> TimerHandle {
    scheduler.arm(TimerKey::new(player, TimerKind::Respawn), delay_secs)
}

/// Система: RespawnRequested → Respawn таймер
pub fn handle_respawn_requests(
    mut requests: EventReader<RespawnRequested>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut scheduler: ResMut<Scheduler>,
    players: Query<(), With<PlayerLife>>,
) {
    if !role.is_authority() {
        requests.clear();
        return;
    }

    for request in requests.read() {
        if !players.contains(request.player) {
            continue;
        }

        request_respawn(&mut scheduler, request.player, config.player_respawn_delay_seconds);
        crate::logger::log(&format!(
            "RequestRespawn: {:?} in {:.1}s",
            request.player, config.player_respawn_delay_seconds
        ));
    }
}

/// Система: SuicideRequested → летальный урон с attacker == victim
pub fn handle_suicide_requests(
    mut requests: EventReader<SuicideRequested>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut players: Query<(&PlayerLife, &mut LifeState)>,
    mut report: DamageReport,
) {
    if !role.is_authority() {
        requests.clear();
        return;
    }

    for request in requests.read() {
        let Ok((player, mut life)) = players.get_mut(request.player) else {
            continue;
        };

        let record = DamageRecord {
            attacker: Some(request.player),
            victim: request.player,
            prop: None,
            amount: config.suicide_damage,
        };

        let outcome = damage_player(player, &mut life, &record);
        report.report(request.player, ObjectKind::Player, record, outcome);
    }
}

/// Система: Spawn() для всех источников этого tick
///
/// Источники (в этом порядке): SpawnRequested, сработавшие Respawn таймеры,
/// только что созданные пропы. Один entity спавнится максимум раз за tick.
pub fn process_spawns(
    mut commands: Commands,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut scheduler: ResMut<Scheduler>,
    mut requests: EventReader<SpawnRequested>,
    mut timers: EventReader<TimerFired>,
    new_props: Query<Entity, Added<PropLife>>,
    mut lives: Query<(&mut LifeState, Option<&mut PlayerLife>, Has<PropLife>)>,
    mut listeners: Query<&mut CollisionListener>,
    mut props: HeldProps,
    mut spawned: EventWriter<PlayerSpawned>,
    mut released: EventWriter<PropReleased>,
) {
    if !role.is_authority() {
        requests.clear();
        timers.clear();
        return;
    }

    let mut pending: Vec<Entity> = requests.read().map(|request| request.entity).collect();
    pending.extend(
        timers
            .read()
            .filter(|fired| fired.key.kind == TimerKind::Respawn && scheduler.is_current(fired))
            .map(|fired| fired.key.subject),
    );
    pending.extend(new_props.iter());

    let mut done: Vec<Entity> = Vec::with_capacity(pending.len());

    for entity in pending {
        if done.contains(&entity) {
            continue;
        }
        done.push(entity);

        let Ok((mut life, player, is_prop)) = lives.get_mut(entity) else {
            continue;
        };

        life.revive();
        life.damage_immune = true;

        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.remove::<Dead>();
        }

        if let Some(mut player) = player {
            scheduler.cancel(TimerKey::new(entity, TimerKind::Respawn));
            scheduler.arm(
                TimerKey::new(entity, TimerKind::DamageImmunity),
                config.player_respawn_immunity_seconds,
            );

            // Проп в руках отпускается как при смерти: attribution живёт до expiry
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

            // Hit volume обратно включён
            for volume in std::iter::once(entity).chain(player.hitbox) {
                if let Ok(mut listener) = listeners.get_mut(volume) {
                    listener.enabled = true;
                }
            }

            spawned.write(PlayerSpawned { player: entity });
            crate::logger::log_info(&format!("Spawn: player {} ({:?})", player.name, entity));
        } else if is_prop {
            scheduler.arm(
                TimerKey::new(entity, TimerKind::DamageImmunity),
                config.prop_damage_immunity_seconds,
            );
        } else {
            // World mesh: без grace window
            life.damage_immune = false;
        }
    }
}

/// Система: конец grace window после Spawn()
///
/// Spawn() этого же tick перевзводит таймер: старое событие уже stale.
pub fn clear_damage_immunity(
    mut timers: EventReader<TimerFired>,
    scheduler: Res<Scheduler>,
    mut lives: Query<&mut LifeState>,
) {
    for fired in timers.read() {
        if fired.key.kind != TimerKind::DamageImmunity || !scheduler.is_current(fired) {
            continue;
        }

        if let Ok(mut life) = lives.get_mut(fired.key.subject) {
            life.damage_immune = false;
        }
    }
}
