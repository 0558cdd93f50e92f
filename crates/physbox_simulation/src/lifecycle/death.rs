//! Death hooks по kind + cleanup

use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;
use rand::Rng;

use super::{EntityKilled, PlayerDied, PropBroken, WorldMeshDestroyed};
use crate::collision::{CollisionListener, ObjectKind};
use crate::components::tags::{Tags, TAG_DEBRIS, TAG_RAGDOLL};
use crate::components::{BotTasks, Debris, PlayerLife, PropLife, Ragdoll, WorldLife};
use crate::config::PhysboxConfig;
use crate::ownership::{release_held, HeldProps, OwnershipRecord, PropReleased};
use crate::timer::{Scheduler, TimerFired, TimerKey, TimerKind};
use crate::DeterministicRng;

/// Компонент-маркер: entity мертв (health == 0)
///
/// Снимается в Spawn(). Мёртвый проп живёт ещё gib delay до BreakApart.
#[derive(Component, Debug)]
pub struct Dead;

/// Компонент-маркер: деспавн entity после указанного времени
///
/// Ragdoll placeholders и debris. Время: fixed clock (`Time<Fixed>`).
#[derive(Component, Debug)]
pub struct DespawnAfter {
    /// Время деспавна (в секундах от старта симуляции)
    pub despawn_time: f32,
}

/// Система: death hooks
///
/// - Player: ragdoll, drop held prop, hit volume off, bot tasks reset, PlayerDied
/// - Prop: arm BreakApart (debris появятся через gib delay)
/// - World mesh: destroy сразу
pub fn on_entity_killed(
    mut commands: Commands,
    mut killed: EventReader<EntityKilled>,
    config: Res<PhysboxConfig>,
    time: Res<Time<Fixed>>,
    mut scheduler: ResMut<Scheduler>,
    mut players: Query<(&mut PlayerLife, Option<&mut BotTasks>, Has<Dead>)>,
    mut listeners: Query<&mut CollisionListener>,
    mut props: HeldProps,
    worlds: Query<&WorldLife>,
    mut player_died: EventWriter<PlayerDied>,
    mut released: EventWriter<PropReleased>,
    mut destroyed: EventWriter<WorldMeshDestroyed>,
) {
    let now = time.elapsed_secs();

    for event in killed.read() {
        let entity = event.entity;

        match event.kind {
            ObjectKind::Player => {
                let Ok((mut player, bot_tasks, already_dead)) = players.get_mut(entity) else {
                    continue;
                };

                debug_assert!(!already_dead, "death transition on dead player {:?}", entity);
                if already_dead {
                    crate::logger::log_error(&format!(
                        "❌ Player {:?} killed twice without Spawn(), ignored",
                        entity
                    ));
                    continue;
                }

                if let Ok(mut entity_commands) = commands.get_entity(entity) {
                    entity_commands.insert(Dead);
                }

                commands.spawn((
                    Ragdoll { player: entity },
                    Tags(TAG_RAGDOLL),
                    DespawnAfter {
                        despawn_time: now + config.ragdoll_lifetime_seconds,
                    },
                ));

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

                for volume in std::iter::once(entity).chain(player.hitbox) {
                    if let Ok(mut listener) = listeners.get_mut(volume) {
                        listener.enabled = false;
                    }
                }

                if player.is_bot {
                    if let Some(mut tasks) = bot_tasks {
                        tasks.reset();
                    }
                }

                player_died.write(PlayerDied {
                    player: entity,
                    cause: event.cause,
                });

                crate::logger::log_info(&format!(
                    "💀 Player {} died (attacker: {:?}, suicide: {})",
                    player.name,
                    event.cause.attacker,
                    event.cause.is_suicide()
                ));
            }
            ObjectKind::Prop => {
                if let Ok(mut entity_commands) = commands.get_entity(entity) {
                    entity_commands.insert(Dead);
                }
                scheduler.arm(
                    TimerKey::new(entity, TimerKind::BreakApart),
                    config.gib_creation_delay_seconds,
                );
            }
            ObjectKind::World => {
                let name = worlds.get(entity).map(|w| w.name.clone()).unwrap_or_default();

                scheduler.cancel_subject(entity);
                if let Ok(mut entity_commands) = commands.get_entity(entity) {
                    entity_commands.despawn();
                }

                crate::logger::log_info(&format!("World mesh '{}' destroyed", name));
                destroyed.write(WorldMeshDestroyed { entity, name });
            }
            ObjectKind::None => {}
        }
    }
}

/// Система: BreakApart → debris pieces + despawn пропа
pub fn break_apart_props(
    mut commands: Commands,
    mut timers: EventReader<TimerFired>,
    config: Res<PhysboxConfig>,
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    mut scheduler: ResMut<Scheduler>,
    props: Query<(&PropLife, &OwnershipRecord, Option<&Transform>, Option<&Velocity>)>,
    mut holders: Query<&mut PlayerLife>,
    mut broken: EventWriter<PropBroken>,
) {
    let despawn_time = time.elapsed_secs() + config.debris_lifetime_seconds;

    for fired in timers.read() {
        if fired.key.kind != TimerKind::BreakApart || !scheduler.is_current(fired) {
            continue;
        }

        let prop = fired.key.subject;
        let Ok((life, record, transform, velocity)) = props.get(prop) else {
            continue;
        };

        // Сломался прямо в руках → у holder больше нет объекта
        if record.in_hand {
            if let Some(mut holder) = record.held_by.and_then(|h| holders.get_mut(h).ok()) {
                if holder.held_object == Some(prop) {
                    holder.held_object = None;
                }
            }
        }

        let origin = transform.copied().unwrap_or_default();
        let pieces = life.definition.gib_pieces;

        for _ in 0..pieces {
            let scatter = Vec3::new(
                rng.rng.gen_range(-0.5..0.5),
                rng.rng.gen_range(-0.5..0.5),
                rng.rng.gen_range(-0.5..0.5),
            );

            let mut piece = commands.spawn((
                Debris {
                    source: life.definition.id,
                },
                Tags(TAG_DEBRIS),
                origin.with_translation(origin.translation + scatter),
                DespawnAfter { despawn_time },
            ));
            if let Some(velocity) = velocity {
                piece.insert(*velocity);
            }
        }

        scheduler.cancel_subject(prop);
        if let Ok(mut entity_commands) = commands.get_entity(prop) {
            entity_commands.despawn();
        }

        broken.write(PropBroken {
            prop,
            definition: life.definition.id,
            debris: pieces,
        });
    }
}

/// Система: деспавн entities с истёкшим DespawnAfter timeout
pub fn despawn_after_timeout(
    mut commands: Commands,
    query: Query<(Entity, &DespawnAfter)>,
    time: Res<Time<Fixed>>,
) {
    let current_time = time.elapsed_secs();

    for (entity, despawn_after) in query.iter() {
        if current_time >= despawn_after.despawn_time {
            crate::logger::log(&format!("⚰️ Despawning entity {:?} (timeout)", entity));
            commands.entity(entity).despawn();
        }
    }
}
