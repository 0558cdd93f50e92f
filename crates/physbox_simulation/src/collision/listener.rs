//! Collision listeners: raw contacts → CollisionQueue
//!
//! Каждый участвующий entity имеет `CollisionListener`. Физика (или
//! `rapier_bridge`) публикует `ContactReport` на каждую сторону нового
//! контакта; здесь разрешаются proxy, recently-hit cooldown и ignore-теги.

use bevy::prelude::*;
use std::collections::HashSet;

use super::queue::CollisionQueue;
use crate::components::tags::{Tags, DEFAULT_IGNORE_TAGS};
use crate::config::{NetworkRole, PhysboxConfig};
use crate::timer::{Scheduler, TimerFired, TimerKey, TimerKind};

/// Listener столкновений entity
#[derive(Component, Debug, Clone)]
pub struct CollisionListener {
    /// Вместо self регистрируется proxy (hitbox → игрок)
    pub proxy: Option<Entity>,
    /// Контакт с entity, несущим любой из этих тегов, игнорируется
    pub ignore_tags: u32,
    /// false → hit volume выключен (игрок мёртв)
    pub enabled: bool,
    /// Entity, ударившие нас недавно (снимаются по `TimerKind::RecentHit`)
    pub recently_hit: HashSet<Entity>,
}

impl Default for CollisionListener {
    fn default() -> Self {
        Self {
            proxy: None,
            ignore_tags: DEFAULT_IGNORE_TAGS,
            enabled: true,
            recently_hit: HashSet::new(),
        }
    }
}

impl CollisionListener {
    pub fn proxied(proxy: Entity) -> Self {
        Self {
            proxy: Some(proxy),
            ..Default::default()
        }
    }

    /// Отмечает `other` как недавно ударившего; false если уже был отмечен
    fn note_hit(
        &mut self,
        listener: Entity,
        other: Entity,
        scheduler: &mut Scheduler,
        cooldown_secs: f32,
    ) -> bool {
        if !self.recently_hit.insert(other) {
            return false;
        }
        scheduler.arm(TimerKey::new(listener, TimerKind::RecentHit(other)), cooldown_secs);
        true
    }
}

/// Событие: физика сообщила о новом контакте (одна сторона пары)
#[derive(Event, Debug, Clone, Copy)]
pub struct ContactReport {
    /// Entity, чей listener получил контакт
    pub listener: Entity,
    pub other: Entity,
    /// Знак не важен, в очередь попадает модуль
    pub closing_speed: f32,
}

/// Событие: character controller приземлился
///
/// Приходит от контроллера игрока, а не от контакта коллайдера.
#[derive(Event, Debug, Clone, Copy)]
pub struct LandingReport {
    pub player: Entity,
    pub ground: Entity,
    pub fall_distance: f32,
    pub impact_speed: f32,
}

/// Система: ContactReport → CollisionQueue (только на authority)
pub fn process_contact_reports(
    mut reports: EventReader<ContactReport>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut listeners: Query<&mut CollisionListener>,
    tags: Query<&Tags>,
    mut queue: ResMut<CollisionQueue>,
    mut scheduler: ResMut<Scheduler>,
) {
    if !role.is_authority() {
        reports.clear();
        return;
    }

    for report in reports.read() {
        // Proxy другой стороны (и её hit volume) читаем до mutable доступа к своему listener
        let (other, other_enabled) = match listeners.get(report.other) {
            Ok(other_listener) => (
                other_listener.proxy.unwrap_or(report.other),
                other_listener.enabled,
            ),
            Err(_) => (report.other, true),
        };

        if !other_enabled {
            continue;
        }

        let Ok(mut listener) = listeners.get_mut(report.listener) else {
            continue;
        };

        if !listener.enabled {
            continue;
        }

        let this = listener.proxy.unwrap_or(report.listener);

        if listener.recently_hit.contains(&other) {
            continue;
        }

        let other_tags = tags.get(other).copied().unwrap_or_default();
        if other_tags.intersects(listener.ignore_tags) {
            continue;
        }

        listener.note_hit(
            report.listener,
            other,
            &mut scheduler,
            config.recent_hit_cooldown_seconds,
        );

        queue.register(this, other, report.closing_speed);
    }
}

/// Система: LandingReport → CollisionQueue (fall damage path)
///
/// Теги и proxy не проверяются: земля под игроком всегда регистрируется,
/// если падение было достаточно высоким и быстрым.
pub fn register_landings(
    mut landings: EventReader<LandingReport>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut listeners: Query<&mut CollisionListener>,
    mut queue: ResMut<CollisionQueue>,
    mut scheduler: ResMut<Scheduler>,
) {
    if !role.is_authority() {
        landings.clear();
        return;
    }

    for landing in landings.read() {
        if landing.fall_distance < config.min_fall_distance {
            continue;
        }

        let speed = landing.impact_speed.abs();
        if !(speed >= config.fall_speed_threshold) {
            continue;
        }

        if let Ok(mut listener) = listeners.get_mut(landing.player) {
            let fresh = listener.note_hit(
                landing.player,
                landing.ground,
                &mut scheduler,
                config.recent_hit_cooldown_seconds,
            );
            if !fresh {
                continue;
            }
        }

        queue.register(landing.player, landing.ground, speed);
    }
}

/// Система: снять истёкшие recently-hit записи
pub fn expire_recent_hits(
    mut timers: EventReader<TimerFired>,
    scheduler: Res<Scheduler>,
    mut listeners: Query<&mut CollisionListener>,
) {
    for fired in timers.read() {
        let TimerKind::RecentHit(other) = fired.key.kind else {
            continue;
        };
        if !scheduler.is_current(fired) {
            continue;
        }

        if let Ok(mut listener) = listeners.get_mut(fired.key.subject) {
            listener.recently_hit.remove(&other);
        }
    }
}
