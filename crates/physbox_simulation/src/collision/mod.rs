//! Collision capture module
//!
//! ECS ответственность:
//! - Listener'ы: proxy, recently-hit cooldown, ignore-теги
//! - CollisionQueue: dedup неупорядоченных пар
//! - Classification: ObjectKind по facet-компонентам
//!
//! Физика (rapier / внешний контроллер) ответственность:
//! - Детекция контактов → `ContactReport` / `LandingReport`

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent as RapierCollisionEvent;

pub mod classify;
pub mod event;
pub mod listener;
pub mod queue;
pub mod rapier_bridge;

pub use classify::{classify, classify_entity, KindFacets, ObjectKind};
pub use event::CollisionEvent;
pub use listener::{CollisionListener, ContactReport, LandingReport};
pub use queue::CollisionQueue;

use crate::PhysboxSet;

/// Collision Plugin
///
/// Порядок выполнения:
/// 1. expire_recent_hits: снятие cooldown (Requests)
/// 2. bridge_rapier_contacts → process_contact_reports → register_landings (Contacts)
pub struct CollisionPlugin;

impl Plugin for CollisionPlugin {
    fn build(&self, app: &mut App) {
        // Rapier event регистрируем сами: RapierPhysicsPlugin может отсутствовать (headless)
        app.add_event::<RapierCollisionEvent>()
            .add_event::<ContactReport>()
            .add_event::<LandingReport>()
            .init_resource::<CollisionQueue>();

        app.add_systems(
            FixedUpdate,
            listener::expire_recent_hits.in_set(PhysboxSet::Requests),
        );

        app.add_systems(
            FixedUpdate,
            (
                rapier_bridge::bridge_rapier_contacts,
                listener::process_contact_reports,
                listener::register_landings,
            )
                .chain()
                .in_set(PhysboxSet::Contacts),
        );
    }
}
