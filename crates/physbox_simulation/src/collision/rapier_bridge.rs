//! Мост bevy_rapier3d → ContactReport
//!
//! Физический step крутит хост (RapierPhysicsPlugin), симуляция только
//! слушает `CollisionEvent::Started` и переводит его в отчёты по сторонам.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionEvent as RapierCollisionEvent, Velocity};

use super::listener::ContactReport;

/// Скорость сближения = |v_a - v_b| (нет Velocity → статическое тело)
pub fn closing_speed(a: Option<&Velocity>, b: Option<&Velocity>) -> f32 {
    let va = a.map(|v| v.linvel).unwrap_or(Vec3::ZERO);
    let vb = b.map(|v| v.linvel).unwrap_or(Vec3::ZERO);
    (va - vb).length()
}

/// Система: rapier Started → два ContactReport (по одному на сторону)
///
/// Stopped события игнорируются: урон считается только на входе в контакт.
pub fn bridge_rapier_contacts(
    mut rapier_events: EventReader<RapierCollisionEvent>,
    velocities: Query<&Velocity>,
    mut reports: EventWriter<ContactReport>,
) {
    for event in rapier_events.read() {
        let (a, b) = match event {
            RapierCollisionEvent::Started(a, b, _flags) => (*a, *b),
            RapierCollisionEvent::Stopped(..) => continue,
        };

        let speed = closing_speed(velocities.get(a).ok(), velocities.get(b).ok());

        reports.write(ContactReport {
            listener: a,
            other: b,
            closing_speed: speed,
        });
        reports.write(ContactReport {
            listener: b,
            other: a,
            closing_speed: speed,
        });
    }
}
