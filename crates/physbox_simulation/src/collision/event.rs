//! Неупорядоченная пара столкнувшихся entity

use bevy::prelude::*;
use std::hash::{Hash, Hasher};

/// Collision event: `{a, b}` + абсолютная скорость
///
/// Равенство симметрично: `{a, b} == {b, a}`. Скорость в равенстве
/// не участвует: дубликат пары схлопывается независимо от скорости.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
    /// ≥ 0
    pub speed: f32,
}

impl CollisionEvent {
    pub fn new(a: Entity, b: Entity, speed: f32) -> Self {
        Self {
            a,
            b,
            speed: speed.abs(),
        }
    }

    /// Канонический порядок (min, max) для hash / dedup
    pub fn pair(&self) -> (Entity, Entity) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    pub fn involves(&self, entity: Entity) -> bool {
        self.a == entity || self.b == entity
    }
}

impl PartialEq for CollisionEvent {
    fn eq(&self, other: &Self) -> bool {
        self.pair() == other.pair()
    }
}

impl Eq for CollisionEvent {}

impl Hash for CollisionEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pair().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(event: &CollisionEvent) -> u64 {
        let mut hasher = DefaultHasher::new();
        event.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_is_symmetric() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);

        let ab = CollisionEvent::new(a, b, 300.0);
        let ba = CollisionEvent::new(b, a, 120.0);

        assert_eq!(ab, ba);
        assert_eq!(hash_of(&ab), hash_of(&ba));
        assert_ne!(ab, CollisionEvent::new(a, Entity::from_raw(3), 300.0));
    }

    #[test]
    fn test_speed_is_absolute() {
        let event = CollisionEvent::new(Entity::from_raw(1), Entity::from_raw(2), -250.0);
        assert_eq!(event.speed, 250.0);
    }
}
