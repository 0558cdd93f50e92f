//! Deduplicating FIFO очередь collision events
//!
//! Заполняется listener'ами в течение tick, дренируется один раз за tick
//! в `damage::drain_and_process`.

use bevy::prelude::*;
use std::collections::{HashSet, VecDeque};

use super::event::CollisionEvent;

#[derive(Resource, Debug, Default)]
pub struct CollisionQueue {
    events: VecDeque<CollisionEvent>,
    // Канонические пары, сейчас стоящие в очереди
    queued: HashSet<(Entity, Entity)>,
}

impl CollisionQueue {
    /// Единственная точка входа в очередь.
    ///
    /// Возвращает false, если событие отброшено: та же пара уже в очереди
    /// (побеждает первая скорость), self-collision или невалидная скорость.
    pub fn register(&mut self, a: Entity, b: Entity, speed: f32) -> bool {
        if a == b {
            return false;
        }

        if !speed.is_finite() {
            crate::logger::log_warning(&format!(
                "⚠️ CollisionQueue: non-finite speed {} for ({:?}, {:?}), dropped",
                speed, a, b
            ));
            return false;
        }

        let event = CollisionEvent::new(a, b, speed);
        if !self.queued.insert(event.pair()) {
            return false;
        }

        self.events.push_back(event);
        true
    }

    /// FIFO pop (порядок регистрации)
    pub fn pop(&mut self) -> Option<CollisionEvent> {
        let event = self.events.pop_front()?;
        self.queued.remove(&event.pair());
        Some(event)
    }

    pub fn contains(&self, a: Entity, b: Entity) -> bool {
        self.queued.contains(&CollisionEvent::new(a, b, 0.0).pair())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.queued.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.iter()
    }
}
