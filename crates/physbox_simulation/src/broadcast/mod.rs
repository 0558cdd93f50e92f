//! Broadcast adapter: domain events → host transport
//!
//! Ядро не знает про сеть. Хост подставляет `Broadcaster` (reliable RPC,
//! replay recorder, ...) в `BroadcastSink`; без него события просто не
//! уходят наружу. Entity передаются как `u64` (`Entity::to_bits`).

use bevy::prelude::*;
use serde::Serialize;

use crate::collision::ObjectKind;
use crate::lifecycle::{
    DamageApplied, HitConfirmed, PlayerDied, PlayerSpawned, PropBroken, WorldMeshDestroyed,
};
use crate::ownership::{ClearReason, OwnershipCleared, PropPickedUp, PropReleased};
use crate::PhysboxSet;

/// Mirrored state change для observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum LifecycleBroadcast {
    Damaged {
        victim: u64,
        kind: ObjectKind,
        amount: u32,
        remaining: u32,
    },
    PlayerDied {
        player: u64,
        attacker: Option<u64>,
        suicide: bool,
    },
    PlayerSpawned {
        player: u64,
    },
    PropBroken {
        prop: u64,
        debris: u32,
    },
    WorldMeshDestroyed {
        entity: u64,
        name: String,
    },
    PropHeld {
        prop: u64,
        holder: u64,
    },
    /// Проп отпущен, attribution `holder` сохраняется до `OwnershipCleared`
    PropReleased {
        prop: u64,
        holder: u64,
    },
    OwnershipCleared {
        prop: u64,
        reason: ClearReason,
    },
    HitConfirmed {
        attacker: u64,
        victim: u64,
        amount: u32,
    },
}

/// Reliable broadcast primitive хоста
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, message: &LifecycleBroadcast);
}

#[derive(Resource, Default)]
pub struct BroadcastSink {
    broadcaster: Option<Box<dyn Broadcaster>>,
}

impl BroadcastSink {
    pub fn new(broadcaster: Box<dyn Broadcaster>) -> Self {
        Self {
            broadcaster: Some(broadcaster),
        }
    }

    pub fn set(&mut self, broadcaster: Box<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    pub fn is_connected(&self) -> bool {
        self.broadcaster.is_some()
    }

    pub fn send(&self, message: LifecycleBroadcast) {
        if let Some(broadcaster) = self.broadcaster.as_ref() {
            broadcaster.broadcast(&message);
        }
    }
}

/// Система: переслать события этого tick в sink
pub fn forward_lifecycle_events(
    sink: Res<BroadcastSink>,
    mut damaged: EventReader<DamageApplied>,
    mut died: EventReader<PlayerDied>,
    mut spawned: EventReader<PlayerSpawned>,
    mut broken: EventReader<PropBroken>,
    mut destroyed: EventReader<WorldMeshDestroyed>,
    mut picked_up: EventReader<PropPickedUp>,
    mut released: EventReader<PropReleased>,
    mut cleared: EventReader<OwnershipCleared>,
    mut hits: EventReader<HitConfirmed>,
) {
    if !sink.is_connected() {
        damaged.clear();
        died.clear();
        spawned.clear();
        broken.clear();
        destroyed.clear();
        picked_up.clear();
        released.clear();
        cleared.clear();
        hits.clear();
        return;
    }

    for event in damaged.read() {
        sink.send(LifecycleBroadcast::Damaged {
            victim: event.victim.to_bits(),
            kind: event.kind,
            amount: event.record.amount,
            remaining: event.remaining,
        });
    }

    for event in died.read() {
        sink.send(LifecycleBroadcast::PlayerDied {
            player: event.player.to_bits(),
            attacker: event.cause.attacker.map(Entity::to_bits),
            suicide: event.cause.is_suicide(),
        });
    }

    for event in spawned.read() {
        sink.send(LifecycleBroadcast::PlayerSpawned {
            player: event.player.to_bits(),
        });
    }

    for event in broken.read() {
        sink.send(LifecycleBroadcast::PropBroken {
            prop: event.prop.to_bits(),
            debris: event.debris,
        });
    }

    for event in destroyed.read() {
        sink.send(LifecycleBroadcast::WorldMeshDestroyed {
            entity: event.entity.to_bits(),
            name: event.name.clone(),
        });
    }

    for event in picked_up.read() {
        sink.send(LifecycleBroadcast::PropHeld {
            prop: event.prop.to_bits(),
            holder: event.holder.to_bits(),
        });
    }

    for event in released.read() {
        sink.send(LifecycleBroadcast::PropReleased {
            prop: event.prop.to_bits(),
            holder: event.holder.to_bits(),
        });
    }

    for event in cleared.read() {
        sink.send(LifecycleBroadcast::OwnershipCleared {
            prop: event.prop.to_bits(),
            reason: event.reason,
        });
    }

    for event in hits.read() {
        sink.send(LifecycleBroadcast::HitConfirmed {
            attacker: event.attacker.to_bits(),
            victim: event.victim.to_bits(),
            amount: event.amount,
        });
    }
}

pub struct BroadcastPlugin;

impl Plugin for BroadcastPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BroadcastSink>();

        app.add_systems(
            FixedUpdate,
            forward_lifecycle_events.in_set(PhysboxSet::Broadcast),
        );
    }
}
