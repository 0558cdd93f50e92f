//! Facet-компоненты: по ним classifier определяет ObjectKind
//!
//! - `WorldGeometry` → World (статическая геометрия уровня, mesh)
//! - `PropLife` → Prop
//! - `PlayerLife` → Player

use bevy::prelude::*;
use bevy_rapier3d::prelude::AdditionalMassProperties;
use serde::{Deserialize, Serialize};

use super::life::LifeState;
use super::tags::{Tags, TAG_BREAKABLE_ONLY, TAG_HITBOX, TAG_PLAYER};
use crate::collision::CollisionListener;
use crate::config::Team;
use crate::ownership::OwnershipRecord;

/// Статическая геометрия уровня (map collider / mesh)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct WorldGeometry;

/// Разрушаемый world mesh (не проп): уничтожается сразу при смерти
#[derive(Component, Debug, Clone, Default)]
#[require(WorldGeometry, LifeState)]
pub struct WorldLife {
    pub name: String,
}

/// Stable ID определения пропа (для attribution в DamageRecord)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropDefinitionId(pub u32);

/// Definition пропа (mass override, health, количество обломков)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDefinition {
    pub id: PropDefinitionId,
    pub name: String,
    pub mass: f32,
    pub max_health: u32,
    /// Сколько debris entities появится после разрушения
    pub gib_pieces: u32,
}

impl PropDefinition {
    pub fn new(id: u32, name: impl Into<String>, mass: f32, max_health: u32) -> Self {
        Self {
            id: PropDefinitionId(id),
            name: name.into(),
            mass,
            max_health,
            gib_pieces: 0,
        }
    }

    pub fn with_gibs(mut self, pieces: u32) -> Self {
        self.gib_pieces = pieces;
        self
    }
}

/// Throwable проп
#[derive(Component, Debug, Clone)]
#[require(LifeState, OwnershipRecord, Tags, CollisionListener)]
pub struct PropLife {
    pub definition: PropDefinition,
}

/// Игрок (человек или бот)
#[derive(Component, Debug, Clone)]
#[require(LifeState, CollisionListener)]
pub struct PlayerLife {
    pub name: String,
    pub team: Team,
    pub is_bot: bool,
    /// Урон игнорируется полностью
    pub god_mode: bool,
    pub held_object: Option<Entity>,
    pub hitbox: Option<Entity>,
    pub can_pickup: bool,
}

impl PlayerLife {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: Team::None,
            is_bot: false,
            god_mode: false,
            held_object: None,
            hitbox: None,
            can_pickup: true,
        }
    }

    pub fn bot(name: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::new(name)
        }
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = team;
        self
    }

    pub fn is_human(&self) -> bool {
        !self.is_bot
    }
}

/// Hit volume игрока: отдельный entity (не child), listener проксирует в owner
#[derive(Component, Debug, Clone, Copy)]
pub struct Hitbox {
    pub owner: Entity,
}

/// Память бота о текущей цели
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BotTasks {
    pub interested_player: Option<Entity>,
    pub interested_prop: Option<Entity>,
    pub pickup_attempts_remaining: u32,
    pub throw_attempts_remaining: u32,
    pub max_pickup_attempts: u32,
    pub max_throw_attempts: u32,
}

impl Default for BotTasks {
    fn default() -> Self {
        Self {
            interested_player: None,
            interested_prop: None,
            pickup_attempts_remaining: 3,
            throw_attempts_remaining: 3,
            max_pickup_attempts: 3,
            max_throw_attempts: 3,
        }
    }
}

impl BotTasks {
    /// Забыть всё (бот умер)
    pub fn reset(&mut self) {
        self.interested_player = None;
        self.interested_prop = None;
        self.pickup_attempts_remaining = self.max_pickup_attempts;
        self.throw_attempts_remaining = self.max_throw_attempts;
    }
}

/// Временный ragdoll placeholder умершего игрока
#[derive(Component, Debug, Clone, Copy)]
pub struct Ragdoll {
    pub player: Entity,
}

/// Обломок сломанного пропа
#[derive(Component, Debug, Clone, Copy)]
pub struct Debris {
    pub source: PropDefinitionId,
}

pub fn world_geometry_bundle() -> impl Bundle {
    (WorldGeometry, Tags::default())
}

pub fn world_mesh_bundle(name: impl Into<String>, max_health: u32) -> impl Bundle {
    (
        WorldLife { name: name.into() },
        LifeState::new(max_health),
        Tags::default(),
    )
}

/// Mass override берётся из definition (его читают Prop×Prop и Player×Prop)
pub fn prop_bundle(definition: PropDefinition) -> impl Bundle {
    (
        LifeState::new(definition.max_health),
        AdditionalMassProperties::Mass(definition.mass),
        PropLife { definition },
    )
}

pub fn player_bundle(player: PlayerLife) -> impl Bundle {
    (player, LifeState::new(100), Tags(TAG_PLAYER))
}

pub fn hitbox_bundle(owner: Entity) -> impl Bundle {
    (
        Hitbox { owner },
        Tags(TAG_BREAKABLE_ONLY | TAG_HITBOX),
        CollisionListener::proxied(owner),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_tasks_reset() {
        let mut tasks = BotTasks {
            interested_player: Some(Entity::from_raw(1)),
            interested_prop: Some(Entity::from_raw(2)),
            pickup_attempts_remaining: 0,
            throw_attempts_remaining: 1,
            ..Default::default()
        };
        tasks.reset();
        assert_eq!(tasks, BotTasks::default());
    }

    #[test]
    fn test_required_components_are_inserted() {
        let mut world = World::new();
        let prop = world
            .spawn(prop_bundle(PropDefinition::new(1, "crate", 50.0, 40)))
            .id();

        let entity = world.entity(prop);
        assert!(entity.contains::<OwnershipRecord>());
        assert!(entity.contains::<CollisionListener>());
        assert_eq!(entity.get::<LifeState>().map(|l| l.max_health), Some(40));
    }
}
