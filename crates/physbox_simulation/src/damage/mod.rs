//! Collision damage module
//!
//! ECS ответственность:
//! - Dispatch: (ObjectKind, ObjectKind) → handler
//! - Формулы урона (speed / mass → u32)
//! - Mode rules: friendly fire, Dodgeball instant elimination, fall damage toggle
//!
//! Один drain за tick в `PhysboxSet::Resolve`.

use bevy::prelude::*;

pub mod dispatch;
pub mod formulas;
pub mod systems;


pub use dispatch::{dispatch, Dispatch, PairHandler};
pub use formulas::{
    fall_damage, player_impact_damage, prop_impact_damage, prop_prop_damage, prop_world_damage,
};
pub use systems::{damage_player, drain_and_process, mass_override, CollisionResolver, DamageReport};

use crate::PhysboxSet;

pub struct DamagePlugin;

impl Plugin for DamagePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            systems::drain_and_process.in_set(PhysboxSet::Resolve),
        );
    }
}
