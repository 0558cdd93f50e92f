//! Object classification (World → Prop → Player → None)

use bevy::prelude::*;
use serde::Serialize;

use crate::components::{PlayerLife, PropLife, WorldGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    None,
    World,
    Prop,
    Player,
}

/// Query data для classification (только archetype-доступ, без чтения данных)
pub type KindFacets = (Has<WorldGeometry>, Has<PropLife>, Has<PlayerLife>);

/// Первое совпадение побеждает
pub fn classify(is_world: bool, is_prop: bool, is_player: bool) -> ObjectKind {
    if is_world {
        ObjectKind::World
    } else if is_prop {
        ObjectKind::Prop
    } else if is_player {
        ObjectKind::Player
    } else {
        ObjectKind::None
    }
}

/// Despawned / невалидный entity → `ObjectKind::None`
pub fn classify_entity(facets: &Query<KindFacets>, entity: Entity) -> ObjectKind {
    match facets.get(entity) {
        Ok((is_world, is_prop, is_player)) => classify(is_world, is_prop, is_player),
        Err(_) => ObjectKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    #[test]
    fn test_classification_order() {
        assert_eq!(classify(true, true, true), ObjectKind::World);
        assert_eq!(classify(false, true, true), ObjectKind::Prop);
        assert_eq!(classify(false, false, true), ObjectKind::Player);
        assert_eq!(classify(false, false, false), ObjectKind::None);
    }

    #[test]
    fn test_despawned_entity_is_none() {
        let mut world = World::new();
        let wall = world.spawn(WorldGeometry).id();
        let ghost = world.spawn(WorldGeometry).id();
        world.despawn(ghost);

        let mut state: SystemState<Query<KindFacets>> = SystemState::new(&mut world);
        let facets = state.get(&world);

        assert_eq!(classify_entity(&facets, wall), ObjectKind::World);
        assert_eq!(classify_entity(&facets, ghost), ObjectKind::None);
    }
}
