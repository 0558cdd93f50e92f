//! Pair dispatch table: (ObjectKind, ObjectKind) → handler + orientation

use crate::collision::ObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairHandler {
    /// (prop, world)
    PropWorld,
    /// (prop, prop)
    PropProp,
    /// (player, world)
    PlayerWorld,
    /// (player, prop)
    PlayerProp,
}

/// Выбранный handler и нужно ли поменять endpoints местами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub handler: PairHandler,
    /// true → handler вызывается с (b, a)
    pub swapped: bool,
}

impl Dispatch {
    fn direct(handler: PairHandler) -> Option<Self> {
        Some(Self {
            handler,
            swapped: false,
        })
    }

    fn reversed(handler: PairHandler) -> Option<Self> {
        Some(Self {
            handler,
            swapped: true,
        })
    }

    /// Endpoints в порядке, который ожидает handler
    pub fn order<T>(&self, a: T, b: T) -> (T, T) {
        if self.swapped {
            (b, a)
        } else {
            (a, b)
        }
    }
}

/// None → пара не обрабатывается (None-kind, World×World, Player×Player)
pub fn dispatch(a: ObjectKind, b: ObjectKind) -> Option<Dispatch> {
    use ObjectKind as K;

    match (a, b) {
        (K::Prop, K::World) => Dispatch::direct(PairHandler::PropWorld),
        (K::World, K::Prop) => Dispatch::reversed(PairHandler::PropWorld),
        (K::Player, K::World) => Dispatch::direct(PairHandler::PlayerWorld),
        (K::World, K::Player) => Dispatch::reversed(PairHandler::PlayerWorld),
        (K::Player, K::Prop) => Dispatch::direct(PairHandler::PlayerProp),
        (K::Prop, K::Player) => Dispatch::reversed(PairHandler::PlayerProp),
        (K::Prop, K::Prop) => Dispatch::direct(PairHandler::PropProp),
        (K::World, K::World) | (K::Player, K::Player) => None,
        (K::None, _) | (_, K::None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ObjectKind; 4] = [
        ObjectKind::None,
        ObjectKind::World,
        ObjectKind::Prop,
        ObjectKind::Player,
    ];

    #[test]
    fn test_asymmetric_pairs_resolve_both_orientations() {
        let direct = dispatch(ObjectKind::Player, ObjectKind::Prop).unwrap();
        let reversed = dispatch(ObjectKind::Prop, ObjectKind::Player).unwrap();

        assert_eq!(direct.handler, PairHandler::PlayerProp);
        assert_eq!(reversed.handler, PairHandler::PlayerProp);
        assert_eq!(direct.order("player", "prop"), ("player", "prop"));
        assert_eq!(reversed.order("prop", "player"), ("player", "prop"));
    }

    #[test]
    fn test_handler_is_order_independent() {
        for a in ALL {
            for b in ALL {
                let forward = dispatch(a, b).map(|d| d.handler);
                let backward = dispatch(b, a).map(|d| d.handler);
                assert_eq!(forward, backward, "pair ({:?}, {:?})", a, b);
            }
        }
    }

    #[test]
    fn test_none_kind_never_dispatches() {
        for kind in ALL {
            assert!(dispatch(ObjectKind::None, kind).is_none());
            assert!(dispatch(kind, ObjectKind::None).is_none());
        }
        assert!(dispatch(ObjectKind::World, ObjectKind::World).is_none());
        assert!(dispatch(ObjectKind::Player, ObjectKind::Player).is_none());
    }
}
