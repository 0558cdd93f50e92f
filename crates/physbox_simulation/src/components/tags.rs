//! Semantic tags (битовая маска)
//!
//! ## Теги:
//! - `HELD` (1): проп сейчас в руках игрока
//! - `DEBRIS` (2): обломок сломанного пропа (не ломается, не поднимается)
//! - `NO_BREAK` (4): объект не участвует в collision damage
//! - `PLAYER` (8): корневой entity игрока
//! - `BREAKABLE_ONLY` (16): hitbox игрока (получает удары только от пропов)
//! - `HITBOX` (32): hit volume игрока
//! - `RAGDOLL` (64): временный ragdoll placeholder
//!
//! ## Использование:
//! ```rust
//! use physbox_simulation::components::tags::*;
//!
//! let tags = Tags(TAG_HELD | TAG_DEBRIS);
//! assert!(tags.intersects(DEFAULT_IGNORE_TAGS));
//! ```

use bevy::prelude::*;

pub const TAG_HELD: u32 = 0b1; // 1
pub const TAG_DEBRIS: u32 = 0b10; // 2
pub const TAG_NO_BREAK: u32 = 0b100; // 4
pub const TAG_PLAYER: u32 = 0b1000; // 8
pub const TAG_BREAKABLE_ONLY: u32 = 0b10000; // 16
pub const TAG_HITBOX: u32 = 0b100000; // 32
pub const TAG_RAGDOLL: u32 = 0b1000000; // 64

/// Ignore-filter listener'а по умолчанию
pub const DEFAULT_IGNORE_TAGS: u32 = TAG_HELD | TAG_DEBRIS | TAG_NO_BREAK | TAG_PLAYER;

/// Теги entity (отсутствие компонента == пустой набор)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tags(pub u32);

impl Tags {
    pub fn contains(&self, tag: u32) -> bool {
        self.0 & tag == tag
    }

    pub fn intersects(&self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    pub fn insert(&mut self, tag: u32) {
        self.0 |= tag;
    }

    pub fn remove(&mut self, tag: u32) {
        self.0 &= !tag;
    }
}
