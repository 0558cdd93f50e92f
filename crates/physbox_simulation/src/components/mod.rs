//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - life: health, immunity, DamageRecord
//! - kinds: facet-компоненты (WorldGeometry, PropLife, PlayerLife) + bundles
//! - tags: semantic теги (held, debris, player, ...)

pub mod kinds;
pub mod life;
pub mod tags;

// Re-exports для удобного импорта
pub use kinds::*;
pub use life::*;
pub use tags::*;
