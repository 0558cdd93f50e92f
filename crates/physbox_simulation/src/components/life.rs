//! Life-state: health, immunity window, последний атакующий

use bevy::prelude::*;

use super::PropDefinitionId;

/// Кто кого ударил и чем
///
/// Immutable после создания. `attacker == victim` → suicide,
/// `prop == None` → environmental (падение, мир).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRecord {
    pub attacker: Option<Entity>,
    pub victim: Entity,
    pub prop: Option<PropDefinitionId>,
    pub amount: u32,
}

impl DamageRecord {
    pub fn environmental(victim: Entity, amount: u32) -> Self {
        Self {
            attacker: None,
            victim,
            prop: None,
            amount,
        }
    }

    pub fn is_suicide(&self) -> bool {
        self.attacker == Some(self.victim)
    }

    pub fn is_environmental(&self) -> bool {
        self.prop.is_none()
    }
}

/// Почему урон не был применён
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Dead,
    Immune,
    /// Игрок в god mode (проверяется вызывающим, не LifeState)
    GodMode,
}

/// Результат `LifeState::apply_damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored(IgnoreReason),
    Damaged { remaining: u32 },
    /// Переход Alive → Dead (health ровно 0)
    Killed,
}

impl DamageOutcome {
    pub fn was_applied(&self) -> bool {
        !matches!(self, DamageOutcome::Ignored(_))
    }
}

/// Здоровье entity (игрок, проп, world mesh)
///
/// Инвариант: 0 ≤ health ≤ max_health, max_health > 0.
/// Мутируется только через `apply_damage` и `revive`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct LifeState {
    pub health: u32,
    pub max_health: u32,
    pub damage_immune: bool,
    pub last_attacker: Option<Entity>,
    pub last_death_cause: Option<DamageRecord>,
}

impl Default for LifeState {
    fn default() -> Self {
        Self::new(100)
    }
}

impl LifeState {
    pub fn new(max_health: u32) -> Self {
        let max_health = max_health.max(1);
        Self {
            health: max_health,
            max_health,
            damage_immune: false,
            last_attacker: None,
            last_death_cause: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn apply_damage(&mut self, record: &DamageRecord) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored(IgnoreReason::Dead);
        }
        if self.damage_immune {
            return DamageOutcome::Ignored(IgnoreReason::Immune);
        }

        self.health = self.health.saturating_sub(record.amount);
        self.last_attacker = record.attacker;

        if self.health == 0 {
            self.last_death_cause = Some(*record);
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged {
                remaining: self.health,
            }
        }
    }

    /// Health = max, причина смерти сброшена (immunity выставляет вызывающий)
    pub fn revive(&mut self) {
        self.health = self.max_health;
        self.last_death_cause = None;
    }
}
