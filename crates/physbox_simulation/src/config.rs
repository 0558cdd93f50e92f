//! Тюнинг симуляции + правила режима
//!
//! Все значения читаются системами из resources каждый tick, поэтому
//! хост может менять их между раундами без пересоздания App.

use anyhow::{Context, Result};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Числовые пороги и интервалы (все времена в секундах)
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysboxConfig {
    /// Минимальная скорость, при которой объект наносит урон
    pub damage_speed_threshold: f32,
    /// Минимальная скорость приземления для fall damage
    pub fall_speed_threshold: f32,
    /// Зарезервировано: в текущих правилах порог скорости действует всегда
    pub props_always_damage_players: bool,
    pub gib_creation_delay_seconds: f32,
    pub prop_damage_immunity_seconds: f32,
    pub player_respawn_immunity_seconds: f32,
    pub player_respawn_delay_seconds: f32,
    pub ownership_expiry_seconds: f32,
    pub recent_hit_cooldown_seconds: f32,
    /// Приземления с меньшей высоты не регистрируются вообще
    pub min_fall_distance: f32,
    /// Урон игроку от пропа в Dodgeball
    pub instant_elimination_damage: u32,
    pub suicide_damage: u32,
    pub debris_lifetime_seconds: f32,
    pub ragdoll_lifetime_seconds: f32,
    /// Лог каждого обработанного collision event
    pub verbose_collision_logging: bool,
    /// Лог количества событий за drain
    pub print_collision_iterations: bool,
}

impl Default for PhysboxConfig {
    fn default() -> Self {
        Self {
            damage_speed_threshold: 100.0,
            fall_speed_threshold: 500.0,
            props_always_damage_players: true,
            gib_creation_delay_seconds: 0.15,
            prop_damage_immunity_seconds: 1.0,
            player_respawn_immunity_seconds: 3.0,
            player_respawn_delay_seconds: 3.0,
            ownership_expiry_seconds: 5.0,
            recent_hit_cooldown_seconds: 1.0,
            min_fall_distance: 200.0,
            instant_elimination_damage: 100,
            suicide_damage: 9999,
            debris_lifetime_seconds: 3.0,
            ragdoll_lifetime_seconds: 8.0,
            verbose_collision_logging: false,
            print_collision_iterations: false,
        }
    }
}

impl PhysboxConfig {
    /// Отрицательные / NaN значения → 0 (пороги и интервалы не бывают < 0)
    pub fn clamped(mut self) -> Self {
        for value in [
            &mut self.damage_speed_threshold,
            &mut self.fall_speed_threshold,
            &mut self.gib_creation_delay_seconds,
            &mut self.prop_damage_immunity_seconds,
            &mut self.player_respawn_immunity_seconds,
            &mut self.player_respawn_delay_seconds,
            &mut self.ownership_expiry_seconds,
            &mut self.recent_hit_cooldown_seconds,
            &mut self.min_fall_distance,
            &mut self.debris_lifetime_seconds,
            &mut self.ragdoll_lifetime_seconds,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Deathmatch,
    /// Instant elimination: любое попадание брошенным пропом убивает
    Dodgeball,
    Tutorial,
}

impl GameMode {
    pub fn is_instant_elimination(&self) -> bool {
        matches!(self, GameMode::Dodgeball)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[default]
    None,
    Red,
    Blue,
}

/// Правила текущего матча
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub mode: GameMode,
    pub use_teams: bool,
    pub friendly_fire: bool,
    pub use_fall_damage: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            mode: GameMode::Deathmatch,
            use_teams: false,
            friendly_fire: false,
            use_fall_damage: true,
        }
    }
}

impl GameRules {
    /// true → урон между этими командами запрещён
    pub fn vetoes_team_damage(&self, attacker: Team, victim: Team) -> bool {
        self.use_teams && !self.friendly_fire && attacker == victim
    }
}

/// Кто владеет симуляцией на этом instance
///
/// Только Host регистрирует контакты и мутирует life-state/ownership.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkRole {
    #[default]
    Host,
    Observer,
}

impl NetworkRole {
    pub fn is_authority(&self) -> bool {
        matches!(self, NetworkRole::Host)
    }
}

/// TOML файл конфигурации (`[tuning]` + `[rules]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub tuning: PhysboxConfig,
    pub rules: GameRules,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut file: ConfigFile = toml::from_str(text).context("parse physbox config TOML")?;
        file.tuning = file.tuning.clamped();
        Ok(file)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read physbox config: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("load physbox config: {}", path.display()))
    }

    /// Нет файла → defaults; битый файл → defaults + warning в лог
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(file) => file,
            Err(err) => {
                crate::logger::log_warning(&format!("⚠️ {:#}; falling back to defaults", err));
                Self::default()
            }
        }
    }
}
