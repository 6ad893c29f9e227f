//! Game settings loaded once at startup.
//!
//! The settings document is JSON with the field names below. `MSPerFrame`,
//! `RespawnRate`, `UniverseSize` and `Walls` are required; the remaining
//! values fall back to their defaults when absent.

use serde::Deserialize;
use shared::Wall;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSettings {
    #[serde(rename = "MSPerFrame")]
    pub ms_per_frame: u64,
    #[serde(rename = "RespawnRate")]
    pub respawn_rate: u32,
    #[serde(rename = "UniverseSize")]
    pub universe_size: u32,
    #[serde(rename = "Walls")]
    pub walls: Vec<Wall>,

    #[serde(rename = "SnakeSpeed", default = "default_snake_speed")]
    pub snake_speed: u32,
    #[serde(rename = "SnakeStartLength", default = "default_snake_start_length")]
    pub snake_start_length: u32,
    #[serde(rename = "SnakeGrowth", default = "default_snake_growth")]
    pub snake_growth: u32,
    #[serde(rename = "MaxPowerups", default = "default_max_powerups")]
    pub max_powerups: usize,
    #[serde(rename = "MaxPowerupDelay", default = "default_max_powerup_delay")]
    pub max_powerup_delay: u32,
}

fn default_snake_speed() -> u32 {
    3
}

fn default_snake_start_length() -> u32 {
    120
}

fn default_snake_growth() -> u32 {
    12
}

fn default_max_powerups() -> usize {
    20
}

fn default_max_powerup_delay() -> u32 {
    200
}

/// The subset of settings the simulation consults every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRules {
    pub speed: f64,
    pub growth_frames: u32,
    pub respawn_delay: u32,
    pub start_length: f64,
    pub max_powerups: usize,
    pub max_powerup_delay: u32,
}

impl GameSettings {
    /// Reads and validates a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: GameSettings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.universe_size < 2 {
            return Err(SettingsError::Invalid(format!(
                "UniverseSize must be at least 2, got {}",
                self.universe_size
            )));
        }
        if self.ms_per_frame == 0 {
            return Err(SettingsError::Invalid("MSPerFrame must be positive".into()));
        }
        if self.snake_speed == 0 {
            return Err(SettingsError::Invalid("SnakeSpeed must be positive".into()));
        }
        if self.snake_start_length == 0 {
            return Err(SettingsError::Invalid(
                "SnakeStartLength must be positive".into(),
            ));
        }
        if self.max_powerup_delay == 0 {
            return Err(SettingsError::Invalid(
                "MaxPowerupDelay must be positive".into(),
            ));
        }

        let mut ids = HashSet::new();
        for wall in &self.walls {
            if !wall.is_axis_aligned() {
                return Err(SettingsError::Invalid(format!(
                    "wall {} is not axis-aligned",
                    wall.id
                )));
            }
            if !ids.insert(wall.id) {
                return Err(SettingsError::Invalid(format!(
                    "duplicate wall id {}",
                    wall.id
                )));
            }
        }
        Ok(())
    }

    pub fn tick_rules(&self) -> TickRules {
        TickRules {
            speed: self.snake_speed as f64,
            growth_frames: self.snake_growth,
            respawn_delay: self.respawn_rate,
            start_length: self.snake_start_length as f64,
            max_powerups: self.max_powerups,
            max_powerup_delay: self.max_powerup_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "MSPerFrame": 34,
        "RespawnRate": 300,
        "UniverseSize": 2000,
        "Walls": [
            {"wall": 0, "p1": {"X": 0, "Y": 0}, "p2": {"X": 0, "Y": 100}}
        ]
    }"#;

    #[test]
    fn test_defaults_applied() {
        let settings = GameSettings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.ms_per_frame, 34);
        assert_eq!(settings.respawn_rate, 300);
        assert_eq!(settings.universe_size, 2000);
        assert_eq!(settings.walls.len(), 1);
        assert_eq!(settings.snake_speed, 3);
        assert_eq!(settings.snake_start_length, 120);
        assert_eq!(settings.snake_growth, 12);
        assert_eq!(settings.max_powerups, 20);
        assert_eq!(settings.max_powerup_delay, 200);
    }

    #[test]
    fn test_overrides() {
        let text = r#"{
            "MSPerFrame": 16, "RespawnRate": 10, "UniverseSize": 1000, "Walls": [],
            "SnakeSpeed": 6, "SnakeStartLength": 60, "SnakeGrowth": 4,
            "MaxPowerups": 5, "MaxPowerupDelay": 50
        }"#;
        let rules = GameSettings::from_json(text).unwrap().tick_rules();
        assert_eq!(rules.speed, 6.0);
        assert_eq!(rules.start_length, 60.0);
        assert_eq!(rules.growth_frames, 4);
        assert_eq!(rules.respawn_delay, 10);
        assert_eq!(rules.max_powerups, 5);
        assert_eq!(rules.max_powerup_delay, 50);
    }

    #[test]
    fn test_missing_required_field() {
        let text = r#"{"MSPerFrame": 34, "RespawnRate": 300, "Walls": []}"#;
        assert!(matches!(
            GameSettings::from_json(text),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_diagonal_wall() {
        let text = r#"{"MSPerFrame": 34, "RespawnRate": 300, "UniverseSize": 2000,
            "Walls": [{"wall": 0, "p1": {"X": 0, "Y": 0}, "p2": {"X": 50, "Y": 50}}]}"#;
        assert!(matches!(
            GameSettings::from_json(text),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_wall_ids() {
        let text = r#"{"MSPerFrame": 34, "RespawnRate": 300, "UniverseSize": 2000,
            "Walls": [
                {"wall": 1, "p1": {"X": 0, "Y": 0}, "p2": {"X": 0, "Y": 50}},
                {"wall": 1, "p1": {"X": 100, "Y": 0}, "p2": {"X": 100, "Y": 50}}
            ]}"#;
        assert!(matches!(
            GameSettings::from_json(text),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_zero_frame_period() {
        let text = r#"{"MSPerFrame": 0, "RespawnRate": 300, "UniverseSize": 2000, "Walls": []}"#;
        assert!(GameSettings::from_json(text).is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = GameSettings::load("definitely/not/here/settings.json");
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }
}
