//! Match tuning loaded from RON.
//!
//! Every constant the simulation draws on lives here so that a balance pass
//! never touches code. Ranges are closed `(min, max)` pairs in seconds or
//! multipliers.
//!
//! # Example RON
//!
//! ```ron
//! MatchConfig(
//!     tick_rate: 20,
//!     warmup_secs: (3.0, 7.0),
//!     retarget_secs: (5.0, 20.0),
//!     spawn_jitter: (0.9, 1.2),
//!     outcome_delay_secs: 1.5,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_from_f64, Fixed};

/// Tuning for a match. Missing fields in a RON file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Delay before a tower's first spawn.
    pub warmup_secs: (f64, f64),
    /// Wait between automatic retargets of AI towers.
    pub retarget_secs: (f64, f64),
    /// Multiplier applied to the spawn interval after every spawn cycle.
    pub spawn_jitter: (f64, f64),
    /// Multiplier applied to a tower's nominal unit speed for each unit.
    pub unit_speed_jitter: (f64, f64),
    /// Delay between a win/lose outcome and the level transition.
    pub outcome_delay_secs: f64,
    /// Health a tower is left with right after being captured.
    pub capture_health: i32,
    /// Health of a freshly spawned unit.
    pub unit_health: i32,
    /// Damage a unit deals to the body it touches.
    pub contact_damage: i32,
    /// Contact radius of a tower.
    pub tower_radius: f64,
    /// Contact radius of a unit.
    pub unit_radius: f64,
    /// Music volume in `[0, 1]`.
    pub music_volume: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            warmup_secs: (3.0, 7.0),
            retarget_secs: (5.0, 20.0),
            spawn_jitter: (0.9, 1.2),
            unit_speed_jitter: (0.8, 1.2),
            outcome_delay_secs: 1.5,
            capture_health: 1,
            unit_health: 1,
            contact_damage: 1,
            tower_radius: 1.0,
            unit_radius: 0.25,
            music_volume: 0.5,
        }
    }
}

impl MatchConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value can be simulated.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(GameError::InvalidData("tick_rate must be positive".into()));
        }
        for (name, (min, max)) in [
            ("warmup_secs", self.warmup_secs),
            ("retarget_secs", self.retarget_secs),
            ("spawn_jitter", self.spawn_jitter),
            ("unit_speed_jitter", self.unit_speed_jitter),
        ] {
            if fixed_from_f64(min).is_none() || fixed_from_f64(max).is_none() {
                return Err(GameError::InvalidData(format!("{name} is not a finite range")));
            }
            if min < 0.0 || max < min {
                return Err(GameError::InvalidData(format!(
                    "{name} must satisfy 0 <= min <= max, got ({min}, {max})"
                )));
            }
        }
        for (name, value) in [
            ("outcome_delay_secs", self.outcome_delay_secs),
            ("tower_radius", self.tower_radius),
            ("unit_radius", self.unit_radius),
        ] {
            if fixed_from_f64(value).is_none() || value < 0.0 {
                return Err(GameError::InvalidData(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.capture_health < 1 || self.unit_health < 1 {
            return Err(GameError::InvalidData(
                "capture_health and unit_health must be at least 1".into(),
            ));
        }
        if self.contact_damage < 0 {
            return Err(GameError::InvalidData("contact_damage must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.music_volume) {
            return Err(GameError::InvalidData(format!(
                "music_volume must be within [0, 1], got {}",
                self.music_volume
            )));
        }
        Ok(())
    }

    /// Duration of one tick in seconds.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Contact radius of a tower as fixed-point.
    #[must_use]
    pub fn tower_radius_fixed(&self) -> Fixed {
        Fixed::from_num(self.tower_radius)
    }

    /// Contact radius of a unit as fixed-point.
    #[must_use]
    pub fn unit_radius_fixed(&self) -> Fixed {
        Fixed::from_num(self.unit_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = MatchConfig::from_ron_str("(outcome_delay_secs: 3.0)").unwrap();
        assert_eq!(config.outcome_delay_secs, 3.0);
        assert_eq!(config.warmup_secs, (3.0, 7.0));
        assert_eq!(config.capture_health, 1);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = MatchConfig {
            spawn_jitter: (1.2, 0.9),
            ..MatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidData(_))));
    }

    #[test]
    fn test_volume_out_of_range_rejected() {
        let config = MatchConfig {
            music_volume: 1.5,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_duration() {
        let config = MatchConfig::default();
        assert_eq!(config.tick_duration(), Fixed::from_num(1) / Fixed::from_num(20));
    }
}
