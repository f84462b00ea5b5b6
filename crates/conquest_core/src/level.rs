//! Level data: static tower placements loaded from RON.
//!
//! A level is nothing more than a list of towers. Units are never placed by
//! level data; they only come from tower spawns.
//!
//! # Example RON
//!
//! ```ron
//! LevelSet(
//!     levels: [
//!         LevelData(
//!             name: "Skirmish",
//!             towers: [
//!                 TowerPlacement(faction: Player, position: (0.0, 0.0), target: Some(1)),
//!                 TowerPlacement(faction: Ai("Red"), position: (20.0, 0.0), health: 15),
//!             ],
//!         ),
//!     ],
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::Appearance;
use crate::error::{GameError, Result};
use crate::factions::FactionTag;
use crate::math::{fixed_from_f64, Fixed, Vec2Fixed};
use crate::tower::TowerParams;

/// Largest distance from the origin a tower may be placed at, per axis.
///
/// Keeps every squared distance between two points of a level inside the
/// fixed-point range.
pub const MAX_COORDINATE: f64 = 10_000.0;

fn default_health() -> i32 {
    10
}

fn default_spawn_interval() -> f64 {
    5.0
}

fn default_unit_speed() -> f64 {
    5.0
}

/// One tower in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerPlacement {
    /// Owning faction at level start.
    pub faction: FactionTag,
    /// World position.
    pub position: (f64, f64),
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: i32,
    /// Seconds between spawns.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f64,
    /// Nominal speed of spawned units.
    #[serde(default = "default_unit_speed")]
    pub unit_speed: f64,
    /// Cosmetic identity.
    #[serde(default)]
    pub appearance: Option<Appearance>,
    /// Index (within this level) of the tower this one starts out targeting.
    #[serde(default)]
    pub target: Option<usize>,
}

impl TowerPlacement {
    /// A placement with default health, interval and speed.
    #[must_use]
    pub fn new(faction: FactionTag, x: f64, y: f64) -> Self {
        Self {
            faction,
            position: (x, y),
            health: default_health(),
            spawn_interval: default_spawn_interval(),
            unit_speed: default_unit_speed(),
            appearance: None,
            target: None,
        }
    }

    /// Convert to simulation parameters, rejecting values that cannot be
    /// simulated.
    pub fn to_params(&self) -> Result<TowerParams> {
        if self.health < 1 {
            return Err(GameError::InvalidData(format!(
                "tower health must be at least 1, got {}",
                self.health
            )));
        }
        let spawn_interval = positive("spawn_interval", self.spawn_interval)?;
        let unit_speed = positive("unit_speed", self.unit_speed)?;
        let (x, y) = self.position;
        let position = Vec2Fixed::new(coordinate("position.x", x)?, coordinate("position.y", y)?);

        Ok(TowerParams {
            faction: self.faction.clone(),
            position,
            health: self.health,
            spawn_interval,
            unit_speed,
            appearance: self.appearance.clone(),
        })
    }
}

fn finite(name: &str, value: f64) -> Result<Fixed> {
    fixed_from_f64(value)
        .ok_or_else(|| GameError::InvalidData(format!("{name} is out of range: {value}")))
}

fn coordinate(name: &str, value: f64) -> Result<Fixed> {
    if !(-MAX_COORDINATE..=MAX_COORDINATE).contains(&value) {
        return Err(GameError::InvalidData(format!(
            "{name} must lie within ±{MAX_COORDINATE}, got {value}"
        )));
    }
    finite(name, value)
}

fn positive(name: &str, value: f64) -> Result<Fixed> {
    let fixed = finite(name, value)?;
    if fixed <= Fixed::ZERO {
        return Err(GameError::InvalidData(format!("{name} must be positive, got {value}")));
    }
    Ok(fixed)
}

/// A single level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// Display name.
    pub name: String,
    /// Towers in placement order. Tower ids are assigned in this order.
    pub towers: Vec<TowerPlacement>,
}

impl LevelData {
    /// Check every placement and every initial target index.
    pub fn validate(&self) -> Result<()> {
        for (index, placement) in self.towers.iter().enumerate() {
            placement.to_params()?;
            if let Some(target) = placement.target {
                if target >= self.towers.len() {
                    return Err(GameError::InvalidData(format!(
                        "tower {index} in level '{}' targets missing tower {target}",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// An ordered list of levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    /// Levels in play order.
    pub levels: Vec<LevelData>,
}

impl LevelSet {
    /// Load a level set from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a level set from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether there are no levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Where the match controller gets its levels from.
pub trait LevelSource {
    /// Number of available levels.
    fn level_count(&self) -> usize;

    /// Produce the initial towers of level `index`.
    fn load_level(&self, index: usize) -> Result<LevelData>;
}

impl LevelSource for LevelSet {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn load_level(&self, index: usize) -> Result<LevelData> {
        self.levels
            .get(index)
            .cloned()
            .ok_or(GameError::LevelIndexOutOfRange {
                index,
                count: self.levels.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LEVELS: &str = r#"
        LevelSet(
            levels: [
                LevelData(
                    name: "First",
                    towers: [
                        TowerPlacement(
                            faction: Player,
                            position: (0.0, 0.0),
                            appearance: Some(Appearance(material: "blue", color: (40, 40, 200))),
                            target: Some(1),
                        ),
                        TowerPlacement(faction: Ai("Red"), position: (20.0, 5.0), health: 15),
                    ],
                ),
                LevelData(name: "Second", towers: []),
            ],
        )
    "#;

    #[test]
    fn test_parse_with_defaults() {
        let set = LevelSet::from_ron_str(TWO_LEVELS).unwrap();
        assert_eq!(set.len(), 2);

        let first = &set.levels[0];
        assert_eq!(first.towers[0].health, 10);
        assert_eq!(first.towers[0].spawn_interval, 5.0);
        assert_eq!(first.towers[0].target, Some(1));
        assert_eq!(first.towers[1].faction, FactionTag::ai("Red"));
        assert_eq!(first.towers[1].health, 15);
        assert!(first.towers[1].appearance.is_none());
        assert!(first.validate().is_ok());
    }

    #[test]
    fn test_far_tower_is_rejected() {
        let level = LevelData {
            name: "Far".into(),
            towers: vec![
                TowerPlacement::new(FactionTag::Player, 0.0, 0.0),
                TowerPlacement::new(FactionTag::ai("Red"), 50_000.0, 0.0),
            ],
        };
        assert!(matches!(level.validate(), Err(GameError::InvalidData(_))));

        let edge = LevelData {
            name: "Edge".into(),
            towers: vec![
                TowerPlacement::new(FactionTag::Player, -MAX_COORDINATE, -MAX_COORDINATE),
                TowerPlacement::new(FactionTag::ai("Red"), MAX_COORDINATE, MAX_COORDINATE),
            ],
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_load_level_out_of_range() {
        let set = LevelSet::from_ron_str(TWO_LEVELS).unwrap();
        assert!(set.load_level(1).is_ok());
        assert!(matches!(
            set.load_level(2),
            Err(GameError::LevelIndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_bad_target_index_rejected() {
        let mut placement = TowerPlacement::new(FactionTag::Player, 0.0, 0.0);
        placement.target = Some(3);
        let level = LevelData {
            name: "Broken".into(),
            towers: vec![placement],
        };
        assert!(matches!(level.validate(), Err(GameError::InvalidData(_))));
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let mut placement = TowerPlacement::new(FactionTag::Neutral, 0.0, 0.0);
        placement.spawn_interval = 0.0;
        assert!(placement.to_params().is_err());

        let mut placement = TowerPlacement::new(FactionTag::Neutral, 0.0, 0.0);
        placement.health = 0;
        assert!(placement.to_params().is_err());

        let mut placement = TowerPlacement::new(FactionTag::Neutral, 0.0, 0.0);
        placement.position = (f64::NAN, 0.0);
        assert!(placement.to_params().is_err());
    }

    #[test]
    fn test_malformed_ron_reports_parse_error() {
        assert!(matches!(
            LevelSet::from_ron_str("LevelSet(levels: [oops])"),
            Err(GameError::DataParseError { .. })
        ));
    }
}
