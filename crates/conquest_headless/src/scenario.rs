//! Scenario loading and configuration.
//!
//! A scenario bundles a level set with the match tuning it should be played
//! under. Plain level-set files are accepted too and get the default tuning.

use std::path::Path;

use conquest_core::config::MatchConfig;
use conquest_core::error::GameError;
use conquest_core::level::LevelSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name that selects the built-in campaign instead of a file.
pub const BUILTIN: &str = "builtin";

const BUILTIN_LEVELS: &str = include_str!("../../../data/levels.ron");

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario parsed but cannot be played.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Match tuning.
    #[serde(default)]
    pub config: MatchConfig,
    /// Levels in play order.
    pub levels: LevelSet,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// The file may hold either a `Scenario(...)` or a bare `LevelSet(...)`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map_or_else(|| "unnamed".to_string(), |s| s.to_string_lossy().into_owned());
        Self::parse(&contents, &name)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Self::parse(ron, "inline")
    }

    /// The campaign shipped with the game.
    pub fn builtin() -> Result<Self, ScenarioError> {
        let levels: LevelSet = ron::from_str(BUILTIN_LEVELS)?;
        Self::from_levels("Campaign", levels)
    }

    /// Resolve a command-line scenario argument: [`BUILTIN`] or a file path.
    pub fn resolve(name: &str) -> Result<Self, ScenarioError> {
        if name == BUILTIN {
            Self::builtin()
        } else {
            Self::load(name)
        }
    }

    /// Wrap a level set with default tuning.
    pub fn from_levels(name: &str, levels: LevelSet) -> Result<Self, ScenarioError> {
        let scenario = Self {
            name: name.to_string(),
            description: String::new(),
            config: MatchConfig::default(),
            levels,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the tuning and every level.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        if self.levels.is_empty() {
            return Err(GameError::NoLevels.into());
        }
        for level in &self.levels.levels {
            level.validate()?;
        }
        Ok(())
    }

    fn parse(ron: &str, fallback_name: &str) -> Result<Self, ScenarioError> {
        let scenario = match ron::from_str::<Self>(ron) {
            Ok(scenario) => scenario,
            Err(scenario_err) => match ron::from_str::<LevelSet>(ron) {
                Ok(levels) => Self {
                    name: fallback_name.to_string(),
                    description: String::new(),
                    config: MatchConfig::default(),
                    levels,
                },
                Err(_) => return Err(scenario_err.into()),
            },
        };
        scenario.validate()?;
        tracing::debug!(
            scenario = %scenario.name,
            levels = scenario.levels.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_campaign_is_playable() {
        let scenario = Scenario::builtin().unwrap();
        assert_eq!(scenario.levels.len(), 4);
        assert_eq!(scenario.levels.levels[0].name, "First Contact");
    }

    #[test]
    fn test_resolve_builtin_by_name() {
        let scenario = Scenario::resolve(BUILTIN).unwrap();
        assert_eq!(scenario.name, "Campaign");
    }

    #[test]
    fn test_missing_file() {
        let result = Scenario::load("definitely/not/here.ron");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_full_scenario_with_tuning() {
        let ron = r#"
            Scenario(
                name: "Quick",
                config: (warmup_secs: (0.0, 0.0)),
                levels: (levels: [
                    (name: "Only", towers: [
                        (faction: Player, position: (0.0, 0.0), target: Some(1)),
                        (faction: Ai("Red"), position: (10.0, 0.0)),
                    ]),
                ]),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Quick");
        assert_eq!(scenario.config.warmup_secs, (0.0, 0.0));
        assert_eq!(scenario.config.tick_rate, 20);
        assert_eq!(scenario.levels.len(), 1);
    }

    #[test]
    fn test_bare_level_set_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.ron");
        std::fs::write(
            &path,
            r#"LevelSet(levels: [(name: "Duel", towers: [
                (faction: Player, position: (0.0, 0.0)),
                (faction: Ai("Red"), position: (10.0, 0.0)),
            ])])"#,
        )
        .unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.name, "duel");
        assert_eq!(scenario.config, MatchConfig::default());
    }

    #[test]
    fn test_empty_level_set_rejected() {
        let result = Scenario::from_ron_str("LevelSet(levels: [])");
        assert!(matches!(
            result,
            Err(ScenarioError::Invalid(GameError::NoLevels))
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let result = Scenario::from_ron_str("this is not ron");
        assert!(matches!(result, Err(ScenarioError::ParseError(_))));
    }
}
