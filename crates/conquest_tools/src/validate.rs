//! Data validation utilities.
//!
//! Checks level sets and match configuration before they reach the game.
//! Problems that make a level unplayable are errors; levels that load but
//! play oddly (a level that is won on its first tick, towers stacked on
//! top of each other) are warnings.

use std::fmt;
use std::path::{Path, PathBuf};

use conquest_core::config::MatchConfig;
use conquest_core::error::Result;
use conquest_core::level::{LevelData, LevelSet};

/// Level file name inside a data directory.
pub const LEVELS_FILE: &str = "levels.ron";

/// Match configuration file name inside a data directory.
pub const CONFIG_FILE: &str = "match_config.ron";

/// How bad an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The level or file cannot be played.
    Error,
    /// Playable, but probably not what the author meant.
    Warning,
}

/// A single problem found in the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Level index the issue belongs to, if any.
    pub level: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    fn error(level: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            level,
            message: message.into(),
        }
    }

    fn warning(level: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.level {
            Some(level) => write!(f, "{kind}: level {level}: {}", self.message),
            None => write!(f, "{kind}: {}", self.message),
        }
    }
}

/// Everything found in one data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// File that was checked.
    pub file: PathBuf,
    /// Issues in file order.
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// Whether any issue is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Log every issue.
    pub fn log(&self) {
        let file = self.file.display().to_string();
        for issue in &self.issues {
            match issue.severity {
                Severity::Error => tracing::error!(file = %file, level = ?issue.level, "{}", issue.message),
                Severity::Warning => tracing::warn!(file = %file, level = ?issue.level, "{}", issue.message),
            }
        }
    }
}

/// Check every level of a set against `config`.
#[must_use]
pub fn validate_level_set(levels: &LevelSet, config: &MatchConfig) -> Vec<Issue> {
    if levels.is_empty() {
        return vec![Issue::error(None, "level set contains no levels")];
    }

    levels
        .levels
        .iter()
        .enumerate()
        .flat_map(|(index, level)| validate_level(index, level, config))
        .collect()
}

/// Check a single level.
#[must_use]
pub fn validate_level(index: usize, level: &LevelData, config: &MatchConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    let at = Some(index);

    if let Err(e) = level.validate() {
        issues.push(Issue::error(at, format!("'{}': {e}", level.name)));
    }

    let players = level.towers.iter().filter(|t| t.faction.is_player()).count();
    if players == 0 {
        issues.push(Issue::error(
            at,
            format!("'{}' has no player tower and is lost immediately", level.name),
        ));
    }
    if players == level.towers.len() {
        issues.push(Issue::warning(
            at,
            format!("'{}' has no opposing tower and is won immediately", level.name),
        ));
    }

    for (i, placement) in level.towers.iter().enumerate() {
        if placement.target == Some(i) {
            issues.push(Issue::warning(
                at,
                format!("tower {i} in '{}' targets itself", level.name),
            ));
        }
    }

    let min_gap = config.tower_radius * 2.0;
    for (i, a) in level.towers.iter().enumerate() {
        for (j, b) in level.towers.iter().enumerate().skip(i + 1) {
            let dx = a.position.0 - b.position.0;
            let dy = a.position.1 - b.position.1;
            if (dx * dx + dy * dy).sqrt() < min_gap {
                issues.push(Issue::warning(
                    at,
                    format!("towers {i} and {j} in '{}' overlap", level.name),
                ));
            }
        }
    }

    issues
}

/// Load and check a level file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed. Invalid level
/// contents are reported as issues instead.
pub fn validate_levels_file(path: &Path, config: &MatchConfig) -> Result<ValidationReport> {
    let levels = LevelSet::load(path)?;
    tracing::debug!(path = %path.display(), levels = levels.len(), "Loaded level set");
    Ok(ValidationReport {
        file: path.to_path_buf(),
        issues: validate_level_set(&levels, config),
    })
}

/// Validate the level and config files in a data directory.
///
/// A missing `match_config.ron` means the defaults are used.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or if the
/// configuration holds values that cannot be simulated.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let config_path = path.join(CONFIG_FILE);
    let config = if config_path.exists() {
        MatchConfig::load(&config_path)?
    } else {
        tracing::info!(path = %config_path.display(), "No config file, using defaults");
        MatchConfig::default()
    };

    validate_levels_file(&path.join(LEVELS_FILE), &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::error::GameError;
    use conquest_core::factions::FactionTag;
    use conquest_test_utils::fixtures::{
        duel_level, level, level_set, skirmish_level, tower, write_level_file,
    };

    fn config() -> MatchConfig {
        MatchConfig::default()
    }

    #[test]
    fn test_fixture_levels_are_clean() {
        let levels = level_set(vec![duel_level(), skirmish_level()]);
        assert!(validate_level_set(&levels, &config()).is_empty());
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let issues = validate_level_set(&LevelSet::default(), &config());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_missing_player_tower_is_an_error() {
        let lonely = level(
            "Lonely",
            vec![
                tower(FactionTag::ai("Red"), 0.0, 0.0),
                tower(FactionTag::Neutral, 10.0, 0.0),
            ],
        );
        let issues = validate_level(0, &lonely, &config());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("no player tower"));
    }

    #[test]
    fn test_vacuous_win_is_a_warning() {
        let solo = level("Solo", vec![tower(FactionTag::Player, 0.0, 0.0)]);
        let issues = validate_level(2, &solo, &config());
        assert_eq!(
            issues,
            vec![Issue::warning(
                Some(2),
                "'Solo' has no opposing tower and is won immediately"
            )]
        );
    }

    #[test]
    fn test_bad_values_are_errors() {
        let mut broken = duel_level();
        broken.towers[1].spawn_interval = 0.0;
        broken.towers[0].target = Some(7);

        let issues = validate_level(0, &broken, &config());
        assert!(issues.iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_tower_outside_the_map_is_an_error() {
        let mut far = duel_level();
        far.towers[1].position = (50_000.0, 0.0);

        let issues = validate_level(0, &far, &config());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("position.x"));
    }

    #[test]
    fn test_self_target_and_overlap_warn() {
        let mut odd = duel_level();
        odd.towers[0].target = Some(0);
        odd.towers[1].position = (0.5, 0.0);

        let issues = validate_level(0, &odd, &config());
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_data_directory_without_config() {
        let dir = tempfile::tempdir().unwrap();
        write_level_file(dir.path(), &level_set(vec![duel_level()]));

        let report = validate_data_directory(dir.path()).unwrap();
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.file, dir.path().join(LEVELS_FILE));
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_level_file(dir.path(), &level_set(vec![duel_level()]));
        std::fs::write(dir.path().join(CONFIG_FILE), "(tick_rate: 0)").unwrap();

        let err = validate_data_directory(dir.path()).unwrap_err();
        assert!(matches!(err, GameError::InvalidData(_)));
    }

    #[test]
    fn test_missing_level_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_data_directory(dir.path()).unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_shipped_data_is_clean() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
        let report = validate_data_directory(&data).unwrap();
        assert!(!report.has_errors(), "{:?}", report.issues);
    }
}
