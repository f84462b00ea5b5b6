//! Persisted match progress: the index of the current level, nothing else.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Storage for the current level index.
pub trait ProgressStore {
    /// Read the stored value. `None` when nothing has been saved yet.
    ///
    /// The raw value is returned as-is; callers clamp it against the level
    /// count.
    fn load(&mut self) -> Result<Option<i64>>;

    /// Persist the current level index.
    fn save(&mut self, level: usize) -> Result<()>;
}

/// Progress kept in memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProgress {
    value: Option<i64>,
}

impl MemoryProgress {
    /// Start with nothing saved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored value, which may be out of range.
    #[must_use]
    pub fn with_value(value: i64) -> Self {
        Self { value: Some(value) }
    }
}

impl ProgressStore for MemoryProgress {
    fn load(&mut self) -> Result<Option<i64>> {
        Ok(self.value)
    }

    fn save(&mut self, level: usize) -> Result<()> {
        let value = i64::try_from(level)
            .map_err(|_| GameError::Persistence(format!("level index {level} too large")))?;
        self.value = Some(value);
        Ok(())
    }
}

/// On-disk save format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    /// Index of the level to start on.
    pub current_level: i64,
}

/// Progress stored as a small RON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RonProgressFile {
    path: PathBuf,
}

impl RonProgressFile {
    /// Use the file at `path`. It is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the save file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for RonProgressFile {
    fn load(&mut self) -> Result<Option<i64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| GameError::Persistence(format!("{}: {e}", self.path.display())))?;
        let data: SaveData = ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(data.current_level))
    }

    fn save(&mut self, level: usize) -> Result<()> {
        let current_level = i64::try_from(level)
            .map_err(|_| GameError::Persistence(format!("level index {level} too large")))?;
        let contents = ron::ser::to_string_pretty(
            &SaveData { current_level },
            ron::ser::PrettyConfig::default(),
        )
        .map_err(|e| GameError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| GameError::Persistence(format!("{}: {e}", self.path.display())))
    }
}

/// Clamp a stored value to a playable level index. Missing, negative or
/// out-of-range values start over at level 0.
#[must_use]
pub fn clamp_level_index(stored: Option<i64>, level_count: usize) -> usize {
    match stored.and_then(|value| usize::try_from(value).ok()) {
        Some(index) if index < level_count => index,
        _ => 0,
    }
}
