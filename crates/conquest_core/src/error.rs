//! Error types for the game simulation.

use thiserror::Error;

use crate::components::{TowerId, UnitId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Tower identifier does not exist in the current level.
    #[error("Tower not found: {0}")]
    TowerNotFound(TowerId),

    /// Unit identifier does not exist (never spawned or already destroyed).
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Player input referenced a tower the player does not own.
    #[error("Tower {0} is not controlled by the player")]
    NotPlayerTower(TowerId),

    /// Requested level does not exist.
    #[error("Level index {index} out of range ({count} levels available)")]
    LevelIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of available levels.
        count: usize,
    },

    /// Level set contains no levels at all.
    #[error("Level set is empty")]
    NoLevels,

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Level or configuration values that cannot be simulated.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Reading or writing the progress store failed.
    #[error("Progress store error: {0}")]
    Persistence(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
