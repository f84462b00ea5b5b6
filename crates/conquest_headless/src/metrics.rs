//! Game metrics collection.
//!
//! Per-game records and batch aggregates, serialized to JSON for offline
//! balance analysis.

use std::collections::BTreeMap;

use conquest_core::registry::Outcome;
use conquest_core::simulation::TickEvents;
use serde::{Deserialize, Serialize};

/// Result of one attempt at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Level index.
    pub level: usize,
    /// How the attempt ended. `None` if the tick budget ran out first.
    pub outcome: Option<Outcome>,
    /// World ticks the attempt took.
    pub ticks: u64,
}

/// Counters for a single faction in a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Units spawned by this faction's towers.
    pub units_spawned: u32,
    /// This faction's units destroyed.
    pub units_lost: u32,
    /// Towers taken over by this faction.
    pub towers_captured: u32,
    /// Towers this faction lost.
    pub towers_lost: u32,
}

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Auto-player strategy name.
    pub strategy: String,
    /// Random seed used.
    pub seed: u64,
    /// Total world ticks across all attempts.
    pub duration_ticks: u64,
    /// Every level attempt in order.
    pub levels: Vec<LevelRecord>,
    /// Whether the last level was won.
    pub campaign_complete: bool,
    /// Per-faction counters.
    pub factions: BTreeMap<String, FactionMetrics>,
    /// Retarget orders the auto-player had accepted.
    pub orders_issued: u64,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new game metrics instance.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Get or create faction metrics.
    pub fn faction_mut(&mut self, faction: &str) -> &mut FactionMetrics {
        self.factions.entry(faction.to_string()).or_default()
    }

    /// Fold one tick's events into the counters.
    ///
    /// `unit_factions` maps live units to their faction; it is updated as
    /// units spawn and die.
    pub fn record_tick(
        &mut self,
        events: &TickEvents,
        unit_factions: &mut BTreeMap<u64, String>,
    ) {
        for spawned in &events.spawned {
            let faction = spawned.faction.to_string();
            self.faction_mut(&faction).units_spawned += 1;
            unit_factions.insert(spawned.unit.0, faction);
        }
        for destroyed in &events.destroyed {
            if let Some(faction) = unit_factions.remove(&destroyed.unit.0) {
                self.faction_mut(&faction).units_lost += 1;
            }
        }
        for capture in &events.captures {
            self.faction_mut(&capture.new.to_string()).towers_captured += 1;
            self.faction_mut(&capture.old.to_string()).towers_lost += 1;
        }
    }

    /// Number of won attempts.
    #[must_use]
    pub fn levels_won(&self) -> usize {
        self.count_outcome(Outcome::Won)
    }

    /// Number of lost attempts.
    #[must_use]
    pub fn levels_lost(&self) -> usize {
        self.count_outcome(Outcome::Lost)
    }

    fn count_outcome(&self, outcome: Outcome) -> usize {
        self.levels
            .iter()
            .filter(|record| record.outcome == Some(outcome))
            .count()
    }
}

/// Aggregate results for one level across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Attempts that reached an outcome or ran out of ticks.
    pub attempts: u32,
    /// Attempts won.
    pub wins: u32,
    /// `wins / attempts`.
    pub win_rate: f64,
    /// Average ticks per won attempt.
    pub avg_ticks_to_win: f64,
}

/// Aggregate summary of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games in which the whole level set was beaten.
    pub campaigns_completed: u32,
    /// `campaigns_completed / total_games`.
    pub completion_rate: f64,
    /// Average game duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest game.
    pub min_duration_ticks: u64,
    /// Longest game.
    pub max_duration_ticks: u64,
    /// Per-level results.
    pub levels: BTreeMap<usize, LevelStats>,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut win_ticks: BTreeMap<usize, u64> = BTreeMap::new();

        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);
            if game.campaign_complete {
                summary.campaigns_completed += 1;
            }

            for record in &game.levels {
                let stats = summary.levels.entry(record.level).or_default();
                stats.attempts += 1;
                if record.outcome == Some(Outcome::Won) {
                    stats.wins += 1;
                    *win_ticks.entry(record.level).or_default() += record.ticks;
                }
            }
        }

        let total = f64::from(summary.total_games);
        summary.avg_duration_ticks = duration_sum as f64 / total;
        summary.completion_rate = f64::from(summary.campaigns_completed) / total;

        for (level, stats) in &mut summary.levels {
            stats.win_rate = f64::from(stats.wins) / f64::from(stats.attempts.max(1));
            if stats.wins > 0 {
                let ticks = win_ticks.get(level).copied().unwrap_or_default();
                stats.avg_ticks_to_win = ticks as f64 / f64::from(stats.wins);
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(levels: Vec<LevelRecord>, complete: bool, ticks: u64) -> GameMetrics {
        GameMetrics {
            levels,
            campaign_complete: complete,
            duration_ticks: ticks,
            ..GameMetrics::new("g", "test", 0)
        }
    }

    fn record(level: usize, outcome: Option<Outcome>, ticks: u64) -> LevelRecord {
        LevelRecord {
            level,
            outcome,
            ticks,
        }
    }

    #[test]
    fn test_empty_batch() {
        let summary = BatchSummary::from_games(&[]);
        assert_eq!(summary.total_games, 0);
        assert!(summary.levels.is_empty());
    }

    #[test]
    fn test_summary_aggregates_levels() {
        let games = vec![
            game(
                vec![
                    record(0, Some(Outcome::Lost), 100),
                    record(0, Some(Outcome::Won), 300),
                    record(1, Some(Outcome::Won), 500),
                ],
                true,
                900,
            ),
            game(vec![record(0, None, 1000)], false, 1000),
        ];

        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 2);
        assert_eq!(summary.campaigns_completed, 1);
        assert!((summary.completion_rate - 0.5).abs() < 1e-9);
        assert_eq!(summary.min_duration_ticks, 900);
        assert_eq!(summary.max_duration_ticks, 1000);

        let first = &summary.levels[&0];
        assert_eq!(first.attempts, 3);
        assert_eq!(first.wins, 1);
        assert!((first.avg_ticks_to_win - 300.0).abs() < 1e-9);
        assert_eq!(summary.levels[&1].wins, 1);
    }

    #[test]
    fn test_level_counts() {
        let metrics = game(
            vec![
                record(0, Some(Outcome::Lost), 10),
                record(0, Some(Outcome::Won), 10),
            ],
            false,
            20,
        );
        assert_eq!(metrics.levels_won(), 1);
        assert_eq!(metrics.levels_lost(), 1);
    }
}
