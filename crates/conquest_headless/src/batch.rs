//! Batch game runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon and summarizes
//! how far the auto-player gets through the level set.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::game_runner::{run_game, GameConfig, DEFAULT_MAX_TICKS};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::scenario::Scenario;
use crate::strategies::Strategy;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name (for the report)
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Starting seed for deterministic runs
    pub seed_start: u64,
    /// Maximum ticks per game
    pub max_ticks: u64,
    /// Auto-player strategy
    pub strategy: Strategy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: crate::scenario::BUILTIN.to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            strategy: Strategy::default(),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the auto-player
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the tick budget per game
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total games
    pub total: u32,
    completed: AtomicU32,
    completed_campaigns: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            completed_campaigns: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished game
    pub fn record_completion(&self, campaign_complete: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if campaign_complete {
            self.completed_campaigns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Share of finished games that beat every level
    pub fn completion_rate(&self) -> f64 {
        let completed = self.current();
        if completed == 0 {
            return 0.0;
        }
        f64::from(self.completed_campaigns.load(Ordering::Relaxed)) / f64::from(completed)
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_game = elapsed.as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_game * f64::from(remaining))
    }

    /// Log progress
    pub fn display(&self) {
        let eta = self.eta();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            completion_rate = format!("{:.2}", self.completion_rate()),
            eta = format!("{}m {}s", eta.as_secs() / 60, eta.as_secs() % 60),
            "Batch progress"
        );
    }
}

/// Run a batch of games of `scenario`.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);

    info!(
        games = config.game_count,
        scenario = %config.scenario,
        strategy = %config.strategy.name,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<GameMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let game = GameConfig {
                seed,
                max_ticks: config.max_ticks,
                scenario: scenario.clone(),
                strategy: config.strategy.clone(),
                game_id: format!("game_{seed}"),
            };

            match run_game(game) {
                Ok(result) => {
                    progress.record_completion(result.metrics.campaign_complete);

                    let completed = progress.current();
                    if completed % 10 == 0 {
                        debug!(completed, total = config.game_count, "Progress");
                    }
                    if completed % 100 == 0 {
                        progress.display();
                    }

                    Ok(result.metrics)
                }
                Err(e) => {
                    warn!(game = i, seed, error = %e, "Game failed");
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        failed = errors.len(),
        seconds = format!("{duration_seconds:.1}"),
        completion_rate = format!("{:.2}", summary.completion_rate),
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by running the same seed several times and comparing
/// the final state hash and metrics of every run.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32, max_ticks: u64) -> bool {
    let mut results = (0..runs.max(1)).map(|_| {
        run_game(GameConfig {
            max_ticks,
            ..GameConfig::new(scenario.clone(), seed)
        })
    });

    let first = match results.next() {
        Some(Ok(result)) => result,
        Some(Err(e)) => {
            warn!(error = %e, "Verification run failed");
            return false;
        }
        None => return false,
    };

    results.all(|result| match result {
        Ok(result) => {
            let same = result.final_state_hash == first.final_state_hash
                && result.metrics == first.metrics;
            if !same {
                warn!(
                    expected = first.final_state_hash,
                    actual = result.final_state_hash,
                    "Run diverged"
                );
            }
            same
        }
        Err(e) => {
            warn!(error = %e, "Verification run failed");
            false
        }
    })
}
