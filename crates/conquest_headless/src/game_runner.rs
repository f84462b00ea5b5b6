//! Real game execution for headless testing.
//!
//! Plays a scenario's level set through the [`MatchController`] with an
//! auto-player standing in for the human, and collects metrics.
//!
//! The loop is bounded by `max_ticks`. Each attempt at a level is recorded;
//! a lost level is retried, a won level advances, and the game ends once the
//! last level has been won or the tick budget is spent.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use conquest_core::error::Result;
use conquest_core::match_controller::{MatchController, MatchPhase};
use conquest_core::progress::MemoryProgress;
use conquest_core::registry::Outcome;

use crate::metrics::{GameMetrics, LevelRecord};
use crate::scenario::Scenario;
use crate::sinks::LogSink;
use crate::strategies::{Strategy, StrategyExecutor};

/// Progress logging interval (ticks).
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Ticks taking longer than this (ms) are logged as slow.
const SLOW_TICK_THRESHOLD_MS: u128 = 100;

/// Mixed into the game seed for the auto-player's own random source.
const STRATEGY_SEED_SALT: u64 = 0x5eed_0f_a1;

/// Default tick budget: 10 minutes of game time at 20 ticks per second.
pub const DEFAULT_MAX_TICKS: u64 = 12_000;

/// Configuration for a single game run.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Random seed for determinism.
    pub seed: u64,
    /// Maximum controller ticks before giving up.
    pub max_ticks: u64,
    /// Scenario to play.
    pub scenario: Scenario,
    /// Auto-player.
    pub strategy: Strategy,
    /// Game ID for tracking.
    pub game_id: String,
}

impl GameConfig {
    /// A game of `scenario` with the default strategy and tick budget.
    #[must_use]
    pub fn new(scenario: Scenario, seed: u64) -> Self {
        Self {
            seed,
            max_ticks: DEFAULT_MAX_TICKS,
            scenario,
            strategy: Strategy::default(),
            game_id: format!("game_{seed}"),
        }
    }
}

/// Result of running a game.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Collected metrics.
    pub metrics: GameMetrics,
    /// State hash of the world when the game stopped.
    pub final_state_hash: u64,
}

/// Run a complete game.
///
/// # Errors
///
/// Fails if the match cannot be created or a level cannot be loaded.
pub fn run_game(config: GameConfig) -> Result<GameResult> {
    let game_start = Instant::now();
    info!(
        game_id = %config.game_id,
        seed = config.seed,
        max_ticks = config.max_ticks,
        scenario = %config.scenario.name,
        strategy = %config.strategy.name,
        "Starting game simulation"
    );

    let last_level = config.scenario.levels.len().saturating_sub(1);
    let mut controller = MatchController::new(
        config.scenario.config.clone(),
        Box::new(config.scenario.levels.clone()),
        Box::new(MemoryProgress::new()),
        LogSink::collaborators(),
        config.seed,
    )?;
    let dt = controller.config().tick_duration();

    let mut metrics = GameMetrics::new(&config.game_id, &config.scenario.name, config.seed);
    metrics.strategy = config.strategy.name.clone();
    let mut executor = StrategyExecutor::new(config.strategy, config.seed ^ STRATEGY_SEED_SALT);
    let mut unit_factions = BTreeMap::new();

    controller.resume()?;
    let mut attempt_open = true;
    let mut tick = 0u64;

    while tick < config.max_ticks {
        let tick_start = Instant::now();

        executor.act(&mut controller);
        let level = controller.level_index();
        let events = controller.tick(dt)?;
        tick += 1;

        metrics.record_tick(&events, &mut unit_factions);

        if let Some(outcome) = events.outcome {
            let ticks = controller.simulation().get_tick();
            debug!(level, outcome = ?outcome, ticks, "Attempt finished");
            metrics.levels.push(LevelRecord {
                level,
                outcome: Some(outcome),
                ticks,
            });
            attempt_open = false;
            unit_factions.clear();

            if outcome == Outcome::Won && level == last_level {
                metrics.campaign_complete = true;
                break;
            }
        }

        if controller.phase() == MatchPhase::Paused {
            controller.resume()?;
            attempt_open = true;
        }

        let elapsed = tick_start.elapsed().as_millis();
        if elapsed > SLOW_TICK_THRESHOLD_MS {
            warn!(
                tick,
                duration_ms = elapsed,
                units = controller.simulation().units().len(),
                "Slow tick detected"
            );
        }
        if tick % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                tick,
                level = controller.level_index(),
                units = controller.simulation().units().len(),
                "Game progress"
            );
        }
    }

    if attempt_open && !metrics.campaign_complete {
        metrics.levels.push(LevelRecord {
            level: controller.level_index(),
            outcome: None,
            ticks: controller.simulation().get_tick(),
        });
    }

    let final_state_hash = controller.simulation().state_hash();
    metrics.duration_ticks = tick;
    metrics.orders_issued = executor.orders_issued();
    metrics.final_state_hash = final_state_hash;

    info!(
        game_id = %metrics.game_id,
        ticks = tick,
        levels_won = metrics.levels_won(),
        levels_lost = metrics.levels_lost(),
        complete = metrics.campaign_complete,
        wall_ms = game_start.elapsed().as_millis(),
        "Game finished"
    );

    Ok(GameResult {
        metrics,
        final_state_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::config::MatchConfig;
    use conquest_core::factions::FactionTag;
    use conquest_core::level::{LevelData, LevelSet, TowerPlacement};

    fn quick_scenario() -> Scenario {
        let mut player = TowerPlacement::new(FactionTag::Player, 0.0, 0.0);
        player.spawn_interval = 0.5;
        let mut red = TowerPlacement::new(FactionTag::ai("Red"), 6.0, 0.0);
        red.health = 2;
        red.spawn_interval = 1000.0;
        Scenario {
            name: "quick".to_string(),
            description: String::new(),
            config: MatchConfig {
                warmup_secs: (0.0, 0.0),
                ..MatchConfig::default()
            },
            levels: LevelSet {
                levels: vec![LevelData {
                    name: "only".to_string(),
                    towers: vec![player, red],
                }],
            },
        }
    }

    #[test]
    fn test_nearest_player_beats_undefended_tower() {
        let result = run_game(GameConfig::new(quick_scenario(), 1)).unwrap();

        assert!(result.metrics.campaign_complete);
        assert_eq!(result.metrics.levels_won(), 1);
        assert!(result.metrics.orders_issued >= 1);
        assert_eq!(result.metrics.factions["Player"].towers_captured, 1);
        assert_eq!(result.metrics.factions["Red"].towers_lost, 1);
    }

    #[test]
    fn test_passive_player_runs_out_of_ticks() {
        let config = GameConfig {
            strategy: Strategy::passive(),
            max_ticks: 200,
            ..GameConfig::new(quick_scenario(), 1)
        };

        let result = run_game(config).unwrap();

        assert!(!result.metrics.campaign_complete);
        assert_eq!(result.metrics.duration_ticks, 200);
        assert_eq!(
            result.metrics.levels,
            vec![LevelRecord {
                level: 0,
                outcome: None,
                ticks: 200,
            }]
        );
    }

    #[test]
    fn test_same_seed_same_game() {
        let a = run_game(GameConfig::new(Scenario::builtin().unwrap(), 9)).unwrap();
        let b = run_game(GameConfig::new(Scenario::builtin().unwrap(), 9)).unwrap();
        assert_eq!(a.final_state_hash, b.final_state_hash);
        assert_eq!(a.metrics, b.metrics);
    }
}
