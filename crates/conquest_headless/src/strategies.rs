//! Scripted auto-players for headless playtesting.
//!
//! An auto-player stands in for the human: every few ticks it drags a path
//! from each of its towers to a tower it wants to attack, through the same
//! selection input a person would use.

use std::path::Path;

use conquest_core::components::TowerId;
use conquest_core::match_controller::{MatchController, MatchPhase};
use conquest_core::rng::SimRng;
use conquest_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Unknown preset name.
    #[error("Unknown strategy: {0}")]
    Unknown(String),
}

/// How an auto-player picks targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Targeting {
    /// Never touch the level's initial targets.
    Keep,
    /// Attack the closest tower the player does not own.
    Nearest,
    /// Attack the weakest tower the player does not own.
    Weakest,
    /// Attack any tower the player does not own.
    Random,
}

/// A complete auto-player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Target selection rule.
    pub targeting: Targeting,
    /// Ticks between decisions.
    pub decision_interval: u64,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::nearest()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let strategy: Strategy = ron::from_str(&contents)?;
        Ok(strategy)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Look up a preset by name, falling back to a RON file path.
    pub fn resolve(name: &str) -> Result<Self, StrategyError> {
        match name {
            "passive" => Ok(Self::passive()),
            "nearest" => Ok(Self::nearest()),
            "weakest" => Ok(Self::weakest()),
            "random" => Ok(Self::random()),
            other if other.ends_with(".ron") => Self::load(other),
            other => Err(StrategyError::Unknown(other.to_string())),
        }
    }

    /// Leaves every tower on its level-defined target.
    #[must_use]
    pub fn passive() -> Self {
        Self {
            name: "Passive".to_string(),
            description: "Never issues orders".to_string(),
            targeting: Targeting::Keep,
            decision_interval: u64::MAX,
        }
    }

    /// Expands outward, closest tower first.
    #[must_use]
    pub fn nearest() -> Self {
        Self {
            name: "Nearest".to_string(),
            description: "Every tower attacks the closest tower it does not own".to_string(),
            targeting: Targeting::Nearest,
            decision_interval: 40,
        }
    }

    /// Goes for towers that are about to fall.
    #[must_use]
    pub fn weakest() -> Self {
        Self {
            name: "Weakest".to_string(),
            description: "Every tower attacks the tower with the least health".to_string(),
            targeting: Targeting::Weakest,
            decision_interval: 40,
        }
    }

    /// Baseline for balance comparisons.
    #[must_use]
    pub fn random() -> Self {
        Self {
            name: "Random".to_string(),
            description: "Every tower attacks a random tower it does not own".to_string(),
            targeting: Targeting::Random,
            decision_interval: 100,
        }
    }
}

/// Runs a [`Strategy`] against a match.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    rng: SimRng,
    orders_issued: u64,
}

impl StrategyExecutor {
    /// Create an executor. `seed` only feeds the random targeting rule and
    /// is independent of the match RNG.
    #[must_use]
    pub fn new(strategy: Strategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: SimRng::from_seed(seed),
            orders_issued: 0,
        }
    }

    /// The strategy being executed.
    #[must_use]
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Number of retarget orders accepted so far.
    #[must_use]
    pub const fn orders_issued(&self) -> u64 {
        self.orders_issued
    }

    /// Issue orders if a decision is due at this world tick.
    pub fn act(&mut self, controller: &mut MatchController) {
        if controller.phase() != MatchPhase::Running {
            return;
        }
        let tick = controller.simulation().get_tick();
        if self.strategy.targeting == Targeting::Keep
            || tick % self.strategy.decision_interval.max(1) != 0
        {
            return;
        }

        for (tower, target) in self.decide(controller.simulation()) {
            let ordered = controller
                .select_tower(tower)
                .and_then(|()| controller.player_selected_target(target));
            match ordered {
                Ok(()) => self.orders_issued += 1,
                Err(err) => {
                    controller.cancel_selection();
                    tracing::debug!(tower = %tower, target = %target, error = %err, "Order rejected");
                }
            }
        }
    }

    /// Orders to issue for the current world: `(player tower, new target)`
    /// for every player tower whose target should change.
    pub fn decide(&mut self, sim: &Simulation) -> Vec<(TowerId, TowerId)> {
        let candidates: Vec<TowerId> = sim
            .towers()
            .iter()
            .filter(|(_, tower)| !tower.faction().is_player())
            .map(|(&id, _)| id)
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut orders = Vec::new();
        for (&id, tower) in sim.towers().iter() {
            if !tower.faction().is_player() {
                continue;
            }
            let choice = match self.strategy.targeting {
                Targeting::Keep => None,
                Targeting::Nearest => candidates.iter().copied().min_by_key(|&other| {
                    sim.tower(other)
                        .map(|t| t.position().distance_squared(tower.position()))
                }),
                Targeting::Weakest => candidates
                    .iter()
                    .copied()
                    .min_by_key(|&other| sim.tower(other).map(|t| t.health())),
                Targeting::Random => self.rng.choose(&candidates),
            };
            if let Some(target) = choice.filter(|&target| tower.target() != Some(target)) {
                orders.push((id, target));
            }
        }
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::config::MatchConfig;
    use conquest_core::factions::FactionTag;
    use conquest_core::level::{LevelData, TowerPlacement};

    fn world() -> Simulation {
        let mut weak = TowerPlacement::new(FactionTag::ai("Red"), 30.0, 0.0);
        weak.health = 2;
        let level = LevelData {
            name: "test".to_string(),
            towers: vec![
                TowerPlacement::new(FactionTag::Player, 0.0, 0.0),
                TowerPlacement::new(FactionTag::Neutral, 10.0, 0.0),
                weak,
            ],
        };
        let mut rng = SimRng::from_seed(1);
        Simulation::from_level(&level, &mut rng, &MatchConfig::default()).unwrap()
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(Strategy::resolve("nearest").unwrap().targeting, Targeting::Nearest);
        assert_eq!(Strategy::resolve("passive").unwrap().targeting, Targeting::Keep);
        assert!(matches!(
            Strategy::resolve("turtle"),
            Err(StrategyError::Unknown(_))
        ));
    }

    #[test]
    fn test_nearest_picks_closest_non_player_tower() {
        let mut executor = StrategyExecutor::new(Strategy::nearest(), 0);
        assert_eq!(executor.decide(&world()), vec![(TowerId(1), TowerId(2))]);
    }

    #[test]
    fn test_weakest_picks_lowest_health() {
        let mut executor = StrategyExecutor::new(Strategy::weakest(), 0);
        assert_eq!(executor.decide(&world()), vec![(TowerId(1), TowerId(3))]);
    }

    #[test]
    fn test_random_never_picks_own_tower() {
        let mut executor = StrategyExecutor::new(Strategy::random(), 3);
        let sim = world();
        for _ in 0..50 {
            for (_, target) in executor.decide(&sim) {
                assert_ne!(target, TowerId(1));
            }
        }
    }

    #[test]
    fn test_passive_issues_nothing() {
        let mut executor = StrategyExecutor::new(Strategy::passive(), 0);
        assert!(executor.decide(&world()).is_empty());
    }

    #[test]
    fn test_strategy_from_ron() {
        let strategy = Strategy::from_ron_str(
            r#"(name: "Slow", description: "", targeting: nearest, decision_interval: 200)"#,
        )
        .unwrap();
        assert_eq!(strategy.decision_interval, 200);
    }
}
