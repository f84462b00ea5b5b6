//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given an identical seed and identical inputs.
//!
//! Sources of non-determinism this guards against:
//!
//! - **Floating-point math**: world state uses [`conquest_core::math::Fixed`].
//! - **Map iteration order**: entities live in ordered maps and are processed
//!   in id order.
//! - **Unseeded randomness**: every draw goes through one
//!   [`conquest_core::rng::SimRng`].

use std::thread;

use conquest_core::config::MatchConfig;
use conquest_core::error::Result;
use conquest_core::level::LevelData;
use conquest_core::rng::SimRng;
use conquest_core::simulation::{Simulation, TickEvents};

/// A world together with the RNG and config that drive it.
#[derive(Debug, Clone)]
pub struct SeededWorld {
    /// The world.
    pub sim: Simulation,
    /// Its random source.
    pub rng: SimRng,
    /// Its tuning.
    pub config: MatchConfig,
}

impl SeededWorld {
    /// Build a level with a fresh RNG.
    ///
    /// # Errors
    ///
    /// Fails if the level cannot be built.
    pub fn new(level: &LevelData, seed: u64, config: MatchConfig) -> Result<Self> {
        let mut rng = SimRng::from_seed(seed);
        let sim = Simulation::from_level(level, &mut rng, &config)?;
        Ok(Self { sim, rng, config })
    }

    /// Advance one tick of the configured length.
    pub fn step(&mut self) -> TickEvents {
        let dt = self.config.tick_duration();
        self.sim.tick(dt, &mut self.rng, &self.config)
    }

    /// Hash of the world state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.sim.state_hash()
    }
}

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Example
///
/// ```
/// use conquest_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a world twice from identical setup and compare final hashes.
pub fn verify_world_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> SeededWorld,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |world| {
            world.step();
        },
        SeededWorld::state_hash,
    )
    .is_deterministic
}

/// Compare two runs tick by tick and return the first tick at which they
/// differ, or `None`.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> SeededWorld,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.step();
        second.step();

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Run `num_worlds` copies on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_worlds<F>(setup_fn: F, num_worlds: usize, num_ticks: u64) -> Vec<u64>
where
    F: Fn() -> SeededWorld + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        world.step();
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    })
}

/// Proptest strategies for levels and seeds.
pub mod strategies {
    use conquest_core::factions::FactionTag;
    use conquest_core::level::{LevelData, TowerPlacement};
    use proptest::prelude::*;

    /// Any faction tag drawn from a small pool.
    pub fn arb_faction() -> impl Strategy<Value = FactionTag> {
        prop_oneof![
            3 => Just(FactionTag::Player),
            1 => Just(FactionTag::Neutral),
            2 => Just(FactionTag::ai("Red")),
            2 => Just(FactionTag::ai("Blue")),
        ]
    }

    /// A tower placement on a 60x60 board.
    pub fn arb_placement() -> impl Strategy<Value = TowerPlacement> {
        (
            arb_faction(),
            -30i32..30,
            -30i32..30,
            1i32..6,
            1u32..40,
            2u32..8,
        )
            .prop_map(|(faction, x, y, health, interval_tenths, speed)| {
                let mut placement = TowerPlacement::new(faction, f64::from(x), f64::from(y));
                placement.health = health;
                placement.spawn_interval = f64::from(interval_tenths) / 10.0;
                placement.unit_speed = f64::from(speed);
                placement
            })
    }

    /// A level with at least one player tower and one AI tower, where every
    /// player tower starts aimed at the first AI tower.
    pub fn arb_level(max_extra_towers: usize) -> impl Strategy<Value = LevelData> {
        (
            arb_placement(),
            arb_placement(),
            proptest::collection::vec(arb_placement(), 0..=max_extra_towers),
        )
            .prop_map(|(mut player, mut enemy, extra)| {
                player.faction = FactionTag::Player;
                enemy.faction = FactionTag::ai("Red");
                let mut towers = vec![player, enemy];
                towers.extend(extra);
                for tower in &mut towers {
                    if tower.faction.is_player() {
                        tower.target = Some(1);
                    }
                }
                LevelData {
                    name: "generated".to_string(),
                    towers,
                }
            })
    }

    /// Match seeds.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel_level, instant_config, skirmish_level};

    fn skirmish(seed: u64) -> SeededWorld {
        SeededWorld::new(&skirmish_level(), seed, instant_config()).expect("valid level")
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_duel_is_deterministic() {
        let setup =
            || SeededWorld::new(&duel_level(), 11, MatchConfig::default()).expect("valid level");
        assert!(verify_world_determinism(setup, 600));
    }

    #[test]
    fn test_skirmish_has_no_divergence() {
        assert_eq!(find_first_divergence(|| skirmish(5), 400), None);
    }

    #[test]
    fn test_parallel_worlds_agree() {
        let hashes = run_parallel_worlds(|| skirmish(9), 4, 400);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = skirmish(1);
        let mut b = skirmish(2);
        for _ in 0..400 {
            a.step();
            b.step();
        }
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
