//! Simulation benchmarks for conquest_core.
//!
//! Run with: `cargo bench -p conquest_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use conquest_core::config::MatchConfig;
use conquest_core::factions::FactionTag;
use conquest_core::level::{LevelData, TowerPlacement};
use conquest_core::rng::SimRng;
use conquest_core::simulation::Simulation;

/// A ring of towers split between the player and three AI factions.
fn ring_level(towers: usize) -> LevelData {
    let factions = [
        FactionTag::Player,
        FactionTag::ai("Red"),
        FactionTag::ai("Green"),
        FactionTag::ai("Yellow"),
    ];
    let placements = (0..towers)
        .map(|i| {
            let angle = (i as f64) * std::f64::consts::TAU / (towers as f64);
            let mut placement = TowerPlacement::new(
                factions[i % factions.len()].clone(),
                40.0 * angle.cos(),
                40.0 * angle.sin(),
            );
            placement.spawn_interval = 1.0;
            placement.target = Some((i + towers / 2) % towers);
            placement
        })
        .collect();
    LevelData {
        name: format!("ring-{towers}"),
        towers: placements,
    }
}

/// Ticks a busy level for one simulated minute.
pub fn simulation_benchmark(c: &mut Criterion) {
    let config = MatchConfig {
        warmup_secs: (0.0, 1.0),
        ..MatchConfig::default()
    };
    let dt = config.tick_duration();

    let mut group = c.benchmark_group("tick_one_minute");
    for towers in [8_usize, 32] {
        let level = ring_level(towers);
        group.bench_with_input(BenchmarkId::from_parameter(towers), &level, |b, level| {
            b.iter(|| {
                let mut rng = SimRng::from_seed(42);
                let Ok(mut sim) = Simulation::from_level(level, &mut rng, &config) else {
                    return;
                };
                for _ in 0..(config.tick_rate * 60) {
                    if sim.tick(dt, &mut rng, &config).outcome.is_some() {
                        break;
                    }
                }
                black_box(sim.state_hash());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
