//! World invariants checked after every tick in property tests.

use conquest_core::simulation::Simulation;

/// Check the invariants that must hold at every observable moment:
/// every tower has at least 1 health, the registry matches the towers'
/// tags exactly, and every live unit has health left.
///
/// # Errors
///
/// Returns a description of the first violated invariant.
pub fn check_world(sim: &Simulation) -> Result<(), String> {
    for (id, tower) in sim.towers().iter() {
        if tower.health() < 1 {
            return Err(format!("{id} has health {}", tower.health()));
        }
    }

    if !sim.registry().is_consistent_with(sim.towers()) {
        return Err(format!("registry out of sync at tick {}", sim.get_tick()));
    }

    for (id, unit) in sim.units().iter() {
        if !unit.is_alive() {
            return Err(format!("{id} is still in the world with health {}", unit.health()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinism::strategies::{arb_level, arb_seed};
    use crate::determinism::SeededWorld;
    use crate::fixtures::instant_config;
    use conquest_core::components::EntityRef;
    use conquest_core::simulation::SELF_ATTRITION;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_invariants_hold_every_tick(level in arb_level(4), seed in arb_seed()) {
            let mut world = SeededWorld::new(&level, seed, instant_config()).unwrap();
            for _ in 0..400 {
                let events = world.step();
                prop_assert!(check_world(&world.sim).is_ok(), "{:?}", check_world(&world.sim));
                if events.outcome.is_some() {
                    break;
                }
            }
        }

        #[test]
        fn prop_self_attrition_is_exactly_one(level in arb_level(4), seed in arb_seed()) {
            let mut world = SeededWorld::new(&level, seed, instant_config()).unwrap();
            for _ in 0..400 {
                let events = world.step();
                for event in &events.damage_events {
                    if event.target == EntityRef::Unit(event.attacker) {
                        prop_assert_eq!(event.amount, SELF_ATTRITION);
                    }
                }
                if events.outcome.is_some() {
                    break;
                }
            }
        }

        #[test]
        fn prop_home_tower_spared_while_it_shares_the_tag(
            level in arb_level(4),
            seed in arb_seed(),
        ) {
            let mut world = SeededWorld::new(&level, seed, instant_config()).unwrap();
            let mut spawned_by = BTreeMap::new();
            for _ in 0..400 {
                let before: BTreeMap<_, _> = world
                    .sim
                    .towers()
                    .iter()
                    .map(|(&id, tower)| (id, tower.faction().clone()))
                    .collect();
                let events = world.step();
                for spawned in &events.spawned {
                    spawned_by.insert(spawned.unit, (spawned.home, spawned.faction.clone()));
                }
                for event in &events.damage_events {
                    let EntityRef::Tower(tower) = event.target else {
                        continue;
                    };
                    let Some((home, faction)) = spawned_by.get(&event.attacker) else {
                        continue;
                    };
                    if *home == tower {
                        let changed_hands = before.get(&tower) != Some(faction)
                            || events.captures.iter().any(|c| c.tower == tower);
                        prop_assert!(changed_hands, "{} hit its own home {}", event.attacker, tower);
                    }
                }
                if events.outcome.is_some() {
                    break;
                }
            }
        }

        #[test]
        fn prop_spawn_interval_stays_in_jitter_bounds(level in arb_level(4), seed in arb_seed()) {
            let mut world = SeededWorld::new(&level, seed, instant_config()).unwrap();
            let initial: Vec<f64> = world
                .sim
                .towers()
                .values()
                .map(|t| t.spawn_interval().to_num::<f64>())
                .collect();
            for _ in 0..400 {
                if world.step().outcome.is_some() {
                    break;
                }
            }
            for (tower, start) in world.sim.towers().values().zip(initial) {
                let n = i32::try_from(tower.spawn_cycles()).unwrap();
                let interval = tower.spawn_interval().to_num::<f64>();
                prop_assert!(interval >= start * 0.9f64.powi(n) - 1e-6);
                prop_assert!(interval <= start * 1.2f64.powi(n) + 1e-6);
            }
        }
    }
}
