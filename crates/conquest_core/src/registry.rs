//! Faction registry: which towers each faction holds, and who has won.
//!
//! Only towers count toward win/lose; units are never registered. After an
//! ownership change the affected sets are rebuilt from the towers' current
//! tags rather than patched incrementally, so the registry cannot drift from
//! the world even when tags were mutated before it was told.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::TowerId;
use crate::factions::FactionTag;
use crate::rng::SimRng;
use crate::simulation::EntityStorage;
use crate::tower::Tower;

/// Result of a win/lose evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The player holds no towers.
    Lost,
    /// No other faction holds any tower.
    Won,
}

/// Faction tag → live towers carrying that tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionRegistry {
    sets: BTreeMap<FactionTag, BTreeSet<TowerId>>,
}

impl FactionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly created tower to its faction's set.
    pub fn register(&mut self, tower: TowerId, faction: &FactionTag) {
        self.sets.entry(faction.clone()).or_default().insert(tower);
    }

    /// Pick a tower uniformly among all towers not held by `faction`.
    pub fn random_enemy_of(&self, faction: &FactionTag, rng: &mut SimRng) -> Option<TowerId> {
        let candidates: Vec<TowerId> = self
            .sets
            .iter()
            .filter(|(tag, _)| *tag != faction)
            .flat_map(|(_, towers)| towers.iter().copied())
            .collect();
        rng.choose(&candidates)
    }

    /// Resynchronize after a tower moved from `old` to `new`, then evaluate
    /// the match.
    ///
    /// `old`'s set is pruned of towers no longer tagged `old`; `new`'s set is
    /// rebuilt from every tower currently tagged `new`.
    pub fn on_ownership_changed(
        &mut self,
        old: &FactionTag,
        new: &FactionTag,
        towers: &EntityStorage<TowerId, Tower>,
    ) -> Option<Outcome> {
        if let Some(set) = self.sets.get_mut(old) {
            set.retain(|id| towers.get(*id).is_some_and(|tower| tower.faction() == old));
        }

        let rebuilt: BTreeSet<TowerId> = towers
            .iter()
            .filter(|(_, tower)| tower.faction() == new)
            .map(|(id, _)| *id)
            .collect();
        self.sets.insert(new.clone(), rebuilt);

        tracing::debug!(
            old = %old,
            new = %new,
            old_count = self.count(old),
            new_count = self.count(new),
            "Registry resynced"
        );

        self.evaluate()
    }

    /// Win/lose check. Defeat is checked first: a player without towers
    /// loses even if every other set is empty as well.
    #[must_use]
    pub fn evaluate(&self) -> Option<Outcome> {
        if self.count(&FactionTag::Player) == 0 {
            return Some(Outcome::Lost);
        }

        let all_enemies_gone = self
            .sets
            .iter()
            .filter(|(tag, _)| !tag.is_player())
            .all(|(_, towers)| towers.is_empty());

        all_enemies_gone.then_some(Outcome::Won)
    }

    /// Number of towers registered for `faction`.
    #[must_use]
    pub fn count(&self, faction: &FactionTag) -> usize {
        self.sets.get(faction).map_or(0, BTreeSet::len)
    }

    /// Iterate over every known faction and its towers, in tag order.
    pub fn factions(&self) -> impl Iterator<Item = (&FactionTag, &BTreeSet<TowerId>)> {
        self.sets.iter()
    }

    /// Whether every set matches the towers' actual tags exactly.
    #[must_use]
    pub fn is_consistent_with(&self, towers: &EntityStorage<TowerId, Tower>) -> bool {
        let mut actual: BTreeMap<&FactionTag, BTreeSet<TowerId>> = BTreeMap::new();
        for (id, tower) in towers.iter() {
            actual.entry(tower.faction()).or_default().insert(*id);
        }

        let registered_match = self.sets.iter().all(|(tag, set)| match actual.get(tag) {
            Some(expected) => expected == set,
            None => set.is_empty(),
        });
        let nothing_missing = actual
            .iter()
            .all(|(tag, expected)| self.sets.get(*tag) == Some(expected));

        registered_match && nothing_missing
    }

    /// Forget every faction (level teardown).
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(entries: &[(u64, FactionTag)]) -> FactionRegistry {
        let mut registry = FactionRegistry::new();
        for (id, tag) in entries {
            registry.register(TowerId(*id), tag);
        }
        registry
    }

    #[test]
    fn test_random_enemy_never_returns_own_faction() {
        let registry = registry_with(&[
            (0, FactionTag::Player),
            (1, FactionTag::ai("Red")),
            (2, FactionTag::ai("Blue")),
        ]);
        let mut rng = SimRng::from_seed(99);
        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            let pick = registry
                .random_enemy_of(&FactionTag::Player, &mut rng)
                .expect("enemies exist");
            assert_ne!(pick, TowerId(0));
            seen.insert(pick);
        }
        assert_eq!(seen, BTreeSet::from([TowerId(1), TowerId(2)]));
    }

    #[test]
    fn test_random_enemy_none_when_alone() {
        let registry = registry_with(&[(0, FactionTag::ai("Red")), (1, FactionTag::ai("Red"))]);
        let mut rng = SimRng::from_seed(1);
        assert_eq!(registry.random_enemy_of(&FactionTag::ai("Red"), &mut rng), None);
    }

    #[test]
    fn test_empty_player_set_loses() {
        let mut registry = registry_with(&[(1, FactionTag::ai("Red"))]);
        registry.sets.insert(FactionTag::Player, BTreeSet::new());
        assert_eq!(registry.evaluate(), Some(Outcome::Lost));
    }

    #[test]
    fn test_missing_player_set_loses() {
        let registry = registry_with(&[(1, FactionTag::ai("Red"))]);
        assert_eq!(registry.evaluate(), Some(Outcome::Lost));
    }

    #[test]
    fn test_empty_enemy_sets_win() {
        let mut registry = registry_with(&[(0, FactionTag::Player)]);
        registry.sets.insert(FactionTag::ai("Red"), BTreeSet::new());
        assert_eq!(registry.evaluate(), Some(Outcome::Won));
    }

    #[test]
    fn test_loss_takes_precedence_over_win() {
        let mut registry = FactionRegistry::new();
        registry.sets.insert(FactionTag::Player, BTreeSet::new());
        registry.sets.insert(FactionTag::ai("Red"), BTreeSet::new());
        assert_eq!(registry.evaluate(), Some(Outcome::Lost));
    }

    #[test]
    fn test_neutral_towers_block_victory() {
        let registry = registry_with(&[(0, FactionTag::Player), (1, FactionTag::Neutral)]);
        assert_eq!(registry.evaluate(), None);
    }

    #[test]
    fn test_player_only_is_vacuous_win() {
        let registry = registry_with(&[(0, FactionTag::Player)]);
        assert_eq!(registry.evaluate(), Some(Outcome::Won));
    }
}
