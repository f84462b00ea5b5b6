//! Core simulation loop.
//!
//! The simulation owns every tower and unit of the current level and
//! advances them with a shared delta time. It knows nothing about menus,
//! audio or rendering; everything observable comes back as [`TickEvents`].
//!
//! # Determinism
//!
//! - No floating-point math in the world state (uses [`Fixed`])
//! - All randomness is drawn from the caller's [`SimRng`]
//! - Entities are processed in sorted-id order
//!
//! # System Execution Order
//!
//! Each tick:
//! 1. **Towers** - retarget timers, warm-up, spawn accumulator, spawning
//! 2. **Units** - move toward their target tower and turn to face it
//! 3. **Contacts** - overlap-enter detection and damage resolution
//!
//! Contact resolution stops at the first win/lose outcome of the tick.
//!
//! # Example
//!
//! ```
//! use conquest_core::config::MatchConfig;
//! use conquest_core::factions::FactionTag;
//! use conquest_core::level::{LevelData, TowerPlacement};
//! use conquest_core::rng::SimRng;
//! use conquest_core::simulation::Simulation;
//!
//! let config = MatchConfig::default();
//! let mut rng = SimRng::from_seed(7);
//! let level = LevelData {
//!     name: "Duel".into(),
//!     towers: vec![
//!         TowerPlacement::new(FactionTag::Player, 0.0, 0.0),
//!         TowerPlacement::new(FactionTag::ai("Red"), 20.0, 0.0),
//!     ],
//! };
//!
//! let mut sim = Simulation::from_level(&level, &mut rng, &config).unwrap();
//! let events = sim.tick(config.tick_duration(), &mut rng, &config);
//! assert_eq!(sim.get_tick(), 1);
//! assert!(events.outcome.is_none());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::components::{EntityRef, TowerId, UnitId};
use crate::config::MatchConfig;
use crate::contacts::{Body, ContactTracker};
use crate::error::{GameError, Result};
use crate::factions::FactionTag;
use crate::level::LevelData;
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::{FactionRegistry, Outcome};
use crate::rng::SimRng;
use crate::tower::{Attacker, Capture, SpawnOrder, Tower, TowerParams};
use crate::unit::Unit;

/// Health a unit loses every time it deals contact damage.
pub const SELF_ATTRITION: i32 = 1;

/// Typed identifier usable as an [`EntityStorage`] key.
pub trait EntityKey: Copy + Ord + Hash {
    /// Build a key from a raw counter value.
    fn from_raw(raw: u64) -> Self;
}

impl EntityKey for TowerId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl EntityKey for UnitId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Storage for one kind of entity.
///
/// Ids are handed out from a per-storage counter starting at 1 and are never
/// reused within a level. Iteration is always in ascending id order.
#[derive(Debug, Clone)]
pub struct EntityStorage<K, T> {
    entities: BTreeMap<K, T>,
    next_id: u64,
}

impl<K: EntityKey, T> Default for EntityStorage<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKey, T> EntityStorage<K, T> {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate an id, build the entity with it and store it.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let id = K::from_raw(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, build(id));
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: K) -> Option<T> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: K) -> Option<&T> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs. Used when the loop body needs `&mut self`.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<K> {
        self.entities.keys().copied().collect()
    }

    /// Iterate over all entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entities.iter()
    }

    /// Iterate mutably over all entities in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut T)> {
        self.entities.iter_mut()
    }

    /// Iterate over all entities without their ids.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    /// Remove everything and restart ids at 1.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_id = 1;
    }
}

/// Damage dealt by a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Unit dealing the damage.
    pub attacker: UnitId,
    /// Body receiving it. Equal to the attacker for self-attrition.
    pub target: EntityRef,
    /// Amount subtracted.
    pub amount: i32,
}

/// A unit entered the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpawned {
    /// The new unit.
    pub unit: UnitId,
    /// Tower that spawned it.
    pub home: TowerId,
    /// Tower it walks toward.
    pub target: TowerId,
    /// Its faction.
    pub faction: FactionTag,
}

/// A unit was destroyed. Presentation plays the smoke effect here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDestroyed {
    /// The destroyed unit.
    pub unit: UnitId,
    /// Where it died.
    pub position: Vec2Fixed,
}

/// A tower's target changed; `None` means it was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetChange {
    /// Tower whose target changed.
    pub tower: TowerId,
    /// New target.
    pub target: Option<TowerId>,
}

/// A tower's health changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerHealthChanged {
    /// The tower.
    pub tower: TowerId,
    /// Health after the change.
    pub health: i32,
}

/// Events generated during a simulation tick.
///
/// The match controller turns these into presentation, HUD and audio calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Units spawned this tick.
    pub spawned: Vec<UnitSpawned>,
    /// Units destroyed this tick.
    pub destroyed: Vec<UnitDestroyed>,
    /// Every damage application, including self-attrition.
    pub damage_events: Vec<DamageEvent>,
    /// Tower ownership transfers.
    pub captures: Vec<Capture>,
    /// Tower target changes.
    pub target_changes: Vec<TargetChange>,
    /// Tower health changes.
    pub tower_health: Vec<TowerHealthChanged>,
    /// Win/lose outcome, if one was reached.
    pub outcome: Option<Outcome>,
}

impl TickEvents {
    /// Append everything from `other`, keeping the first outcome.
    pub fn merge(&mut self, other: Self) {
        self.spawned.extend(other.spawned);
        self.destroyed.extend(other.destroyed);
        self.damage_events.extend(other.damage_events);
        self.captures.extend(other.captures);
        self.target_changes.extend(other.target_changes);
        self.tower_health.extend(other.tower_health);
        if self.outcome.is_none() {
            self.outcome = other.outcome;
        }
    }
}

/// The world of one level: towers, units and the faction registry.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    towers: EntityStorage<TowerId, Tower>,
    units: EntityStorage<UnitId, Unit>,
    registry: FactionRegistry,
    contacts: ContactTracker,
}

impl Simulation {
    /// Create a new empty simulation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the world of a level: place every tower, register it, then
    /// apply the initial targets from the level data.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] for placements that cannot be
    /// simulated or targets pointing outside the level.
    pub fn from_level(level: &LevelData, rng: &mut SimRng, config: &MatchConfig) -> Result<Self> {
        level.validate()?;

        let mut sim = Self::new();
        let mut ids = Vec::with_capacity(level.towers.len());
        for placement in &level.towers {
            ids.push(sim.spawn_tower(placement.to_params()?, rng, config));
        }

        for (placement, &tower) in level.towers.iter().zip(&ids) {
            if let Some(index) = placement.target {
                let target = ids.get(index).copied().ok_or_else(|| {
                    GameError::InvalidData(format!("target index {index} out of range"))
                })?;
                sim.set_tower_target(tower, target)?;
            }
        }

        tracing::info!(
            level = %level.name,
            towers = sim.towers.len(),
            factions = sim.registry.factions().count(),
            "Level built"
        );
        Ok(sim)
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// All towers.
    #[must_use]
    pub fn towers(&self) -> &EntityStorage<TowerId, Tower> {
        &self.towers
    }

    /// All live units.
    #[must_use]
    pub fn units(&self) -> &EntityStorage<UnitId, Unit> {
        &self.units
    }

    /// The faction registry.
    #[must_use]
    pub fn registry(&self) -> &FactionRegistry {
        &self.registry
    }

    /// Look up a tower.
    #[must_use]
    pub fn tower(&self, id: TowerId) -> Option<&Tower> {
        self.towers.get(id)
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Place a tower and register it with its faction.
    pub fn spawn_tower(
        &mut self,
        params: TowerParams,
        rng: &mut SimRng,
        config: &MatchConfig,
    ) -> TowerId {
        let faction = params.faction.clone();
        let id = self
            .towers
            .insert_with(|id| Tower::new(id, params, rng, config));
        self.registry.register(id, &faction);
        tracing::debug!(tower = %id, faction = %faction, "Tower placed");
        id
    }

    /// Create a unit from a spawn order.
    pub fn spawn_unit(&mut self, order: SpawnOrder, config: &MatchConfig) -> UnitSpawned {
        let (home, target, faction) = (order.home, order.target, order.faction.clone());
        let unit = self
            .units
            .insert_with(|id| Unit::from_order(id, order, config.unit_health));
        tracing::debug!(unit = %unit, home = %home, target = %target, faction = %faction, "Unit spawned");
        UnitSpawned {
            unit,
            home,
            target,
            faction,
        }
    }

    /// Point `tower` at `target` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TowerNotFound`] if either tower does not exist.
    pub fn set_tower_target(&mut self, tower: TowerId, target: TowerId) -> Result<TargetChange> {
        if !self.towers.contains(target) {
            return Err(GameError::TowerNotFound(target));
        }
        let source = self
            .towers
            .get_mut(tower)
            .ok_or(GameError::TowerNotFound(tower))?;
        source.set_target(target);
        tracing::debug!(tower = %tower, target = %target, "Tower target set");
        Ok(TargetChange {
            tower,
            target: Some(target),
        })
    }

    /// Advance the world by `dt` seconds.
    pub fn tick(&mut self, dt: Fixed, rng: &mut SimRng, config: &MatchConfig) -> TickEvents {
        let mut events = TickEvents::default();

        self.run_tower_system(dt, rng, config, &mut events);
        self.run_unit_system(dt);
        self.run_contact_system(config, &mut events);

        #[cfg(feature = "debug-validation")]
        {
            if !self.registry.is_consistent_with(&self.towers) {
                tracing::error!(tick = self.tick, "Registry out of sync with towers; resyncing");
                self.resync_registry();
            }
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn run_tower_system(
        &mut self,
        dt: Fixed,
        rng: &mut SimRng,
        config: &MatchConfig,
        events: &mut TickEvents,
    ) {
        let mut orders = Vec::new();
        for (&id, tower) in self.towers.iter_mut() {
            let update = tower.update(dt, &self.registry, rng, config);
            if update.target_changed {
                events.target_changes.push(TargetChange {
                    tower: id,
                    target: tower.target(),
                });
            }
            if let Some(order) = update.spawn {
                orders.push(order);
            }
        }

        for order in orders {
            let spawned = self.spawn_unit(order, config);
            events.spawned.push(spawned);
        }
    }

    fn run_unit_system(&mut self, dt: Fixed) {
        let towers = &self.towers;
        for unit in self.units.entities.values_mut() {
            let goal = towers.get(unit.target()).map(Tower::position);
            unit.update(dt, goal);
        }
    }

    fn run_contact_system(&mut self, config: &MatchConfig, events: &mut TickEvents) {
        let tower_radius = config.tower_radius_fixed();
        let unit_radius = config.unit_radius_fixed();

        let bodies: Vec<Body> = self
            .towers
            .iter()
            .map(|(&id, tower)| Body {
                entity: EntityRef::Tower(id),
                position: tower.position(),
                radius: tower_radius,
            })
            .chain(self.units.iter().map(|(&id, unit)| Body {
                entity: EntityRef::Unit(id),
                position: unit.position(),
                radius: unit_radius,
            }))
            .collect();

        for (a, b) in self.contacts.detect(&bodies) {
            if events.outcome.is_some() {
                break;
            }
            match (a, b) {
                (EntityRef::Unit(first), EntityRef::Unit(second)) => {
                    self.contact(first, b, config, events);
                    if events.outcome.is_none() {
                        self.contact(second, a, config, events);
                    }
                }
                (EntityRef::Unit(unit), tower @ EntityRef::Tower(_))
                | (tower @ EntityRef::Tower(_), EntityRef::Unit(unit)) => {
                    self.contact(unit, tower, config, events);
                }
                (EntityRef::Tower(_), EntityRef::Tower(_)) => {}
            }
        }
    }

    /// Resolve one unit touching another body.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if `actor` does not exist.
    pub fn resolve_contact(
        &mut self,
        actor: UnitId,
        other: EntityRef,
        config: &MatchConfig,
    ) -> Result<TickEvents> {
        if !self.units.contains(actor) {
            return Err(GameError::UnitNotFound(actor));
        }
        let mut events = TickEvents::default();
        self.contact(actor, other, config, &mut events);
        Ok(events)
    }

    fn contact(
        &mut self,
        actor: UnitId,
        other: EntityRef,
        config: &MatchConfig,
        events: &mut TickEvents,
    ) {
        let Some(unit) = self.units.get(actor).filter(|unit| unit.is_alive()) else {
            return;
        };
        let attacker = Attacker {
            unit: actor,
            faction: unit.faction().clone(),
            appearance: unit.appearance().cloned(),
        };
        let home = unit.home();

        // The home tower is spared only while it still flies the unit's tag.
        let engages = match other {
            EntityRef::Tower(tower) => self.towers.get(tower).is_some_and(|tower_ref| {
                tower_ref.faction().is_hostile_to(&attacker.faction) || tower != home
            }),
            EntityRef::Unit(target) => self.units.get(target).is_some_and(|unit| {
                unit.is_alive() && unit.faction().is_hostile_to(&attacker.faction)
            }),
        };
        if !engages {
            return;
        }

        self.deal_damage(&attacker, other, config.contact_damage, config, events);
        self.deal_damage(&attacker, EntityRef::Unit(actor), SELF_ATTRITION, config, events);
    }

    /// Apply `amount` damage from `attacker` to `target`.
    ///
    /// Towers that run out of health are captured on the spot and the
    /// registry is resynced before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TowerNotFound`] or [`GameError::UnitNotFound`]
    /// if the target does not exist.
    pub fn apply_damage(
        &mut self,
        attacker: &Attacker,
        target: EntityRef,
        amount: i32,
        config: &MatchConfig,
    ) -> Result<TickEvents> {
        match target {
            EntityRef::Tower(id) if !self.towers.contains(id) => {
                return Err(GameError::TowerNotFound(id))
            }
            EntityRef::Unit(id) if !self.units.contains(id) => {
                return Err(GameError::UnitNotFound(id))
            }
            _ => {}
        }
        let mut events = TickEvents::default();
        self.deal_damage(attacker, target, amount, config, &mut events);
        Ok(events)
    }

    fn deal_damage(
        &mut self,
        attacker: &Attacker,
        target: EntityRef,
        amount: i32,
        config: &MatchConfig,
        events: &mut TickEvents,
    ) {
        match target {
            EntityRef::Tower(id) => {
                let Some(tower) = self.towers.get_mut(id) else {
                    return;
                };
                events.damage_events.push(DamageEvent {
                    attacker: attacker.unit,
                    target,
                    amount,
                });
                let capture = tower.get_damage(attacker, amount, config.capture_health);
                events.tower_health.push(TowerHealthChanged {
                    tower: id,
                    health: tower.health(),
                });

                if let Some(capture) = capture {
                    let outcome =
                        self.registry
                            .on_ownership_changed(&capture.old, &capture.new, &self.towers);
                    events.target_changes.push(TargetChange {
                        tower: id,
                        target: None,
                    });
                    events.captures.push(capture);
                    if events.outcome.is_none() {
                        events.outcome = outcome;
                    }
                }
            }
            EntityRef::Unit(id) => {
                let Some(unit) = self.units.get_mut(id) else {
                    return;
                };
                if !unit.is_alive() {
                    return;
                }
                events.damage_events.push(DamageEvent {
                    attacker: attacker.unit,
                    target,
                    amount,
                });
                if unit.get_damage(amount) {
                    let position = unit.position();
                    self.units.remove(id);
                    self.contacts.forget(target);
                    tracing::debug!(unit = %id, by = %attacker.unit, "Unit destroyed");
                    events.destroyed.push(UnitDestroyed { unit: id, position });
                }
            }
        }
    }

    /// Rebuild every faction set from the towers' current tags.
    pub fn resync_registry(&mut self) {
        self.registry.clear();
        for (&id, tower) in self.towers.iter() {
            self.registry.register(id, tower.faction());
        }
    }

    /// Tear the level down.
    pub fn clear(&mut self) {
        self.towers.clear();
        self.units.clear();
        self.registry.clear();
        self.contacts.clear();
        self.tick = 0;
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        self.towers.len().hash(&mut hasher);
        for (id, tower) in self.towers.iter() {
            id.hash(&mut hasher);
            tower.faction().hash(&mut hasher);
            tower.health().hash(&mut hasher);
            tower.target().hash(&mut hasher);
            tower.position().x.to_bits().hash(&mut hasher);
            tower.position().y.to_bits().hash(&mut hasher);
            tower.spawn_interval().to_bits().hash(&mut hasher);
            tower.since_last_spawn().to_bits().hash(&mut hasher);
            tower.spawn_cycles().hash(&mut hasher);
        }

        self.units.len().hash(&mut hasher);
        for (id, unit) in self.units.iter() {
            id.hash(&mut hasher);
            unit.faction().hash(&mut hasher);
            unit.health().hash(&mut hasher);
            unit.home().hash(&mut hasher);
            unit.target().hash(&mut hasher);
            unit.position().x.to_bits().hash(&mut hasher);
            unit.position().y.to_bits().hash(&mut hasher);
            unit.facing().x.to_bits().hash(&mut hasher);
            unit.facing().y.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }
}
