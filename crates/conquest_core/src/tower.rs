//! Towers: the static, capturable spawners.
//!
//! A tower is never destroyed during a match. When its health is depleted it
//! changes hands: it takes the attacker's faction and appearance, forgets its
//! target and restarts at capture health. The caller is responsible for
//! telling the [`FactionRegistry`] about the capture.
//!
//! Timing rules:
//! - The first spawn waits for a warm-up drawn from `warmup_secs`; the spawn
//!   accumulator is frozen until then.
//! - After every spawn cycle the interval is multiplied by a draw from
//!   `spawn_jitter`. The jitter compounds and is never reset.
//! - AI towers re-roll their target every `retarget_secs`. Player and neutral
//!   towers only change target when told to.

use crate::components::{Appearance, Countdown, Health, TowerId, UnitId};
use crate::config::MatchConfig;
use crate::factions::FactionTag;
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::FactionRegistry;
use crate::rng::SimRng;

/// Parameters for placing a tower.
#[derive(Debug, Clone)]
pub struct TowerParams {
    /// Owning faction.
    pub faction: FactionTag,
    /// World position.
    pub position: Vec2Fixed,
    /// Starting health.
    pub health: i32,
    /// Seconds between spawns before any jitter is applied.
    pub spawn_interval: Fixed,
    /// Nominal speed of spawned units, in world units per second.
    pub unit_speed: Fixed,
    /// Cosmetic identity, if the level provides one.
    pub appearance: Option<Appearance>,
}

/// Everything a new unit needs, produced by a spawning tower.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOrder {
    /// Tower that produced the unit.
    pub home: TowerId,
    /// Faction inherited from the tower.
    pub faction: FactionTag,
    /// Appearance inherited from the tower.
    pub appearance: Option<Appearance>,
    /// Spawn position (the tower's position).
    pub position: Vec2Fixed,
    /// Tower the unit walks toward for its whole life.
    pub target: TowerId,
    /// Randomized speed.
    pub speed: Fixed,
}

/// Result of advancing a tower by one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TowerUpdate {
    /// A unit to spawn this tick.
    pub spawn: Option<SpawnOrder>,
    /// Whether the tower's target was reassigned.
    pub target_changed: bool,
}

/// The unit responsible for a damage event.
#[derive(Debug, Clone, PartialEq)]
pub struct Attacker {
    /// The attacking unit.
    pub unit: UnitId,
    /// Its faction.
    pub faction: FactionTag,
    /// Its appearance, copied onto towers it captures.
    pub appearance: Option<Appearance>,
}

/// A completed ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// The captured tower.
    pub tower: TowerId,
    /// Faction that lost the tower.
    pub old: FactionTag,
    /// Faction that gained it.
    pub new: FactionTag,
}

/// A capturable tower.
#[derive(Debug, Clone)]
pub struct Tower {
    id: TowerId,
    faction: FactionTag,
    health: Health,
    position: Vec2Fixed,
    target: Option<TowerId>,
    spawn_interval: Fixed,
    since_last_spawn: Fixed,
    warmup: Countdown,
    retarget: Option<Countdown>,
    unit_speed: Fixed,
    appearance: Option<Appearance>,
    spawn_cycles: u32,
}

impl Tower {
    /// Create a tower, drawing its warm-up and (for AI factions) its first
    /// retarget delay.
    pub fn new(id: TowerId, params: TowerParams, rng: &mut SimRng, config: &MatchConfig) -> Self {
        if params.appearance.is_none() {
            tracing::warn!(tower = %id, "Tower has no appearance; cosmetic updates will be skipped");
        }

        let warmup = Countdown::new(rng.uniform_fixed(config.warmup_secs));
        let retarget = params
            .faction
            .auto_targets()
            .then(|| Countdown::new(rng.uniform_fixed(config.retarget_secs)));

        Self {
            id,
            faction: params.faction,
            health: Health::new(params.health),
            position: params.position,
            target: None,
            spawn_interval: params.spawn_interval,
            since_last_spawn: Fixed::ZERO,
            warmup,
            retarget,
            unit_speed: params.unit_speed,
            appearance: params.appearance,
            spawn_cycles: 0,
        }
    }

    /// Tower identifier.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Current owner.
    #[must_use]
    pub const fn faction(&self) -> &FactionTag {
        &self.faction
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health.current
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Tower that spawned units will walk toward.
    #[must_use]
    pub const fn target(&self) -> Option<TowerId> {
        self.target
    }

    /// Current spawn interval in seconds.
    #[must_use]
    pub const fn spawn_interval(&self) -> Fixed {
        self.spawn_interval
    }

    /// Seconds accumulated toward the next spawn.
    #[must_use]
    pub const fn since_last_spawn(&self) -> Fixed {
        self.since_last_spawn
    }

    /// Nominal speed of spawned units.
    #[must_use]
    pub const fn unit_speed(&self) -> Fixed {
        self.unit_speed
    }

    /// Cosmetic identity.
    #[must_use]
    pub const fn appearance(&self) -> Option<&Appearance> {
        self.appearance.as_ref()
    }

    /// Number of completed spawn cycles (including cycles without a target).
    #[must_use]
    pub const fn spawn_cycles(&self) -> u32 {
        self.spawn_cycles
    }

    /// Whether the first-spawn warm-up is still running.
    #[must_use]
    pub fn is_warming_up(&self) -> bool {
        !self.warmup.is_finished()
    }

    /// Seconds until the next automatic retarget, for AI towers.
    #[must_use]
    pub fn retarget_remaining(&self) -> Option<Fixed> {
        self.retarget.map(|timer| timer.remaining())
    }

    /// Advance the tower by `dt` seconds.
    pub fn update(
        &mut self,
        dt: Fixed,
        registry: &FactionRegistry,
        rng: &mut SimRng,
        config: &MatchConfig,
    ) -> TowerUpdate {
        let mut result = TowerUpdate::default();

        if self.faction.auto_targets() {
            let timer = self
                .retarget
                .get_or_insert_with(|| Countdown::new(rng.uniform_fixed(config.retarget_secs)));
            if timer.tick(dt) {
                result.target_changed |= self.choose_target(registry, rng);
                self.retarget = Some(Countdown::new(rng.uniform_fixed(config.retarget_secs)));
            }
        } else {
            self.retarget = None;
        }

        if !self.warmup.is_finished() {
            self.warmup.tick(dt);
            return result;
        }

        self.since_last_spawn += dt;
        if self.since_last_spawn >= self.spawn_interval {
            let (spawn, target_changed) = self.spawn_unit(registry, rng, config);
            result.spawn = spawn;
            result.target_changed |= target_changed;

            self.since_last_spawn = Fixed::ZERO;
            self.spawn_interval = self
                .spawn_interval
                .saturating_mul(rng.uniform_fixed(config.spawn_jitter));
            self.spawn_cycles += 1;
        }

        result
    }

    /// Ask the registry for a random enemy tower and adopt it.
    ///
    /// Only AI towers pick their own targets. Returns whether the target was
    /// reassigned.
    pub fn choose_target(&mut self, registry: &FactionRegistry, rng: &mut SimRng) -> bool {
        if !self.faction.auto_targets() {
            return false;
        }

        match registry.random_enemy_of(&self.faction, rng) {
            Some(enemy) => {
                tracing::debug!(tower = %self.id, target = %enemy, "Tower retargeted");
                self.target = Some(enemy);
                true
            }
            None => false,
        }
    }

    /// Replace the target unconditionally.
    pub fn set_target(&mut self, target: TowerId) {
        self.target = Some(target);
    }

    /// Produce a spawn order for one unit, resolving a target first if an AI
    /// tower has none. Returns the order (if any) and whether the target was
    /// reassigned.
    pub fn spawn_unit(
        &mut self,
        registry: &FactionRegistry,
        rng: &mut SimRng,
        config: &MatchConfig,
    ) -> (Option<SpawnOrder>, bool) {
        let mut target_changed = false;
        if self.target.is_none() && self.faction.auto_targets() {
            target_changed = self.choose_target(registry, rng);
        }

        let Some(target) = self.target else {
            tracing::trace!(tower = %self.id, "No target, skipping spawn");
            return (None, target_changed);
        };

        let speed = self
            .unit_speed
            .saturating_mul(rng.uniform_fixed(config.unit_speed_jitter));

        let order = SpawnOrder {
            home: self.id,
            faction: self.faction.clone(),
            appearance: self.appearance.clone(),
            position: self.position,
            target,
            speed,
        };
        (Some(order), target_changed)
    }

    /// Subtract `amount` health. A depleted tower is captured by the
    /// attacker's faction on the spot and restarts at `capture_health`.
    pub fn get_damage(
        &mut self,
        attacker: &Attacker,
        amount: i32,
        capture_health: i32,
    ) -> Option<Capture> {
        self.health.apply_damage(amount);
        if !self.health.is_depleted() {
            return None;
        }

        let old = std::mem::replace(&mut self.faction, attacker.faction.clone());
        self.target = None;

        match (self.appearance.as_mut(), attacker.appearance.as_ref()) {
            (Some(own), Some(theirs)) => own.clone_from(theirs),
            _ => tracing::warn!(
                tower = %self.id,
                attacker = %attacker.unit,
                "Missing appearance on captured tower or attacker; keeping old look"
            ),
        }

        self.health = Health::new(capture_health);

        tracing::info!(
            tower = %self.id,
            from = %old,
            to = %self.faction,
            by = %attacker.unit,
            "Tower captured"
        );

        Some(Capture {
            tower: self.id,
            old,
            new: self.faction.clone(),
        })
    }
}
