//! Shared component types.
//!
//! Plain data used by towers and units: identifiers, health, appearance and
//! countdown timers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Identifier of a tower within the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(pub u64);

/// Identifier of a unit within the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tower#{}", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Typed reference to any body in the world.
///
/// Contacts, damage and path-line notifications all address entities
/// through this closed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    /// A tower.
    Tower(TowerId),
    /// A unit.
    Unit(UnitId),
}

impl From<TowerId> for EntityRef {
    fn from(id: TowerId) -> Self {
        Self::Tower(id)
    }
}

impl From<UnitId> for EntityRef {
    fn from(id: UnitId) -> Self {
        Self::Unit(id)
    }
}

/// Health points. Towers and units both lose health through contact damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points. May drop to zero or below before the owner
    /// reacts (capture for towers, destruction for units).
    pub current: i32,
}

impl Health {
    /// Create health with the given value.
    #[must_use]
    pub const fn new(current: i32) -> Self {
        Self { current }
    }

    /// Subtract `amount`, returning the remaining health.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        self.current = self.current.saturating_sub(amount);
        self.current
    }

    /// Whether health has reached zero or below.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Cosmetic identity shared between a tower and the units it spawns.
///
/// Captured towers take on the attacker's appearance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appearance {
    /// Material name handed to the renderer.
    pub material: String,
    /// Tint as RGB (0-255).
    pub color: [u8; 3],
}

impl Appearance {
    /// Create an appearance.
    #[must_use]
    pub fn new(material: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            material: material.into(),
            color,
        }
    }
}

/// Countdown timer advanced by the tick driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: Fixed,
}

impl Countdown {
    /// Start a countdown of `seconds`.
    #[must_use]
    pub const fn new(seconds: Fixed) -> Self {
        Self { remaining: seconds }
    }

    /// Advance by `dt`. Returns `true` once the countdown has run out.
    pub fn tick(&mut self, dt: Fixed) -> bool {
        if self.remaining > Fixed::ZERO {
            self.remaining = (self.remaining - dt).max(Fixed::ZERO);
        }
        self.is_finished()
    }

    /// Whether the countdown has run out.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }

    /// Seconds left.
    #[must_use]
    pub const fn remaining(&self) -> Fixed {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_can_go_below_zero() {
        let mut health = Health::new(1);
        assert_eq!(health.apply_damage(3), -2);
        assert!(health.is_depleted());
    }

    #[test]
    fn test_countdown_finishes() {
        let mut timer = Countdown::new(Fixed::from_num(1));
        let dt = Fixed::from_num(0.25);
        assert!(!timer.tick(dt));
        assert!(!timer.tick(dt));
        assert!(!timer.tick(dt));
        assert!(timer.tick(dt));
        assert!(timer.tick(dt));
        assert_eq!(timer.remaining(), Fixed::ZERO);
    }

    #[test]
    fn test_zero_countdown_is_finished_immediately() {
        let timer = Countdown::new(Fixed::ZERO);
        assert!(timer.is_finished());
    }

    #[test]
    fn test_entity_ref_ordering_groups_towers_first() {
        let tower = EntityRef::Tower(TowerId(9));
        let unit = EntityRef::Unit(UnitId(1));
        assert!(tower < unit);
    }
}
