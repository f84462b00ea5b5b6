//! Units: mobile agents walking from their home tower to a target tower.

use crate::components::{Appearance, Health, TowerId, UnitId};
use crate::factions::FactionTag;
use crate::math::{Fixed, Vec2Fixed};
use crate::tower::SpawnOrder;

/// A spawned unit.
///
/// Faction, home and target are fixed at spawn. The home tower is referenced
/// by id only; a unit never keeps its tower alive.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    faction: FactionTag,
    health: Health,
    home: TowerId,
    target: TowerId,
    position: Vec2Fixed,
    speed: Fixed,
    facing: Vec2Fixed,
    appearance: Option<Appearance>,
}

impl Unit {
    /// Build a unit from a tower's spawn order.
    #[must_use]
    pub fn from_order(id: UnitId, order: SpawnOrder, health: i32) -> Self {
        Self {
            id,
            faction: order.faction,
            health: Health::new(health),
            home: order.home,
            target: order.target,
            position: order.position,
            speed: order.speed,
            facing: Vec2Fixed::ZERO,
            appearance: order.appearance,
        }
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Faction inherited from the home tower.
    #[must_use]
    pub const fn faction(&self) -> &FactionTag {
        &self.faction
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health.current
    }

    /// Tower that spawned this unit.
    #[must_use]
    pub const fn home(&self) -> TowerId {
        self.home
    }

    /// Tower this unit walks toward.
    #[must_use]
    pub const fn target(&self) -> TowerId {
        self.target
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Unit-length heading, or zero before the unit has moved.
    #[must_use]
    pub const fn facing(&self) -> Vec2Fixed {
        self.facing
    }

    /// Appearance inherited from the home tower.
    #[must_use]
    pub const fn appearance(&self) -> Option<&Appearance> {
        self.appearance.as_ref()
    }

    /// Whether the unit still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }

    /// Step toward the target's current position and turn to face it.
    ///
    /// `target_position` is re-read every tick so units follow whatever the
    /// target tower is now. Without a target position the unit stays put.
    pub fn update(&mut self, dt: Fixed, target_position: Option<Vec2Fixed>) {
        let Some(goal) = target_position else {
            return;
        };

        self.position = self.position.move_towards(goal, self.speed * dt);

        let direction = goal - self.position;
        if direction.is_zero() {
            return;
        }

        let desired = direction.normalize();
        if self.facing.is_zero() {
            self.facing = desired;
            return;
        }

        let t = (dt * self.speed).min(Fixed::from_num(1));
        let blended = self.facing.lerp(desired, t).normalize();
        self.facing = if blended.is_zero() { desired } else { blended };
    }

    /// Subtract `amount` health. Returns `true` if this call depleted the
    /// unit; damage to an already depleted unit is ignored.
    pub fn get_damage(&mut self, amount: i32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health.apply_damage(amount);
        !self.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(position: Vec2Fixed, speed: f64) -> Unit {
        Unit::from_order(
            UnitId(1),
            SpawnOrder {
                home: TowerId(1),
                faction: FactionTag::Player,
                appearance: None,
                position,
                target: TowerId(2),
                speed: Fixed::from_num(speed),
            },
            1,
        )
    }

    #[test]
    fn test_moves_toward_target_at_speed() {
        let mut unit = unit_at(Vec2Fixed::ZERO, 4.0);
        unit.update(Fixed::from_num(0.5), Some(Vec2Fixed::from_f64(10.0, 0.0)));

        let epsilon = Fixed::from_num(1) / Fixed::from_num(10000);
        assert!((unit.position().x - Fixed::from_num(2)).abs() < epsilon);
        assert_eq!(unit.position().y, Fixed::ZERO);
    }

    #[test]
    fn test_tracks_moving_target() {
        let mut unit = unit_at(Vec2Fixed::ZERO, 1.0);
        let dt = Fixed::from_num(1);
        unit.update(dt, Some(Vec2Fixed::from_f64(10.0, 0.0)));
        unit.update(dt, Some(Vec2Fixed::from_f64(1.0, 10.0)));
        assert!(unit.position().y > Fixed::ZERO);
    }

    #[test]
    fn test_no_target_means_no_movement() {
        let mut unit = unit_at(Vec2Fixed::from_f64(3.0, 3.0), 5.0);
        unit.update(Fixed::from_num(1), None);
        assert_eq!(unit.position(), Vec2Fixed::from_f64(3.0, 3.0));
    }

    #[test]
    fn test_facing_turns_gradually() {
        let mut unit = unit_at(Vec2Fixed::ZERO, 1.0);
        let dt = Fixed::from_num(0.1);
        unit.update(dt, Some(Vec2Fixed::from_f64(100.0, 0.0)));
        assert!(unit.facing().x > Fixed::from_num(0.99));

        unit.update(dt, Some(Vec2Fixed::from_f64(0.0, 100.0)));
        let facing = unit.facing();
        assert!(facing.y > Fixed::ZERO, "should start turning");
        assert!(facing.x > Fixed::ZERO, "should not snap instantly");
    }

    #[test]
    fn test_destruction_is_reported_once() {
        let mut unit = unit_at(Vec2Fixed::ZERO, 1.0);
        assert!(unit.get_damage(1));
        assert!(!unit.is_alive());
        assert!(!unit.get_damage(1));
        assert_eq!(unit.health(), 0);
    }
}
