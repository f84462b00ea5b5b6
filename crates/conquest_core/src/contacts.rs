//! Contact detection between circular bodies.
//!
//! Bodies are bucketed into a uniform grid every tick and only pairs that
//! share neighbouring cells are tested. The tracker remembers which pairs
//! were already touching so that only overlap-enter events are reported.
//! Tower/tower pairs are never reported; towers do not move.

use std::collections::{BTreeMap, BTreeSet};

use crate::components::EntityRef;
use crate::math::{Fixed, Vec2Fixed};

/// A circle taking part in contact detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body {
    /// Entity owning the circle.
    pub entity: EntityRef,
    /// Centre.
    pub position: Vec2Fixed,
    /// Radius.
    pub radius: Fixed,
}

/// An unordered pair of touching entities, stored smallest first.
pub type ContactPair = (EntityRef, EntityRef);

/// Uniform grid over body indices. Rebuilt on every detection pass.
#[derive(Debug, Clone)]
struct SpatialHash {
    cell_size: Fixed,
    cells: BTreeMap<(i32, i32), Vec<usize>>,
}

impl SpatialHash {
    fn new(cell_size: Fixed) -> Self {
        Self {
            cell_size: cell_size.max(Fixed::from_num(1)),
            cells: BTreeMap::new(),
        }
    }

    fn clear(&mut self) {
        self.cells.clear();
    }

    fn insert(&mut self, index: usize, position: Vec2Fixed) {
        let coords = self.cell_coords(position);
        self.cells.entry(coords).or_default().push(index);
    }

    /// Candidate indices within `radius` of `position`; callers still test
    /// the real distance.
    fn query(&self, position: Vec2Fixed, radius: Fixed) -> Vec<usize> {
        let reach = Vec2Fixed::new(radius, radius);
        let min = self.cell_coords(position - reach);
        let max = self.cell_coords(position + reach);
        let mut result = Vec::new();
        for x in min.0..=max.0 {
            for y in min.1..=max.1 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    result.extend(indices.iter().copied());
                }
            }
        }
        result
    }

    fn cell_coords(&self, position: Vec2Fixed) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor().to_num::<i32>(),
            (position.y / self.cell_size).floor().to_num::<i32>(),
        )
    }
}

/// Tracks which bodies overlap and reports newly entered contacts.
#[derive(Debug, Clone)]
pub struct ContactTracker {
    grid: SpatialHash,
    touching: BTreeSet<ContactPair>,
}

impl Default for ContactTracker {
    fn default() -> Self {
        Self::new(Fixed::from_num(4))
    }
}

impl ContactTracker {
    /// Create a tracker with the given grid cell size.
    #[must_use]
    pub fn new(cell_size: Fixed) -> Self {
        Self {
            grid: SpatialHash::new(cell_size),
            touching: BTreeSet::new(),
        }
    }

    /// Run one detection pass and return pairs that started touching since
    /// the previous pass, in sorted order.
    pub fn detect(&mut self, bodies: &[Body]) -> Vec<ContactPair> {
        self.grid.clear();
        let mut max_radius = Fixed::ZERO;
        for (index, body) in bodies.iter().enumerate() {
            self.grid.insert(index, body.position);
            max_radius = max_radius.max(body.radius);
        }

        let mut current = BTreeSet::new();
        for (i, body) in bodies.iter().enumerate() {
            for j in self.grid.query(body.position, body.radius + max_radius) {
                if j <= i {
                    continue;
                }
                let other = &bodies[j];
                if matches!(
                    (body.entity, other.entity),
                    (EntityRef::Tower(_), EntityRef::Tower(_))
                ) {
                    continue;
                }
                let reach = body.radius + other.radius;
                if body.position.distance_squared(other.position) < reach.saturating_mul(reach) {
                    current.insert(ordered(body.entity, other.entity));
                }
            }
        }

        let entered: Vec<ContactPair> = current.difference(&self.touching).copied().collect();
        self.touching = current;
        entered
    }

    /// Whether two entities were touching at the last detection pass.
    #[must_use]
    pub fn is_touching(&self, a: EntityRef, b: EntityRef) -> bool {
        self.touching.contains(&ordered(a, b))
    }

    /// Drop every pair involving `entity` (it left the world).
    pub fn forget(&mut self, entity: EntityRef) {
        self.touching.retain(|(a, b)| *a != entity && *b != entity);
    }

    /// Drop all remembered contacts.
    pub fn clear(&mut self) {
        self.touching.clear();
        self.grid.clear();
    }
}

fn ordered(a: EntityRef, b: EntityRef) -> ContactPair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{TowerId, UnitId};

    fn unit(id: u64, x: f64, y: f64) -> Body {
        Body {
            entity: EntityRef::Unit(UnitId(id)),
            position: Vec2Fixed::from_f64(x, y),
            radius: Fixed::from_num(0.25),
        }
    }

    fn tower(id: u64, x: f64, y: f64) -> Body {
        Body {
            entity: EntityRef::Tower(TowerId(id)),
            position: Vec2Fixed::from_f64(x, y),
            radius: Fixed::from_num(1),
        }
    }

    #[test]
    fn test_reports_enter_only_once() {
        let mut tracker = ContactTracker::default();
        let bodies = [unit(1, 0.0, 0.0), unit(2, 0.3, 0.0)];

        assert_eq!(
            tracker.detect(&bodies),
            vec![(EntityRef::Unit(UnitId(1)), EntityRef::Unit(UnitId(2)))]
        );
        assert!(tracker.detect(&bodies).is_empty());
    }

    #[test]
    fn test_separated_pair_can_enter_again() {
        let mut tracker = ContactTracker::default();
        let close = [unit(1, 0.0, 0.0), unit(2, 0.3, 0.0)];
        let apart = [unit(1, 0.0, 0.0), unit(2, 5.0, 0.0)];

        assert_eq!(tracker.detect(&close).len(), 1);
        assert!(tracker.detect(&apart).is_empty());
        assert_eq!(tracker.detect(&close).len(), 1);
    }

    #[test]
    fn test_towers_never_touch_each_other() {
        let mut tracker = ContactTracker::default();
        assert!(tracker.detect(&[tower(1, 0.0, 0.0), tower(2, 0.5, 0.0)]).is_empty());
    }

    #[test]
    fn test_unit_touches_tower_across_cells() {
        let mut tracker = ContactTracker::new(Fixed::from_num(1));
        let bodies = [tower(1, 0.9, 0.9), unit(5, 2.0, 0.9)];
        let entered = tracker.detect(&bodies);
        assert_eq!(
            entered,
            vec![(EntityRef::Tower(TowerId(1)), EntityRef::Unit(UnitId(5)))]
        );
    }

    #[test]
    fn test_negative_coordinates() {
        let mut tracker = ContactTracker::default();
        let bodies = [unit(1, -4.1, -0.1), unit(2, -3.9, 0.1)];
        assert_eq!(tracker.detect(&bodies).len(), 1);
    }

    #[test]
    fn test_forget_removes_pairs() {
        let mut tracker = ContactTracker::default();
        let bodies = [unit(1, 0.0, 0.0), unit(2, 0.3, 0.0)];
        tracker.detect(&bodies);
        assert!(tracker.is_touching(EntityRef::Unit(UnitId(2)), EntityRef::Unit(UnitId(1))));

        tracker.forget(EntityRef::Unit(UnitId(1)));
        assert!(!tracker.is_touching(EntityRef::Unit(UnitId(1)), EntityRef::Unit(UnitId(2))));
    }
}
