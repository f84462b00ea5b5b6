//! Fixed-point math utilities for deterministic simulation.
//!
//! Positions, speeds and timers all use fixed-point arithmetic so that a
//! seeded match replays identically on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Convert a data-file float into [`Fixed`], rejecting NaN, infinities and
/// values outside the fixed-point range.
#[must_use]
pub fn fixed_from_f64(value: f64) -> Option<Fixed> {
    if value.is_finite() {
        Fixed::checked_from_num(value)
    } else {
        None
    }
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from floats. Intended for data loading and tests.
    #[must_use]
    ///
    /// Out-of-range values saturate; NaN becomes zero.
    pub fn from_f64(x: f64, y: f64) -> Self {
        let convert = |v: f64| {
            if v.is_nan() {
                Fixed::ZERO
            } else {
                Fixed::saturating_from_num(v)
            }
        };
        Self::new(convert(x), convert(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Dot product of two vectors. Saturates instead of overflowing.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Step from `self` toward `target` by at most `max_delta`, landing
    /// exactly on the target instead of overshooting it.
    #[must_use]
    pub fn move_towards(self, target: Self, max_delta: Fixed) -> Self {
        let diff = target - self;
        let dist = diff.length();
        if dist <= max_delta || dist == Fixed::ZERO {
            return target;
        }
        self + diff.scale(max_delta / dist)
    }

    /// Convert to a float pair for protocol output.
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num::<f64>(), self.y.to_num::<f64>())
    }
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..64 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(4));
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_vec2_length() {
        let v = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(4));
        let epsilon = Fixed::from_num(1) / Fixed::from_num(10000);
        assert!((v.length() - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::new(Fixed::from_num(10), Fixed::from_num(20));
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::new(Fixed::from_num(5), Fixed::from_num(10)));
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(4));
        let norm = v.normalize();

        let len_sq = norm.dot(norm);
        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!(
            (len_sq - one).abs() < epsilon,
            "normalized vector length² should be ~1, got {:?}",
            len_sq
        );

        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon, "direction not preserved: {:?}", ratio_diff);
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_move_towards_partial_step() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::new(Fixed::from_num(10), Fixed::ZERO);
        let next = start.move_towards(target, Fixed::from_num(2));
        let epsilon = Fixed::from_num(1) / Fixed::from_num(10000);
        assert!((next.x - Fixed::from_num(2)).abs() < epsilon);
        assert_eq!(next.y, Fixed::ZERO);
    }

    #[test]
    fn test_move_towards_never_overshoots() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::new(Fixed::from_num(1), Fixed::from_num(1));
        assert_eq!(start.move_towards(target, Fixed::from_num(5)), target);
    }

    #[test]
    fn test_length_of_huge_vector_saturates() {
        let far = Vec2Fixed::from_f64(50_000.0, 50_000.0);
        assert_eq!(far.dot(far), Fixed::MAX);
        assert!(far.length() > Fixed::from_num(40_000));
    }

    #[test]
    fn test_from_f64_saturates_out_of_range() {
        let v = Vec2Fixed::from_f64(1e30, f64::NAN);
        assert_eq!(v.x, Fixed::MAX);
        assert_eq!(v.y, Fixed::ZERO);
    }

    #[test]
    fn test_fixed_from_f64_rejects_non_finite() {
        assert!(fixed_from_f64(f64::NAN).is_none());
        assert!(fixed_from_f64(f64::INFINITY).is_none());
        assert!(fixed_from_f64(1e30).is_none());
        assert_eq!(fixed_from_f64(2.5), Some(Fixed::from_num(2.5)));
    }

    mod properties {
        use super::*;
        use crate::level::MAX_COORDINATE;
        use proptest::prelude::*;

        fn arb_point() -> impl Strategy<Value = Vec2Fixed> {
            (-MAX_COORDINATE..=MAX_COORDINATE, -MAX_COORDINATE..=MAX_COORDINATE)
                .prop_map(|(x, y)| Vec2Fixed::from_f64(x, y))
        }

        proptest! {
            #[test]
            fn prop_move_towards_closes_in_without_overshoot(
                from in arb_point(),
                to in arb_point(),
                step in 0.01f64..100.0,
            ) {
                let step = Fixed::from_num(step);
                let tolerance = Fixed::from_num(0.01);
                let next = from.move_towards(to, step);

                prop_assert!((next - from).length() <= step + tolerance);
                prop_assert!((to - next).length() <= (to - from).length() + tolerance);
            }

            #[test]
            fn prop_length_is_exact_inside_the_map(a in arb_point(), b in arb_point()) {
                let diff = b - a;
                prop_assert!(diff.dot(diff) < Fixed::MAX);
                let (dx, dy) = diff.to_f64();
                let expected = dx.hypot(dy);
                prop_assert!((diff.length().to_num::<f64>() - expected).abs() < 0.01);
            }
        }
    }
}
