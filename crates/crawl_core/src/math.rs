//! Fixed-point math utilities for deterministic simulation.
//!
//! Positions, durations and frame deltas are all fixed-point so that
//! two sessions fed the same seed and the same tick sequence end in
//! bit-identical states.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Remaining distance below which an interpolating actor snaps to its target.
pub const ARRIVAL_EPSILON: Fixed = Fixed::from_bits(1 << 12);

/// Convert whole milliseconds to fixed-point seconds.
#[must_use]
pub fn millis_to_seconds(ms: u32) -> Fixed {
    Fixed::from_num(ms) / Fixed::from_num(1000)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Calculate squared length (avoids sqrt for comparisons).
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Lands exactly on `target` once the remaining distance is within
    /// `max_step` or [`ARRIVAL_EPSILON`].
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let delta = target - self;
        let distance = delta.length();
        if distance <= max_step || distance <= ARRIVAL_EPSILON {
            return target;
        }
        self + delta.scale(max_step / distance)
    }
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
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
    fn test_vec2_length() {
        let v = Vec2Fixed::from_ints(3, 4);
        assert_eq!(v.length_squared(), Fixed::from_num(25));
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((v.length() - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_millis_to_seconds() {
        assert_eq!(millis_to_seconds(1000), Fixed::ONE);
        assert_eq!(millis_to_seconds(500), Fixed::from_num(0.5));
        assert_eq!(millis_to_seconds(0), Fixed::ZERO);
    }

    #[test]
    fn test_move_towards_partial_step() {
        let start = Vec2Fixed::ZERO;
        let end = Vec2Fixed::from_ints(1, 0);
        let step = start.move_towards(end, Fixed::from_num(0.25));
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((step.x - Fixed::from_num(0.25)).abs() < epsilon);
        assert_eq!(step.y, Fixed::ZERO);
    }

    #[test]
    fn test_move_towards_snaps_on_overshoot() {
        let start = Vec2Fixed::from_ints(2, 2);
        let end = Vec2Fixed::from_ints(2, 3);
        assert_eq!(start.move_towards(end, Fixed::from_num(5)), end);
    }

    #[test]
    fn test_move_towards_at_target_is_stable() {
        let p = Vec2Fixed::from_ints(-1, 7);
        assert_eq!(p.move_towards(p, Fixed::ONE), p);
    }
}
