//! Discrete grid coordinates and single-step directions.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};

/// Integer grid coordinate.
///
/// The playable interior spans `0..columns` × `0..rows`; the boundary ring
/// sits at `-1` and `columns`/`rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Cell {
    /// Create a new cell.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell one step in `direction`.
    #[must_use]
    pub const fn offset(self, direction: Direction) -> Self {
        Self::new(self.x + direction.dx, self.y + direction.dy)
    }

    /// World-space position of this cell (cells are one unit wide).
    #[must_use]
    pub fn to_world(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.x, self.y)
    }

    /// Nearest cell to a world-space position.
    #[must_use]
    pub fn from_world(position: Vec2Fixed) -> Self {
        Self::new(round_to_i32(position.x), round_to_i32(position.y))
    }
}

fn round_to_i32(value: Fixed) -> i32 {
    value.round().to_num::<i32>()
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single grid step: each component is -1, 0 or 1 and at least one is non-zero.
///
/// Diagonals are representable; input handlers are expected to pass
/// axis-aligned steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    dx: i32,
    dy: i32,
}

impl Direction {
    /// One row up.
    pub const UP: Self = Self { dx: 0, dy: 1 };
    /// One row down.
    pub const DOWN: Self = Self { dx: 0, dy: -1 };
    /// One column left.
    pub const LEFT: Self = Self { dx: -1, dy: 0 };
    /// One column right.
    pub const RIGHT: Self = Self { dx: 1, dy: 0 };

    /// The four axis-aligned steps.
    pub const CARDINAL: [Self; 4] = [Self::UP, Self::DOWN, Self::LEFT, Self::RIGHT];

    /// Validate a raw direction vector.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidDirection`] for the zero vector or any
    /// component outside `-1..=1`.
    pub fn new(dx: i32, dy: i32) -> Result<Self> {
        let unit = |c: i32| (-1..=1).contains(&c);
        if !unit(dx) || !unit(dy) || (dx == 0 && dy == 0) {
            return Err(GameError::InvalidDirection { dx, dy });
        }
        Ok(Self { dx, dy })
    }

    /// Horizontal component.
    #[must_use]
    pub const fn dx(self) -> i32 {
        self.dx
    }

    /// Vertical component.
    #[must_use]
    pub const fn dy(self) -> i32 {
        self.dy
    }

    /// Whether the step moves along exactly one axis.
    #[must_use]
    pub const fn is_axis_aligned(self) -> bool {
        self.dx == 0 || self.dy == 0
    }

    /// The step as a world-space vector.
    #[must_use]
    pub fn to_vec(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.dx, self.dy)
    }
}
