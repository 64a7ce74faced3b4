//! Grid positions and step directions.
//!
//! Coordinates are integer cell indices with the origin at the lower-left
//! corner of the board. A [`Direction`] is a relative offset between two
//! cells; the unit offsets make up the Moore and von Neumann
//! neighborhoods.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column index, growing to the right.
    pub x: i32,
    /// Row index, growing upward.
    pub y: i32,
}

impl Position {
    /// Create a position from its column and row.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return the cell reached by applying `direction`, or `None` if the
    /// coordinate would overflow.
    pub const fn offset(self, direction: Direction) -> Option<Self> {
        let Some(x) = self.x.checked_add(direction.dx) else {
            return None;
        };
        let Some(y) = self.y.checked_add(direction.dy) else {
            return None;
        };
        Some(Self { x, y })
    }

    /// Return the offset that leads from `self` to `other`, or `None` if
    /// the difference overflows.
    pub const fn delta_to(self, other: Self) -> Option<Direction> {
        let Some(dx) = other.x.checked_sub(self.x) else {
            return None;
        };
        let Some(dy) = other.y.checked_sub(self.y) else {
            return None;
        };
        Some(Direction { dx, dy })
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A relative offset between two cells.
///
/// Agents remember the direction of their last move as their orientation,
/// and shots travel one unit direction per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Direction {
    /// Horizontal component.
    pub dx: i32,
    /// Vertical component.
    pub dy: i32,
}

impl Direction {
    /// No movement.
    pub const ZERO: Self = Self::new(0, 0);
    /// One column to the right.
    pub const EAST: Self = Self::new(1, 0);
    /// One column to the left.
    pub const WEST: Self = Self::new(-1, 0);
    /// One row up.
    pub const NORTH: Self = Self::new(0, 1);
    /// One row down.
    pub const SOUTH: Self = Self::new(0, -1);

    /// The eight Moore offsets, orthogonal steps first.
    pub const MOORE: [Self; 8] = [
        Self::new(1, 0),
        Self::new(0, 1),
        Self::new(-1, 0),
        Self::new(0, -1),
        Self::new(1, 1),
        Self::new(-1, -1),
        Self::new(-1, 1),
        Self::new(1, -1),
    ];

    /// The four von Neumann offsets.
    pub const VON_NEUMANN: [Self; 4] = [
        Self::new(1, 0),
        Self::new(0, 1),
        Self::new(-1, 0),
        Self::new(0, -1),
    ];

    /// Create a direction from its components.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Whether this is the zero offset.
    pub const fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Euclidean length of the offset.
    pub fn length(self) -> f64 {
        f64::from(self.dx).hypot(f64::from(self.dy))
    }

    /// The opposite offset, or `None` on overflow.
    pub const fn reversed(self) -> Option<Self> {
        let Some(dx) = self.dx.checked_neg() else {
            return None;
        };
        let Some(dy) = self.dy.checked_neg() else {
            return None;
        };
        Some(Self { dx, dy })
    }

    /// The Moore unit offset that best matches the heading of `target`,
    /// measured as the largest cosine between normalized vectors.
    ///
    /// Returns `None` for the zero vector, which has no heading. Ties keep
    /// the earliest offset in [`Direction::MOORE`].
    pub fn closest_unit(target: Self) -> Option<Self> {
        if target.is_zero() {
            return None;
        }
        let target_len = target.length();
        let mut best: Option<(Self, f64)> = None;
        for candidate in Self::MOORE {
            let dot = f64::from(candidate.dx)
                .mul_add(f64::from(target.dx), f64::from(candidate.dy) * f64::from(target.dy));
            let cosine = dot / (candidate.length() * target_len);
            match best {
                Some((_, score)) if score >= cosine => {}
                _ => best = Some((candidate, cosine)),
            }
        }
        best.map(|(direction, _)| direction)
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<{}, {}>", self.dx, self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_delta_are_inverse() {
        let a = Position::new(3, 4);
        let b = Position::new(7, 1);
        let delta = a.delta_to(b);
        assert_eq!(delta, Some(Direction::new(4, -3)));
        assert_eq!(delta.and_then(|d| a.offset(d)), Some(b));
    }

    #[test]
    fn offset_overflow_is_none() {
        assert_eq!(Position::new(i32::MAX, 0).offset(Direction::EAST), None);
    }

    #[test]
    fn diagonal_length_is_root_two() {
        let len = Direction::new(1, 1).length();
        assert!((len - core::f64::consts::SQRT_2).abs() < 1e-12);
        assert!((Direction::EAST.length() - 1.0).abs() < 1e-12);
        assert!(Direction::ZERO.length().abs() < 1e-12);
    }

    #[test]
    fn closest_unit_snaps_to_compass() {
        assert_eq!(Direction::closest_unit(Direction::new(5, 0)), Some(Direction::EAST));
        assert_eq!(Direction::closest_unit(Direction::new(-3, -3)), Some(Direction::new(-1, -1)));
        assert_eq!(Direction::closest_unit(Direction::new(1, -4)), Some(Direction::SOUTH));
        assert_eq!(Direction::closest_unit(Direction::ZERO), None);
    }

    #[test]
    fn reversed_flips_both_components() {
        assert_eq!(Direction::new(1, -1).reversed(), Some(Direction::new(-1, 1)));
    }
}
