//! Distance metrics between cells.
//!
//! The diagonal metric is the octile distance: orthogonal steps cost
//! [`ORTHOGONAL_COST`] and diagonal steps cost [`DIAGONAL_COST`]. It is the
//! exact shortest-path length on an empty Moore grid, which makes it an
//! admissible A* heuristic.

use crowdgrid_types::Position;
use serde::{Deserialize, Serialize};

/// Cost of an orthogonal step under the diagonal metric.
pub const ORTHOGONAL_COST: f64 = 1.0;

/// Cost of a diagonal step under the diagonal metric.
pub const DIAGONAL_COST: f64 = core::f64::consts::SQRT_2;

/// Metric used to measure how far a cell is from a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Sum of absolute coordinate differences.
    Manhattan,
    /// Largest absolute coordinate difference.
    Chebyshev,
    /// Octile distance with diagonal steps of length sqrt(2).
    #[default]
    Diagonal,
}

impl DistanceMetric {
    /// Distance between `a` and `b` under this metric.
    pub fn measure(self, a: Position, b: Position) -> f64 {
        match self {
            Self::Manhattan => f64::from(manhattan(a, b)),
            Self::Chebyshev => f64::from(chebyshev(a, b)),
            Self::Diagonal => diagonal(a, b),
        }
    }

    /// Smallest distance from `from` to any of `goals`, or `None` when
    /// there are no goals.
    pub fn nearest(self, from: Position, goals: &[Position]) -> Option<f64> {
        goals
            .iter()
            .map(|&goal| self.measure(from, goal))
            .min_by(f64::total_cmp)
    }
}

/// |dx| + |dy|.
pub const fn manhattan(a: Position, b: Position) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}

/// max(|dx|, |dy|).
pub const fn chebyshev(a: Position, b: Position) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    if dx > dy { dx } else { dy }
}

/// Octile distance: `D1 * (dx + dy) + (D2 - 2 * D1) * min(dx, dy)`.
pub fn diagonal(a: Position, b: Position) -> f64 {
    let dx = f64::from(a.x.abs_diff(b.x));
    let dy = f64::from(a.y.abs_diff(b.y));
    let straight = ORTHOGONAL_COST * (dx + dy);
    (2.0f64.mul_add(-ORTHOGONAL_COST, DIAGONAL_COST)).mul_add(dx.min(dy), straight)
}

/// Euclidean length of the step from `a` to `b`.
pub fn step_length(a: Position, b: Position) -> f64 {
    let dx = f64::from(a.x.abs_diff(b.x));
    let dy = f64::from(a.y.abs_diff(b.y));
    dx.hypot(dy)
}
