//! Additive influence fields.
//!
//! An [`InfluenceField`] is a scalar value per cell. Entities stamp an
//! [`InfluenceMask`] centred on their cell when they arrive and subtract
//! the same mask when they leave, so a field always equals its baseline
//! plus the masks of the entities currently contributing to it. Mask cells
//! that fall outside the board are clipped on both apply and withdraw,
//! which keeps the two operations exact inverses.

use crowdgrid_types::{Direction, Position};

use crate::error::WorldError;
use crate::grid::cell_count;

// ---------------------------------------------------------------------------
// InfluenceMask
// ---------------------------------------------------------------------------

/// Square kernel of non-negative weights centred on a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluenceMask {
    radius: i32,
    /// Row-major weights, `(2r+1)^2` entries, first row is `dy = -r`.
    weights: Vec<i32>,
}

/// Crowd and player pressure kernel, peak at the centre.
const PRESSURE_KERNEL: [[i32; 5]; 5] = [
    [0, 1, 1, 1, 0],
    [1, 2, 3, 2, 1],
    [1, 3, 4, 3, 1],
    [1, 2, 3, 2, 1],
    [0, 1, 1, 1, 0],
];

/// Weights along a projectile's heading, starting at its own cell.
const RAY_WEIGHTS: [i32; 3] = [4, 3, 2];

impl InfluenceMask {
    /// Build a mask of the given radius from row-major weights.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidMask`] if the radius is negative, the
    /// weight count is not `(2r+1)^2`, or any weight is negative.
    pub fn new(radius: i32, weights: Vec<i32>) -> Result<Self, WorldError> {
        let side = radius
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .filter(|_| radius >= 0)
            .ok_or_else(|| WorldError::InvalidMask {
                reason: format!("radius {radius} is not usable"),
            })?;
        let expected = cell_count(side, side)?;
        if weights.len() != expected {
            return Err(WorldError::InvalidMask {
                reason: format!("expected {expected} weights, got {}", weights.len()),
            });
        }
        if weights.iter().any(|&w| w < 0) {
            return Err(WorldError::InvalidMask {
                reason: "weights must be non-negative".to_owned(),
            });
        }
        Ok(Self { radius, weights })
    }

    /// The 5x5 pressure kernel used for walkers and players.
    pub fn pressure() -> Self {
        Self {
            radius: 2,
            weights: PRESSURE_KERNEL.iter().flatten().copied().collect(),
        }
    }

    /// A 5x5 threat kernel for a projectile heading along `heading`.
    ///
    /// The projectile's own cell and the next two cells ahead carry
    /// decreasing weights; the cells beside the two forward cells carry 1.
    pub fn directional(heading: Direction) -> Self {
        let mut mask = Self {
            radius: 2,
            weights: vec![0; 25],
        };
        let lateral = Direction::new(heading.dy, heading.dx.saturating_neg());
        let mut ahead = Direction::ZERO;
        for (step, &weight) in RAY_WEIGHTS.iter().enumerate() {
            mask.raise(ahead, weight);
            if step > 0 {
                let opposite = Direction::new(lateral.dx.saturating_neg(), lateral.dy.saturating_neg());
                for side in [lateral, opposite] {
                    let beside = Direction::new(
                        ahead.dx.saturating_add(side.dx),
                        ahead.dy.saturating_add(side.dy),
                    );
                    mask.raise(beside, 1);
                }
            }
            ahead = Direction::new(
                ahead.dx.saturating_add(heading.dx),
                ahead.dy.saturating_add(heading.dy),
            );
        }
        mask
    }

    /// Distance from the centre to the mask edge.
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Weight at `offset` from the centre, zero outside the mask.
    pub fn weight(&self, offset: Direction) -> i32 {
        self.slot(offset)
            .and_then(|idx| self.weights.get(idx))
            .copied()
            .unwrap_or(0)
    }

    /// Iterate over `(offset, weight)` pairs with non-zero weight.
    pub fn entries(&self) -> impl Iterator<Item = (Direction, i32)> + '_ {
        let r = self.radius;
        (-r..=r)
            .flat_map(move |dy| (-r..=r).map(move |dx| Direction::new(dx, dy)))
            .map(|offset| (offset, self.weight(offset)))
            .filter(|&(_, w)| w != 0)
    }

    fn slot(&self, offset: Direction) -> Option<usize> {
        let r = self.radius;
        if offset.dx.unsigned_abs() > r.unsigned_abs() || offset.dy.unsigned_abs() > r.unsigned_abs() {
            return None;
        }
        let side = usize::try_from(r.checked_mul(2)?.checked_add(1)?).ok()?;
        let col = usize::try_from(offset.dx.checked_add(r)?).ok()?;
        let row = usize::try_from(offset.dy.checked_add(r)?).ok()?;
        row.checked_mul(side)?.checked_add(col)
    }

    fn raise(&mut self, offset: Direction, weight: i32) {
        if let Some(idx) = self.slot(offset)
            && let Some(slot) = self.weights.get_mut(idx)
        {
            *slot = (*slot).max(weight);
        }
    }
}

// ---------------------------------------------------------------------------
// InfluenceField
// ---------------------------------------------------------------------------

/// Scalar field over the board, updated by masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluenceField {
    width: i32,
    height: i32,
    baseline: i32,
    values: Vec<i32>,
}

impl InfluenceField {
    /// Create a field with every cell at `baseline`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for a degenerate board.
    pub fn new(width: i32, height: i32, baseline: i32) -> Result<Self, WorldError> {
        let cells = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            baseline,
            values: vec![baseline; cells],
        })
    }

    /// Value the field starts from and returns to when nothing contributes.
    pub const fn baseline(&self) -> i32 {
        self.baseline
    }

    /// Value at `pos`, or `None` off the board.
    pub fn value_at(&self, pos: Position) -> Option<i32> {
        self.index(pos).and_then(|idx| self.values.get(idx)).copied()
    }

    /// Add `mask` centred on `center`, clipped to the board.
    pub fn apply(&mut self, mask: &InfluenceMask, center: Position) {
        self.stamp(mask, center, i32::saturating_add);
    }

    /// Subtract `mask` centred on `center`, clipped to the board.
    pub fn withdraw(&mut self, mask: &InfluenceMask, center: Position) {
        self.stamp(mask, center, i32::saturating_sub);
    }

    /// Move a contribution from `from` to `to`.
    pub fn relocate(&mut self, mask: &InfluenceMask, from: Position, to: Position) {
        if from != to {
            self.withdraw(mask, from);
            self.apply(mask, to);
        }
    }

    /// Whether every cell is back at the baseline.
    pub fn is_at_baseline(&self) -> bool {
        self.values.iter().all(|&v| v == self.baseline)
    }

    /// Smallest value on the board.
    pub fn min_value(&self) -> i32 {
        self.values.iter().copied().min().unwrap_or(self.baseline)
    }

    /// Row-major values, first row is `y = 0`.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    fn stamp(&mut self, mask: &InfluenceMask, center: Position, op: fn(i32, i32) -> i32) {
        for (offset, weight) in mask.entries() {
            let Some(cell) = center.offset(offset) else {
                continue;
            };
            if let Some(idx) = self.index(cell)
                && let Some(value) = self.values.get_mut(idx)
            {
                *value = op(*value, weight);
            }
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        let width = usize::try_from(self.width).ok()?;
        y.checked_mul(width)?.checked_add(x)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn pressure_kernel_shape() {
        let mask = InfluenceMask::pressure();
        assert_eq!(mask.radius(), 2);
        assert_eq!(mask.weight(Direction::ZERO), 4);
        assert_eq!(mask.weight(Direction::new(2, 2)), 0);
        assert_eq!(mask.weight(Direction::new(1, 0)), 3);
        assert_eq!(mask.weight(Direction::new(3, 0)), 0);
        assert_eq!(mask.entries().count(), 21);
        assert_eq!(mask.entries().map(|(_, w)| w).sum::<i32>(), 36);
    }

    #[test]
    fn stamp_adds_every_mask_entry_once() {
        let mask = InfluenceMask::pressure();
        let mut field = InfluenceField::new(9, 9, 1).unwrap();
        field.apply(&mask, Position::new(4, 4));
        let raised: i32 = field.values().iter().map(|&v| v - 1).sum();
        assert_eq!(raised, mask.entries().map(|(_, w)| w).sum::<i32>());
        for (offset, weight) in mask.entries() {
            let cell = Position::new(4 + offset.dx, 4 + offset.dy);
            assert_eq!(field.value_at(cell), Some(1 + weight));
        }
    }

    #[test]
    fn directional_kernel_points_ahead() {
        let mask = InfluenceMask::directional(Direction::EAST);
        assert_eq!(mask.weight(Direction::ZERO), 4);
        assert_eq!(mask.weight(Direction::new(1, 0)), 3);
        assert_eq!(mask.weight(Direction::new(2, 0)), 2);
        assert_eq!(mask.weight(Direction::new(1, 1)), 1);
        assert_eq!(mask.weight(Direction::new(2, -1)), 1);
        assert_eq!(mask.weight(Direction::new(-1, 0)), 0);
    }

    #[test]
    fn mask_validation() {
        assert!(InfluenceMask::new(1, vec![1; 9]).is_ok());
        assert!(InfluenceMask::new(1, vec![1; 8]).is_err());
        assert!(InfluenceMask::new(0, vec![-1]).is_err());
        assert!(InfluenceMask::new(-1, vec![]).is_err());
    }

    #[test]
    fn apply_then_withdraw_restores_field_at_edges() {
        let mask = InfluenceMask::pressure();
        let mut field = InfluenceField::new(6, 4, 1).unwrap();
        let before = field.clone();
        field.apply(&mask, Position::new(0, 0));
        assert_eq!(field.value_at(Position::new(0, 0)), Some(5));
        field.apply(&mask, Position::new(5, 3));
        field.apply(&mask, Position::new(2, 1));
        assert!(!field.is_at_baseline());
        field.withdraw(&mask, Position::new(2, 1));
        field.withdraw(&mask, Position::new(0, 0));
        field.withdraw(&mask, Position::new(5, 3));
        assert_eq!(field, before);
        assert!(field.min_value() >= 1);
    }

    #[test]
    fn relocate_moves_contribution() {
        let mask = InfluenceMask::pressure();
        let mut field = InfluenceField::new(9, 9, 0).unwrap();
        field.apply(&mask, Position::new(2, 2));
        field.relocate(&mask, Position::new(2, 2), Position::new(6, 6));
        assert_eq!(field.value_at(Position::new(2, 2)), Some(0));
        assert_eq!(field.value_at(Position::new(6, 6)), Some(4));
        field.withdraw(&mask, Position::new(6, 6));
        assert!(field.is_at_baseline());
    }

    #[test]
    fn off_board_reads_are_none() {
        let field = InfluenceField::new(3, 3, 0).unwrap();
        assert_eq!(field.value_at(Position::new(3, 0)), None);
    }
}
