//! Static placement bookkeeping shared by the scenario builders.

use std::collections::BTreeMap;

use crowdgrid_agents::{Entity, WorldState};
use crowdgrid_types::Position;

use crate::error::ScenarioError;

/// Smallest board side that leaves an interior inside the border walls.
pub const MIN_SIDE: i32 = 3;

/// Cells claimed by static entities, checked for bounds and overlap before
/// anything is placed.
#[derive(Debug, Clone)]
pub struct Layout {
    width: i32,
    height: i32,
    claimed: BTreeMap<Position, &'static str>,
}

impl Layout {
    /// An empty layout over a `width` x `height` board.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidConfig`] if either side is smaller
    /// than [`MIN_SIDE`].
    pub fn new(width: i32, height: i32) -> Result<Self, ScenarioError> {
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(ScenarioError::invalid(format!(
                "board must be at least {MIN_SIDE}x{MIN_SIDE}, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            claimed: BTreeMap::new(),
        })
    }

    /// Board width.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Board height.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Claim `pos` for a `what` placement.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::OutOfBounds`] if `pos` is off the board and
    /// [`ScenarioError::Overlap`] if it is already claimed.
    pub fn claim(&mut self, what: &'static str, pos: Position) -> Result<Position, ScenarioError> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return Err(ScenarioError::OutOfBounds { what, position: pos });
        }
        if self.claimed.insert(pos, what).is_some() {
            return Err(ScenarioError::Overlap { position: pos });
        }
        Ok(pos)
    }

    /// Whether `pos` has been claimed.
    pub fn is_claimed(&self, pos: Position) -> bool {
        self.claimed.contains_key(&pos)
    }

    /// Border cells nobody claimed, each listed once.
    pub fn free_border(&self) -> Vec<Position> {
        let right = self.width.saturating_sub(1);
        let bottom = self.height.saturating_sub(1);
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = Position::new(x, y);
                let on_border = x == 0 || y == 0 || x == right || y == bottom;
                if on_border && !self.is_claimed(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }

    /// Wall off every free border cell. Returns how many walls were placed.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Agent`] if a wall cannot be placed.
    pub fn build_walls(&self, world: &mut WorldState) -> Result<usize, ScenarioError> {
        let cells = self.free_border();
        for &pos in &cells {
            world.spawn(Entity::Wall, pos)?;
        }
        Ok(cells.len())
    }
}

/// Reject probabilities outside `[0, 1]`.
///
/// # Errors
///
/// Returns [`ScenarioError::InvalidConfig`] naming `what`.
pub fn check_probability(what: &str, value: f64) -> Result<(), ScenarioError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ScenarioError::invalid(format!("{what} must be within [0, 1], got {value}")))
    }
}

/// Reject speeds outside `(0, 1]`; a zero speed never activates.
///
/// # Errors
///
/// Returns [`ScenarioError::InvalidConfig`] naming `what`.
pub fn check_speed(what: &str, value: f64) -> Result<(), ScenarioError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ScenarioError::invalid(format!("{what} must be within (0, 1], got {value}")))
    }
}

/// Reject negative or non-finite cost terms.
///
/// # Errors
///
/// Returns [`ScenarioError::InvalidConfig`] naming `what`.
pub fn check_non_negative(what: &str, value: f64) -> Result<(), ScenarioError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ScenarioError::invalid(format!("{what} must be finite and non-negative, got {value}")))
    }
}

/// A count as a board offset.
///
/// # Errors
///
/// Returns [`ScenarioError::InvalidConfig`] if it does not fit.
pub fn coord(what: &str, count: usize) -> Result<i32, ScenarioError> {
    i32::try_from(count).map_err(|source| ScenarioError::invalid(format!("{what} too large: {source}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn border_skips_claimed_cells_and_lists_corners_once() {
        let mut layout = Layout::new(4, 3).unwrap();
        layout.claim("gate", Position::new(0, 1)).unwrap();
        let border = layout.free_border();
        assert_eq!(border.len(), 9);
        assert!(!border.contains(&Position::new(0, 1)));
        assert_eq!(border.iter().filter(|&&p| p == Position::new(0, 0)).count(), 1);
    }

    #[test]
    fn overlap_and_bounds_are_rejected() {
        let mut layout = Layout::new(5, 5).unwrap();
        layout.claim("flag", Position::new(2, 2)).unwrap();
        assert!(matches!(
            layout.claim("player", Position::new(2, 2)),
            Err(ScenarioError::Overlap { .. })
        ));
        assert!(matches!(
            layout.claim("jail", Position::new(5, 0)),
            Err(ScenarioError::OutOfBounds { what: "jail", .. })
        ));
    }

    #[test]
    fn degenerate_board_is_rejected() {
        assert!(Layout::new(2, 10).is_err());
    }

    #[test]
    fn probabilities_outside_unit_interval_are_rejected() {
        assert!(check_probability("rate", 0.0).is_ok());
        assert!(check_probability("rate", 1.0).is_ok());
        assert!(check_probability("rate", 1.5).is_err());
        assert!(check_probability("rate", f64::NAN).is_err());
    }

    #[test]
    fn speeds_must_be_positive() {
        assert!(check_speed("speed", 0.5).is_ok());
        assert!(check_speed("speed", 1.0).is_ok());
        assert!(check_speed("speed", 0.0).is_err());
        assert!(check_speed("speed", -0.1).is_err());
        assert!(check_speed("speed", f64::NAN).is_err());
    }
}
