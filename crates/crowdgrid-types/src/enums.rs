//! Enumeration types shared across the simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// One of the two opposing groups on the board.
///
/// In crowd scenarios the side is the edge a walker enters from; in the
/// flag games it is the team. Side `Left` is team 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Entered from (or defending) the left edge.
    Left,
    /// Entered from (or defending) the right edge.
    Right,
}

impl Side {
    /// Both sides, team 0 first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// The other side.
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Team index: 0 for `Left`, 1 for `Right`.
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// A pair of values, one per [`Side`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    /// Value for the left side (team 0).
    pub left: T,
    /// Value for the right side (team 1).
    pub right: T,
}

impl<T> PerSide<T> {
    /// Build a table from both values.
    pub const fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Borrow the value for `side`.
    pub const fn get(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Mutably borrow the value for `side`.
    pub const fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Build a table by evaluating `f` once per side, left first.
    pub fn from_fn(mut f: impl FnMut(Side) -> T) -> Self {
        let left = f(Side::Left);
        let right = f(Side::Right);
        Self { left, right }
    }
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Discriminant of every entity that can occupy a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Impassable boundary cell.
    Wall,
    /// Portal that spawns walkers.
    Entry,
    /// Portal that removes walkers arriving from the other side.
    Exit,
    /// Portal that both spawns natives and removes foreigners.
    Gate,
    /// Pedestrian heading for the far side of the board.
    Walker,
    /// Team member in a flag game.
    Player,
    /// A team's flag.
    Flag,
    /// Cell where captured opponents are held.
    Jail,
    /// Drop-off cell where captured flags score.
    Delivery,
    /// Projectile travelling in a fixed direction.
    FireShot,
}

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// The high-level action a player chose on its most recent turn.
///
/// Teammates read each other's actions to coordinate rescues and cap
/// the number of defenders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    /// No action taken yet.
    #[default]
    Idle,
    /// Freeing a jailed teammate.
    Rescue,
    /// Guarding or recovering the own flag.
    DefendFlag,
    /// Arresting a nearby opponent.
    AttackEnemy,
    /// Capturing or delivering the opponent flag.
    AttackFlag,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_involution() {
        for side in Side::ALL {
            assert_eq!(side.opponent().opponent(), side);
            assert_ne!(side.opponent(), side);
        }
    }

    #[test]
    fn per_side_lookup() {
        let mut table = PerSide::new(1, 2);
        assert_eq!(*table.get(Side::Left), 1);
        *table.get_mut(Side::Right) += 5;
        assert_eq!(table.right, 7);
        let built = PerSide::from_fn(Side::index);
        assert_eq!(built, PerSide::new(0, 1));
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let json = serde_json::to_string(&EntityKind::FireShot).unwrap();
        assert_eq!(json, "\"fire_shot\"");
        let side: Side = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(side, Side::Right);
    }
}
