//! Observable per-tick state and aggregate counters.
//!
//! A [`WorldSnapshot`] is what a renderer or an analysis tool consumes
//! after each tick: every live entity with its kind, cell, orientation,
//! and side. Walkers leaving the board produce a [`WalkerRecord`]; the
//! flag games keep a [`Scoreboard`] of deliveries.

use serde::{Deserialize, Serialize};

use crate::enums::{EntityKind, PerSide, Side};
use crate::geometry::{Direction, Position};
use crate::ids::EntityId;

/// Observable state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Arena handle.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Current cell.
    pub position: Position,
    /// Heading of the last move, for entities that move.
    pub orientation: Option<Direction>,
    /// Owning side, for entities that have one.
    pub side: Option<Side>,
    /// Player currently carries a flag.
    pub carrying_flag: bool,
    /// Player is held in a jail.
    pub jailed: bool,
    /// Projectile has hit something and will be removed on its next turn.
    pub crashed: bool,
}

/// Observable state of the whole board after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick this snapshot was taken after.
    pub tick: u64,
    /// Board width in cells.
    pub width: i32,
    /// Board height in cells.
    pub height: i32,
    /// Every live entity, in arena order.
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Iterate over the entities of one kind.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Count the entities of one kind.
    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Look up an entity by handle.
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// Counters collected when a walker leaves through an exit or gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerRecord {
    /// Side the walker entered from.
    pub side: Side,
    /// Per-tick activation probability.
    pub speed: f64,
    /// Ticks spent on the board.
    pub age: u64,
    /// Euclidean distance travelled.
    pub distance: f64,
    /// Ticks on which the walker was activated.
    pub activations: u64,
}

/// Flags delivered per team.
pub type Scoreboard = PerSide<u32>;

/// Increment the score of `side` by one.
pub const fn record_delivery(scoreboard: &mut Scoreboard, side: Side) {
    let score = scoreboard.get_mut(side);
    *score = score.saturating_add(1);
}

/// Side with the strictly higher score, if any.
pub const fn leader(scoreboard: &Scoreboard) -> Option<Side> {
    if scoreboard.left > scoreboard.right {
        Some(Side::Left)
    } else if scoreboard.right > scoreboard.left {
        Some(Side::Right)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> WorldSnapshot {
        WorldSnapshot {
            tick: 3,
            width: 5,
            height: 4,
            entities: vec![
                EntitySnapshot {
                    id: EntityId::new(0),
                    kind: EntityKind::Wall,
                    position: Position::new(0, 0),
                    orientation: None,
                    side: None,
                    carrying_flag: false,
                    jailed: false,
                    crashed: false,
                },
                EntitySnapshot {
                    id: EntityId::new(4),
                    kind: EntityKind::Walker,
                    position: Position::new(2, 2),
                    orientation: Some(Direction::EAST),
                    side: Some(Side::Left),
                    carrying_flag: false,
                    jailed: false,
                    crashed: false,
                },
            ],
        }
    }

    #[test]
    fn counts_by_kind() {
        let snap = sample();
        assert_eq!(snap.count_kind(EntityKind::Walker), 1);
        assert_eq!(snap.count_kind(EntityKind::Player), 0);
        assert_eq!(snap.entity(EntityId::new(4)).unwrap().position, Position::new(2, 2));
    }

    #[test]
    fn snapshot_serializes_for_renderers() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["entities"][1]["kind"], "walker");
        assert_eq!(json["entities"][1]["orientation"]["dx"], 1);
    }

    #[test]
    fn scoreboard_leader() {
        let mut board = Scoreboard::default();
        assert_eq!(leader(&board), None);
        record_delivery(&mut board, Side::Right);
        assert_eq!(leader(&board), Some(Side::Right));
        assert_eq!(board.right, 1);
    }
}
