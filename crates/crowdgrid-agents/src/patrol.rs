//! The 16-cell patrol ring around a defended flag.
//!
//! The ring is every cell at Chebyshev distance 2 from the centre, indexed
//! clockwise starting from the top-right corner. A defender on the ring
//! steps to the next index, wrapping from 15 back to 0.

use crowdgrid_types::{Direction, Position};

/// Number of cells on the ring.
pub const RING_LEN: usize = 16;

/// Ring offsets from the centre, clockwise from the top-right corner.
pub const PATROL_CONTOUR: [Direction; RING_LEN] = [
    Direction::new(2, 2),
    Direction::new(2, 1),
    Direction::new(2, 0),
    Direction::new(2, -1),
    Direction::new(2, -2),
    Direction::new(1, -2),
    Direction::new(0, -2),
    Direction::new(-1, -2),
    Direction::new(-2, -2),
    Direction::new(-2, -1),
    Direction::new(-2, 0),
    Direction::new(-2, 1),
    Direction::new(-2, 2),
    Direction::new(-1, 2),
    Direction::new(0, 2),
    Direction::new(1, 2),
];

/// Ring index of `offset`, or `None` if it is not on the ring.
pub fn ring_index(offset: Direction) -> Option<usize> {
    PATROL_CONTOUR.iter().position(|&d| d == offset)
}

/// Index following `index`, wrapping after the last ring cell.
pub const fn next_index(index: usize) -> usize {
    let next = index.saturating_add(1);
    if next >= RING_LEN { 0 } else { next }
}

/// Offset at ring `index`.
pub fn offset_at(index: usize) -> Option<Direction> {
    PATROL_CONTOUR.get(index).copied()
}

/// The cell a defender at `pos` should patrol to next around `center`,
/// or `None` if `pos` is not on the ring.
pub fn next_patrol_cell(center: Position, pos: Position) -> Option<Position> {
    let index = ring_index(center.delta_to(pos)?)?;
    center.offset(offset_at(next_index(index))?)
}

/// All ring cells around `center`, in ring order.
pub fn ring_cells(center: Position) -> Vec<Position> {
    PATROL_CONTOUR
        .iter()
        .filter_map(|&offset| center.offset(offset))
        .collect()
}
