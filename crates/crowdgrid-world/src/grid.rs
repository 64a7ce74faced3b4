//! Bounded multi-occupancy grid.
//!
//! [`SpatialGrid`] is the single authority on where each entity is. It
//! keeps a per-cell list of occupants and a reverse index from entity to
//! cell, and every mutation updates both together. There is no wrap-around:
//! neighborhoods at the border are truncated.

use std::collections::BTreeMap;

use crowdgrid_types::{Direction, EntityId, Position};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

/// Which cells count as adjacent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Eight neighbors, diagonals included.
    #[default]
    Moore,
    /// Four orthogonal neighbors.
    VonNeumann,
}

impl Connectivity {
    /// Unit offsets of this neighborhood.
    pub const fn offsets(self) -> &'static [Direction] {
        match self {
            Self::Moore => &Direction::MOORE,
            Self::VonNeumann => &Direction::VON_NEUMANN,
        }
    }
}

// ---------------------------------------------------------------------------
// SpatialGrid
// ---------------------------------------------------------------------------

/// A `width` x `height` board where each cell holds an unordered set of
/// entity handles.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    cells: Vec<Vec<EntityId>>,
    positions: BTreeMap<EntityId, Position>,
}

impl SpatialGrid {
    /// Create an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is not
    /// positive or the cell count does not fit in memory indices.
    pub fn new(width: i32, height: i32) -> Result<Self, WorldError> {
        let cell_count = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![Vec::new(); cell_count],
            positions: BTreeMap::new(),
        })
    }

    /// Board width in cells.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Board height in cells.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether `pos` lies on the board.
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Fail with [`WorldError::OutOfBounds`] unless `pos` lies on the board.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] for off-board positions.
    pub const fn check_bounds(&self, pos: Position) -> Result<(), WorldError> {
        if self.in_bounds(pos) {
            Ok(())
        } else {
            Err(self.out_of_bounds(pos))
        }
    }

    /// Every in-bounds cell adjacent to `pos` under `connectivity`,
    /// optionally including `pos` itself as the first entry.
    pub fn neighbors(
        &self,
        pos: Position,
        connectivity: Connectivity,
        include_center: bool,
    ) -> Vec<Position> {
        let mut out = Vec::with_capacity(9);
        if include_center && self.in_bounds(pos) {
            out.push(pos);
        }
        for &offset in connectivity.offsets() {
            if let Some(cell) = pos.offset(offset)
                && self.in_bounds(cell)
            {
                out.push(cell);
            }
        }
        out
    }

    /// Entities in the cell at `pos`. Empty for out-of-bounds positions.
    pub fn occupants_at(&self, pos: Position) -> &[EntityId] {
        self.cell_index(pos)
            .and_then(|idx| self.cells.get(idx))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether the cell at `pos` holds no entity.
    pub fn is_empty_cell(&self, pos: Position) -> bool {
        self.occupants_at(pos).is_empty()
    }

    /// Current cell of `entity`.
    pub fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.positions.get(&entity).copied()
    }

    /// Number of entities on the grid.
    pub fn entity_count(&self) -> usize {
        self.positions.len()
    }

    /// Put an entity that is not yet on the grid into the cell at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] or [`WorldError::AlreadyPlaced`].
    pub fn place(&mut self, entity: EntityId, pos: Position) -> Result<(), WorldError> {
        if let Some(&existing) = self.positions.get(&entity) {
            return Err(WorldError::AlreadyPlaced {
                entity,
                position: existing,
            });
        }
        let idx = self.checked_index(pos)?;
        let oob = self.out_of_bounds(pos);
        let cell = self.cells.get_mut(idx).ok_or(oob)?;
        cell.push(entity);
        self.positions.insert(entity, pos);
        Ok(())
    }

    /// Move an entity to `to`, returning the cell it left.
    ///
    /// Bounds are checked before anything is modified, so a failed move
    /// leaves the grid untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] or [`WorldError::NotOnGrid`].
    pub fn move_entity(&mut self, entity: EntityId, to: Position) -> Result<Position, WorldError> {
        let to_idx = self.checked_index(to)?;
        let from = self.position_of(entity).ok_or(WorldError::NotOnGrid(entity))?;
        if from == to {
            return Ok(from);
        }
        self.detach(entity, from)?;
        let oob = self.out_of_bounds(to);
        let cell = self.cells.get_mut(to_idx).ok_or(oob)?;
        cell.push(entity);
        self.positions.insert(entity, to);
        Ok(from)
    }

    /// Take an entity off the grid, returning its last cell.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotOnGrid`] if the entity is not placed.
    pub fn remove(&mut self, entity: EntityId) -> Result<Position, WorldError> {
        let from = self.position_of(entity).ok_or(WorldError::NotOnGrid(entity))?;
        self.detach(entity, from)?;
        self.positions.remove(&entity);
        Ok(from)
    }

    /// Check that every indexed entity appears exactly once in the cell
    /// the index names and that no cell lists anything else.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellMismatch`] or
    /// [`WorldError::OccupancyMismatch`] describing the first breach.
    pub fn verify(&self) -> Result<(), WorldError> {
        for (&entity, &position) in &self.positions {
            let listed = self
                .occupants_at(position)
                .iter()
                .filter(|&&e| e == entity)
                .count();
            if listed != 1 {
                return Err(WorldError::CellMismatch { entity, position });
            }
        }
        let in_cells: usize = self.cells.iter().map(Vec::len).sum();
        if in_cells != self.positions.len() {
            return Err(WorldError::OccupancyMismatch {
                in_cells,
                indexed: self.positions.len(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn detach(&mut self, entity: EntityId, from: Position) -> Result<(), WorldError> {
        let mismatch = WorldError::CellMismatch {
            entity,
            position: from,
        };
        let Some(idx) = self.cell_index(from) else {
            return Err(mismatch);
        };
        let Some(cell) = self.cells.get_mut(idx) else {
            return Err(mismatch);
        };
        let Some(slot) = cell.iter().position(|&e| e == entity) else {
            return Err(mismatch);
        };
        cell.swap_remove(slot);
        Ok(())
    }

    fn cell_index(&self, pos: Position) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        let width = usize::try_from(self.width).ok()?;
        y.checked_mul(width)?.checked_add(x)
    }

    fn checked_index(&self, pos: Position) -> Result<usize, WorldError> {
        self.cell_index(pos).ok_or_else(|| self.out_of_bounds(pos))
    }

    const fn out_of_bounds(&self, position: Position) -> WorldError {
        WorldError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        }
    }
}

/// Number of cells in a `width` x `height` board.
///
/// # Errors
///
/// Returns [`WorldError::InvalidDimensions`] for non-positive or
/// overflowing dimensions.
pub fn cell_count(width: i32, height: i32) -> Result<usize, WorldError> {
    let invalid = WorldError::InvalidDimensions { width, height };
    if width <= 0 || height <= 0 {
        return Err(invalid);
    }
    let (Ok(w), Ok(h)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(invalid);
    };
    w.checked_mul(h).ok_or(invalid)
}
