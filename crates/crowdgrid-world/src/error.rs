//! Error types for the `crowdgrid-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`].

use crowdgrid_types::{EntityId, Position};

/// Errors that can occur during grid and field operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid or field dimensions are not positive or overflow.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },

    /// A position lies outside the grid.
    #[error("position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// Grid width.
        width: i32,
        /// Grid height.
        height: i32,
    },

    /// The entity is already on the grid.
    #[error("entity {entity} is already placed at {position}")]
    AlreadyPlaced {
        /// The entity.
        entity: EntityId,
        /// Where it currently is.
        position: Position,
    },

    /// The entity is not on the grid.
    #[error("entity {0} is not on the grid")]
    NotOnGrid(EntityId),

    /// The grid's position index and cell contents disagree.
    #[error("entity {entity} is indexed at {position} but its cell does not list it exactly once")]
    CellMismatch {
        /// The inconsistent entity.
        entity: EntityId,
        /// Where the index says it is.
        position: Position,
    },

    /// Cell contents list more entities than the position index knows.
    #[error("cells hold {in_cells} entries but {indexed} entities are indexed")]
    OccupancyMismatch {
        /// Total entries across all cells.
        in_cells: usize,
        /// Entities in the position index.
        indexed: usize,
    },

    /// An influence mask was built from malformed weights.
    #[error("invalid influence mask: {reason}")]
    InvalidMask {
        /// What was wrong with it.
        reason: String,
    },
}
