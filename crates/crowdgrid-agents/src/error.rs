//! Error types for the crowdgrid-agents crate.
//!
//! Ordinary outcomes such as "no legal move" or "no path" are not errors.
//! The variants here describe broken invariants: a handle that no longer
//! resolves, a behavior dispatched to the wrong kind of entity, or a grid
//! failure underneath.

use crowdgrid_types::{EntityId, EntityKind};
use crowdgrid_world::WorldError;

/// Errors that can occur while mutating entity state.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A grid operation failed.
    #[error("grid error: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// No live entity has this handle.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity exists but is not of the kind the caller needs.
    #[error("entity {entity} is a {found:?}, expected {expected:?}")]
    WrongKind {
        /// The entity.
        entity: EntityId,
        /// What the caller needed.
        expected: EntityKind,
        /// What it actually is.
        found: EntityKind,
    },

    /// A live entity has no grid cell, or a grid entry has no entity.
    #[error("entity {0} is registered but not on the grid")]
    Unplaced(EntityId),

    /// The tick counter overflowed.
    #[error("tick counter overflow")]
    TickOverflow,
}
