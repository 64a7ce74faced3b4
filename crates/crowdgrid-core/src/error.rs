//! Error types for scenario construction and tick execution.

use crowdgrid_agents::AgentError;
use crowdgrid_types::Position;
use crowdgrid_world::WorldError;

/// Errors raised while building a scenario or running one of its agents.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A configuration value is outside its accepted range.
    #[error("invalid scenario configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A static placement falls outside the board.
    #[error("{what} at {position} is outside the board")]
    OutOfBounds {
        /// The kind of placement.
        what: &'static str,
        /// The offending cell.
        position: Position,
    },

    /// Two static placements claim the same cell.
    #[error("overlapping static placements at {position}")]
    Overlap {
        /// The contested cell.
        position: Position,
    },

    /// An agent behavior failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A grid or field operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

impl ScenarioError {
    /// Shorthand for [`ScenarioError::InvalidConfig`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Errors that abort a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// World state bookkeeping failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A scenario behavior failed.
    #[error("scenario error: {source}")]
    Scenario {
        /// The underlying scenario error.
        #[from]
        source: ScenarioError,
    },
}
