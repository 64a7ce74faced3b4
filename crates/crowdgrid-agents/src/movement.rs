//! Shared movement policy.
//!
//! Every mobile role follows the same pattern: build the candidate cells
//! (the neighborhood plus the current cell, minus cells holding an entity
//! the role treats as blocking), shuffle them, score each candidate with a
//! role-specific cost plus jitter and a stay penalty on the current cell,
//! and take the first minimum. Ties are broken only by the shuffle.

use crowdgrid_types::{Direction, EntityId, Position};
use crowdgrid_world::Connectivity;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::Entity;
use crate::error::AgentError;
use crate::state::WorldState;

/// Tunable terms added to every candidate cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Added to the cost of staying on the current cell.
    #[serde(default = "default_stay_penalty")]
    pub stay_penalty: f64,

    /// Upper bound of the uniform random term added to every candidate.
    #[serde(default)]
    pub jitter: f64,
}

const fn default_stay_penalty() -> f64 {
    1.0
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            stay_penalty: default_stay_penalty(),
            jitter: 0.0,
        }
    }
}

/// Result of one movement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The entity changed cell.
    Moved {
        /// Cell it left.
        from: Position,
        /// Cell it entered.
        to: Position,
        /// Offset of the step, the entity's new orientation.
        heading: Direction,
    },
    /// The best candidate was the current cell.
    Stayed,
    /// No candidate was available.
    Blocked,
}

impl StepOutcome {
    /// Whether the entity changed cell.
    pub const fn moved(self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Cells an entity at `from` may consider: `from` itself plus every
/// in-bounds neighbor that holds no entity matching `blocks`.
///
/// The current cell is always kept, since the entity itself stands there.
pub fn candidate_cells(
    world: &WorldState,
    from: Position,
    connectivity: Connectivity,
    mut blocks: impl FnMut(&Entity) -> bool,
) -> Vec<Position> {
    world
        .grid()
        .neighbors(from, connectivity, true)
        .into_iter()
        .filter(|&cell| cell == from || !world.cell_has(cell, &mut blocks))
        .collect()
}

/// Pick the cheapest candidate.
///
/// Candidates are shuffled first; each is scored as
/// `cost(cell) + jitter * U[0,1)` plus the stay penalty when it equals
/// `current`, and the first strict minimum wins. Returns `None` for an
/// empty candidate list.
pub fn choose_cell<R: Rng + ?Sized>(
    mut candidates: Vec<Position>,
    current: Position,
    config: &MovementConfig,
    rng: &mut R,
    mut cost: impl FnMut(Position) -> f64,
) -> Option<Position> {
    candidates.shuffle(rng);
    let mut best: Option<(Position, f64)> = None;
    for cell in candidates {
        let mut score = cost(cell);
        if config.jitter > 0.0 {
            score += config.jitter * rng.random::<f64>();
        }
        if cell == current {
            score += config.stay_penalty;
        }
        match best {
            Some((_, lowest)) if lowest <= score => {}
            _ => best = Some((cell, score)),
        }
    }
    best.map(|(cell, _)| cell)
}

/// Choose among `candidates` with [`choose_cell`] and, if the winner is a
/// different cell, move the entity there.
///
/// The caller updates role-specific state (orientation, counters, carried
/// flags) from the returned outcome.
///
/// # Errors
///
/// Returns [`AgentError`] if the entity is not on the grid.
pub fn step_to_cheapest<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    candidates: Vec<Position>,
    config: &MovementConfig,
    rng: &mut R,
    cost: impl FnMut(Position) -> f64,
) -> Result<StepOutcome, AgentError> {
    let from = world.require_position(id)?;
    let Some(to) = choose_cell(candidates, from, config, rng, cost) else {
        return Ok(StepOutcome::Blocked);
    };
    move_to(world, id, from, to)
}

/// Move an entity from `from` to `to` and describe the step.
///
/// # Errors
///
/// Returns [`AgentError`] if the grid rejects the move.
pub fn move_to(
    world: &mut WorldState,
    id: EntityId,
    from: Position,
    to: Position,
) -> Result<StepOutcome, AgentError> {
    if to == from {
        return Ok(StepOutcome::Stayed);
    }
    let heading = from.delta_to(to).unwrap_or(Direction::ZERO);
    world.relocate(id, to)?;
    trace!(entity = %id, from = %from, to = %to, "moved");
    Ok(StepOutcome::Moved { from, to, heading })
}

/// Per-tick activation draw: true with probability `speed`.
pub fn activates<R: Rng + ?Sized>(rng: &mut R, speed: f64) -> bool {
    rng.random::<f64>() < speed
}
