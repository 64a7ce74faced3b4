//! Team lookup tables and flag handling shared by both flag games.

use crowdgrid_types::{EntityId, PerSide, Position, Scoreboard, record_delivery};
use tracing::debug;

use crate::error::AgentError;
use crate::movement::StepOutcome;
use crate::state::WorldState;

/// Read-only team rosters built once when a flag scenario is set up.
#[derive(Debug, Clone)]
pub struct TeamTables {
    /// Players of each team.
    pub players: PerSide<Vec<EntityId>>,
    /// Jails each team fills with arrested opponents.
    pub jails: PerSide<Vec<EntityId>>,
    /// Each team's flag.
    pub flags: PerSide<EntityId>,
    /// Cells where each team delivers the opposing flag.
    pub deliveries: PerSide<Vec<Position>>,
}

/// Record a player's step: update its heading and blocked counter, and
/// carry its flag along when it moved.
///
/// # Errors
///
/// Returns [`AgentError`] if the player or its flag cannot be updated.
pub fn settle_step(world: &mut WorldState, id: EntityId, outcome: StepOutcome) -> Result<(), AgentError> {
    let player = world.player_mut(id)?;
    match outcome {
        StepOutcome::Moved { to, heading, .. } => {
            player.orientation = heading;
            player.cant_move = 0;
            if let Some(flag) = player.carried_flag {
                world.relocate(flag, to)?;
            }
        }
        StepOutcome::Stayed | StepOutcome::Blocked => {
            player.cant_move = player.cant_move.saturating_add(1);
        }
    }
    Ok(())
}

/// Make `carrier` pick up `flag`. The flag moves onto the carrier's cell.
///
/// # Errors
///
/// Returns [`AgentError`] if either handle is stale or of the wrong kind.
pub fn pick_up(world: &mut WorldState, carrier: EntityId, flag: EntityId) -> Result<(), AgentError> {
    let at = world.require_position(carrier)?;
    world.flag_mut(flag)?.carrier = Some(carrier);
    world.relocate(flag, at)?;
    let player = world.player_mut(carrier)?;
    player.carried_flag = Some(flag);
    player.flag_wait = true;
    debug!(player = %carrier, flag = %flag, "flag captured");
    Ok(())
}

/// Release whatever flag `carrier` holds. The flag stays on its cell.
/// Returns the dropped flag.
///
/// # Errors
///
/// Returns [`AgentError`] if the handles are stale.
pub fn drop_flag(world: &mut WorldState, carrier: EntityId) -> Result<Option<EntityId>, AgentError> {
    let player = world.player_mut(carrier)?;
    let Some(flag) = player.carried_flag.take() else {
        return Ok(None);
    };
    player.flag_wait = false;
    world.flag_mut(flag)?.carrier = None;
    debug!(player = %carrier, flag = %flag, "flag dropped");
    Ok(Some(flag))
}

/// One flag turn: a carried flag standing on a delivery cell of the
/// capturing team scores, is released, and respawns at home.
///
/// Returns whether a delivery was scored.
///
/// # Errors
///
/// Returns [`AgentError`] if `id` is not a flag on the grid.
pub fn step_flag(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    scoreboard: &mut Scoreboard,
) -> Result<bool, AgentError> {
    let flag = *world.flag(id)?;
    let Some(carrier) = flag.carrier else {
        return Ok(false);
    };
    let pos = world.require_position(id)?;
    let capturer = flag.side.opponent();
    if !tables.deliveries.get(capturer).contains(&pos) {
        return Ok(false);
    }
    drop_flag(world, carrier)?;
    world.relocate(id, flag.home)?;
    record_delivery(scoreboard, capturer);
    debug!(flag = %id, team = %capturer, score = *scoreboard.get(capturer), "flag delivered");
    Ok(true)
}
