//! Pedestrian crowd behaviors: walkers and the portals that admit and
//! discharge them.
//!
//! A walker heads for the nearest removal portal (exit or gate) of the
//! opposite side. Entries and gates admit new walkers of their own side;
//! exits and gates discharge walkers of the other side and record their
//! counters.

use crowdgrid_types::{EntityId, PerSide, Position, Side, WalkerRecord};
use crowdgrid_world::{Connectivity, DistanceMetric, InfluenceField, InfluenceMask, distance};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::entity::{Entity, Walker};
use crate::error::AgentError;
use crate::movement::{self, MovementConfig, StepOutcome};
use crate::state::WorldState;

/// Walker activation probabilities, drawn uniformly at spawn.
pub const WALKER_SPEEDS: [f64; 11] = [
    0.40, 0.45, 0.50, 0.55, 0.60, 0.65, 0.70, 0.75, 0.80, 0.85, 0.90,
];

/// Rules shared by every walker and portal in a crowd scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdRules {
    /// Neighborhood walkers move in.
    pub connectivity: Connectivity,
    /// Metric for the distance to the nearest goal portal.
    pub goal_metric: DistanceMetric,
    /// Multiplier on the goal distance.
    pub goal_weight: f64,
    /// Stay penalty given to new walkers.
    pub impatience: f64,
    /// Upper bound of the random jitter added to every candidate.
    pub jitter: f64,
    /// Walkers treat entry portals as impassable.
    pub entries_block: bool,
    /// Multiplier on the crowd pressure at a candidate cell.
    pub pressure_weight: f64,
    /// Per-tick spawn probability of an entry or gate, per side.
    pub admission: PerSide<f64>,
}

/// Crowd pressure: the pressure kernel stamped at every walker's cell.
#[derive(Debug, Clone)]
pub struct PressureMap {
    field: InfluenceField,
    mask: InfluenceMask,
}

impl PressureMap {
    /// Empty pressure over a `width` x `height` board.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] for degenerate dimensions.
    pub fn new(width: i32, height: i32) -> Result<Self, AgentError> {
        Ok(Self {
            field: InfluenceField::new(width, height, 0)?,
            mask: InfluenceMask::pressure(),
        })
    }

    /// The underlying field.
    pub const fn field(&self) -> &InfluenceField {
        &self.field
    }

    /// Pressure at `pos`, zero off the board.
    pub fn at(&self, pos: Position) -> f64 {
        f64::from(self.field.value_at(pos).unwrap_or(0))
    }

    fn enter(&mut self, pos: Position) {
        self.field.apply(&self.mask, pos);
    }

    fn leave(&mut self, pos: Position) {
        self.field.withdraw(&self.mask, pos);
    }

    fn shift(&mut self, from: Position, to: Position) {
        self.field.relocate(&self.mask, from, to);
    }
}

/// Draw a walker speed from [`WALKER_SPEEDS`].
pub fn random_speed<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    WALKER_SPEEDS.choose(rng).copied().unwrap_or(0.65)
}

/// Whether a walker treats `entity` as impassable.
pub const fn walker_blocks(rules: &CrowdRules, entity: &Entity) -> bool {
    match entity {
        Entity::Wall | Entity::Walker(_) => true,
        Entity::Entry(_) => rules.entries_block,
        _ => false,
    }
}

/// One walker turn.
///
/// The walker ages every tick. With probability equal to its speed it is
/// activated and moves to the cheapest candidate, where the cost is the
/// weighted distance to the nearest goal portal of the opposite side plus
/// the step length plus weighted crowd pressure. `goals` maps each side to
/// the removal portals of that side.
///
/// # Errors
///
/// Returns [`AgentError`] if `id` is not a walker on the grid.
pub fn step_walker<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    rules: &CrowdRules,
    goals: &PerSide<Vec<Position>>,
    mut pressure: Option<&mut PressureMap>,
    rng: &mut R,
) -> Result<StepOutcome, AgentError> {
    let walker = world.walker_mut(id)?;
    walker.age = walker.age.saturating_add(1);
    if !movement::activates(rng, walker.speed) {
        return Ok(StepOutcome::Stayed);
    }
    walker.activations = walker.activations.saturating_add(1);
    let side = walker.side;
    let terms = MovementConfig {
        stay_penalty: walker.impatience,
        jitter: rules.jitter,
    };

    let from = world.require_position(id)?;
    let targets = goals.get(side.opponent());
    let candidates =
        movement::candidate_cells(world, from, rules.connectivity, |e| walker_blocks(rules, e));
    let reading = pressure.as_deref();
    let outcome = movement::step_to_cheapest(world, id, candidates, &terms, rng, |cell| {
        let to_goal = rules.goal_metric.nearest(cell, targets).unwrap_or(0.0);
        let crowding = reading.map_or(0.0, |p| p.at(cell));
        rules
            .goal_weight
            .mul_add(to_goal, distance::step_length(from, cell))
            + rules.pressure_weight * crowding
    })?;

    let walker = world.walker_mut(id)?;
    match outcome {
        StepOutcome::Moved { from, to, heading } => {
            walker.orientation = heading;
            walker.cant_move = 0;
            walker.distance += distance::step_length(from, to);
            if let Some(p) = pressure.as_deref_mut() {
                p.shift(from, to);
            }
        }
        StepOutcome::Stayed | StepOutcome::Blocked => {
            walker.cant_move = walker.cant_move.saturating_add(1);
        }
    }
    Ok(outcome)
}

/// One portal turn: exits discharge, entries admit, gates do both.
///
/// Returns the walker spawned this turn, if any.
///
/// # Errors
///
/// Returns [`AgentError`] if `id` is not a portal on the grid.
pub fn step_portal<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    rules: &CrowdRules,
    mut pressure: Option<&mut PressureMap>,
    records: &mut Vec<WalkerRecord>,
    rng: &mut R,
) -> Result<Option<EntityId>, AgentError> {
    let entity = world.entity(id).ok_or(AgentError::EntityNotFound(id))?;
    let (side, discharges, admits) = match entity {
        Entity::Entry(p) => (p.side, false, true),
        Entity::Exit(p) => (p.side, true, false),
        Entity::Gate(p) => (p.side, true, true),
        other => {
            return Err(AgentError::WrongKind {
                entity: id,
                expected: crowdgrid_types::EntityKind::Gate,
                found: other.kind(),
            });
        }
    };
    if discharges {
        discharge(world, id, side, pressure.as_deref_mut(), records)?;
    }
    if admits {
        return admit(world, id, side, rules, pressure, rng);
    }
    Ok(None)
}

/// Remove every walker of the other side standing on the portal and
/// append its counters to `records`. Returns how many were removed.
///
/// # Errors
///
/// Returns [`AgentError`] if the portal is not on the grid.
pub fn discharge(
    world: &mut WorldState,
    portal: EntityId,
    side: Side,
    mut pressure: Option<&mut PressureMap>,
    records: &mut Vec<WalkerRecord>,
) -> Result<usize, AgentError> {
    let pos = world.require_position(portal)?;
    let foreigners: Vec<EntityId> = world
        .occupants(pos)
        .filter(|(_, e)| matches!(e, Entity::Walker(w) if w.side != side))
        .map(|(id, _)| id)
        .collect();
    for &walker_id in &foreigners {
        let (entity, at) = world.despawn(walker_id)?;
        if let Entity::Walker(w) = entity {
            if let Some(p) = pressure.as_deref_mut() {
                p.leave(at);
            }
            debug!(walker = %walker_id, side = %w.side, age = w.age, "walker exited");
            records.push(WalkerRecord {
                side: w.side,
                speed: w.speed,
                age: w.age,
                distance: w.distance,
                activations: w.activations,
            });
        }
    }
    Ok(foreigners.len())
}

/// Spawn a walker of `side` on the portal with the side's admission
/// probability, unless a walker of that side already stands there.
///
/// # Errors
///
/// Returns [`AgentError`] if the portal is not on the grid.
pub fn admit<R: Rng + ?Sized>(
    world: &mut WorldState,
    portal: EntityId,
    side: Side,
    rules: &CrowdRules,
    pressure: Option<&mut PressureMap>,
    rng: &mut R,
) -> Result<Option<EntityId>, AgentError> {
    let pos = world.require_position(portal)?;
    let occupied = world.cell_has(pos, |e| matches!(e, Entity::Walker(w) if w.side == side));
    if occupied || rng.random::<f64>() >= *rules.admission.get(side) {
        return Ok(None);
    }
    let walker = Walker::new(side, random_speed(rng), rules.impatience);
    let id = world.spawn(Entity::Walker(walker), pos)?;
    if let Some(p) = pressure {
        p.enter(pos);
    }
    Ok(Some(id))
}
