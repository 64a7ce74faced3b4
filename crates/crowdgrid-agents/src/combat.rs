//! Flag-war players and projectiles.
//!
//! Attackers plan with A* over a cost landscape made of two influence
//! fields: player pressure and projectile threat. Defenders patrol the
//! ring around their flag and, when the flag is carried off, may fire
//! shots toward it. A shot flies one cell per tick, and a player it hits
//! is locked for a few ticks and drops any flag it carries one cell behind
//! itself.

use std::collections::BTreeMap;

use crowdgrid_types::{Direction, EntityId, PerSide, PlayerAction, Position, Side};
use crowdgrid_world::{Connectivity, InfluenceField, InfluenceMask, SearchSpace, distance, find_path};
use rand::Rng;
use tracing::{debug, trace};

use crate::entity::{Entity, FireShot, Player};
use crate::error::AgentError;
use crate::flag;
use crate::movement::{self, MovementConfig, StepOutcome};
use crate::patrol;
use crate::state::WorldState;
use crate::team::{self, TeamTables};

/// Tunables of the flag-war game.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatRules {
    /// Neighborhood players move in.
    pub connectivity: Connectivity,
    /// Stay penalty and jitter for greedy steps.
    pub movement: MovementConfig,
    /// Ticks a hit player stays incapacitated.
    pub lock_ticks: u32,
    /// Cells a shot travels before it expires.
    pub shot_lifetime: u32,
    /// Chance per turn that a defender fires at its carried-off flag.
    pub shoot_probability: f64,
    /// Cell each team's attackers plan their delivery toward.
    pub delivery_targets: PerSide<Position>,
}

// ---------------------------------------------------------------------------
// Threat fields
// ---------------------------------------------------------------------------

/// Player pressure and projectile threat over the board.
#[derive(Debug, Clone)]
pub struct ThreatFields {
    players: InfluenceField,
    shots: InfluenceField,
    player_mask: InfluenceMask,
    shot_masks: BTreeMap<Direction, InfluenceMask>,
}

impl ThreatFields {
    /// Both fields at `baseline` everywhere.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] for degenerate dimensions.
    pub fn new(width: i32, height: i32, baseline: i32) -> Result<Self, AgentError> {
        Ok(Self {
            players: InfluenceField::new(width, height, baseline)?,
            shots: InfluenceField::new(width, height, baseline)?,
            player_mask: InfluenceMask::pressure(),
            shot_masks: Direction::MOORE
                .iter()
                .map(|&d| (d, InfluenceMask::directional(d)))
                .collect(),
        })
    }

    /// Player pressure field.
    pub const fn players(&self) -> &InfluenceField {
        &self.players
    }

    /// Projectile threat field.
    pub const fn shots(&self) -> &InfluenceField {
        &self.shots
    }

    /// A* cost of entering `pos`: player pressure plus projectile threat.
    pub fn edge_cost(&self, pos: Position) -> f64 {
        let pressure = self.players.value_at(pos).unwrap_or(0);
        let threat = self.shots.value_at(pos).unwrap_or(0);
        f64::from(pressure.saturating_add(threat))
    }

    fn player_enter(&mut self, pos: Position) {
        self.players.apply(&self.player_mask, pos);
    }

    fn player_shift(&mut self, from: Position, to: Position) {
        self.players.relocate(&self.player_mask, from, to);
    }

    fn shot_enter(&mut self, heading: Direction, pos: Position) {
        let mask = self.shot_mask(heading);
        self.shots.apply(&mask, pos);
    }

    fn shot_leave(&mut self, heading: Direction, pos: Position) {
        let mask = self.shot_mask(heading);
        self.shots.withdraw(&mask, pos);
    }

    fn shot_shift(&mut self, heading: Direction, from: Position, to: Position) {
        let mask = self.shot_mask(heading);
        self.shots.relocate(&mask, from, to);
    }

    fn shot_mask(&self, heading: Direction) -> InfluenceMask {
        self.shot_masks
            .get(&heading)
            .cloned()
            .unwrap_or_else(|| InfluenceMask::directional(heading))
    }
}

// ---------------------------------------------------------------------------
// Search space
// ---------------------------------------------------------------------------

/// A* graph for one team: legal player steps, priced by the threat fields.
struct ThreatSpace<'a> {
    world: &'a WorldState,
    fields: &'a ThreatFields,
    side: Side,
    connectivity: Connectivity,
}

impl SearchSpace for ThreatSpace<'_> {
    fn successors(&self, cell: Position) -> Vec<Position> {
        let mut cells = combat_candidates(self.world, cell, self.side, self.connectivity);
        cells.retain(|&c| c != cell);
        cells
    }

    fn step_cost(&self, _from: Position, to: Position) -> f64 {
        self.fields.edge_cost(to)
    }
}

/// Cells a player of `side` at `pos` may step to: walls, players, shots,
/// and the own flag block.
pub fn combat_candidates(
    world: &WorldState,
    pos: Position,
    side: Side,
    connectivity: Connectivity,
) -> Vec<Position> {
    movement::candidate_cells(world, pos, connectivity, |e| match e {
        Entity::Wall | Entity::Player(_) | Entity::FireShot(_) => true,
        Entity::Flag(f) => f.side == side,
        _ => false,
    })
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Put a player on the board and stamp its pressure.
///
/// # Errors
///
/// Returns [`AgentError::World`] if `pos` is off the board.
pub fn enlist(
    world: &mut WorldState,
    fields: &mut ThreatFields,
    player: Player,
    pos: Position,
) -> Result<EntityId, AgentError> {
    let id = world.spawn(Entity::Player(player), pos)?;
    fields.player_enter(pos);
    Ok(id)
}

/// One player turn. Locked players count down instead of acting.
/// Returns whether the player acted.
///
/// # Errors
///
/// Returns [`AgentError`] if a team table names a stale entity.
pub fn step_player<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &CombatRules,
    fields: &mut ThreatFields,
    rng: &mut R,
) -> Result<bool, AgentError> {
    let player = world.player_mut(id)?;
    if player.lock_countdown > 0 {
        player.lock_countdown = player.lock_countdown.saturating_sub(1);
        return Ok(false);
    }
    if !movement::activates(rng, player.speed) {
        return Ok(false);
    }
    if player.action == PlayerAction::AttackFlag {
        attack(world, id, tables, rules, fields, rng)?;
    } else {
        defend(world, id, tables, rules, fields, rng)?;
    }
    Ok(true)
}

fn attack<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &CombatRules,
    fields: &mut ThreatFields,
    rng: &mut R,
) -> Result<(), AgentError> {
    let player = world.player_mut(id)?;
    let side = player.side;
    if player.carried_flag.is_some() {
        if player.flag_wait {
            player.flag_wait = false;
            return Ok(());
        }
        let target = *rules.delivery_targets.get(side);
        return follow_path(world, id, side, target, rules, fields);
    }

    let enemy_flag = *tables.flags.get(side.opponent());
    if let Some(carrier) = world.flag(enemy_flag)?.carrier
        && carrier != id
    {
        return escort(world, id, carrier, side, rules, fields, rng);
    }
    let target = world.require_position(enemy_flag)?;
    follow_path(world, id, side, target, rules, fields)?;
    flag::try_pick_up(world, id, enemy_flag)
}

/// Take the first step of a fresh A* path toward `target`.
fn follow_path(
    world: &mut WorldState,
    id: EntityId,
    side: Side,
    target: Position,
    rules: &CombatRules,
    fields: &mut ThreatFields,
) -> Result<(), AgentError> {
    let from = world.require_position(id)?;
    let path = {
        let space = ThreatSpace {
            world,
            fields,
            side,
            connectivity: rules.connectivity,
        };
        find_path(&space, from, target)
    };
    let outcome = match path.get(1) {
        Some(&next) => movement::move_to(world, id, from, next)?,
        None => StepOutcome::Blocked,
    };
    trace!(player = %id, target = %target, path_len = path.len(), "planned");
    settle(world, id, outcome, fields)
}

/// Close in on the teammate carrying the enemy flag.
fn escort<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    carrier: EntityId,
    side: Side,
    rules: &CombatRules,
    fields: &mut ThreatFields,
    rng: &mut R,
) -> Result<(), AgentError> {
    let target = world.require_position(carrier)?;
    greedy_step(world, id, side, &[target], rules, fields, rng)
}

fn defend<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &CombatRules,
    fields: &mut ThreatFields,
    rng: &mut R,
) -> Result<(), AgentError> {
    let side = world.player(id)?.side;
    let own_flag = *tables.flags.get(side);
    let flag_pos = world.require_position(own_flag)?;
    let pos = world.require_position(id)?;
    let carried = world.flag(own_flag)?.carrier.is_some();

    if carried && rng.random::<f64>() < rules.shoot_probability {
        shoot(world, id, flag_pos, rules, fields)?;
    } else if !carried && distance::chebyshev(pos, flag_pos) == 2 {
        patrol(world, id, flag_pos, fields)?;
    } else {
        let ring: Vec<Position> = patrol::ring_cells(flag_pos)
            .into_iter()
            .filter(|&c| world.grid().in_bounds(c))
            .collect();
        greedy_step(world, id, side, &ring, rules, fields, rng)?;
    }
    Ok(())
}

/// Step to the next ring cell if it holds nothing but delivery cells.
fn patrol(
    world: &mut WorldState,
    id: EntityId,
    center: Position,
    fields: &mut ThreatFields,
) -> Result<(), AgentError> {
    let pos = world.require_position(id)?;
    let Some(next) = patrol::next_patrol_cell(center, pos) else {
        return Ok(());
    };
    let clear = world.grid().in_bounds(next)
        && !world.cell_has(next, |e| !matches!(e, Entity::Delivery(_)));
    let outcome = if clear {
        movement::move_to(world, id, pos, next)?
    } else {
        StepOutcome::Blocked
    };
    settle(world, id, outcome, fields)
}

fn greedy_step<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    side: Side,
    targets: &[Position],
    rules: &CombatRules,
    fields: &mut ThreatFields,
    rng: &mut R,
) -> Result<(), AgentError> {
    let from = world.require_position(id)?;
    let candidates = combat_candidates(world, from, side, rules.connectivity);
    let outcome = movement::step_to_cheapest(world, id, candidates, &rules.movement, rng, |c| {
        targets
            .iter()
            .map(|&t| distance::manhattan(c, t))
            .min()
            .map_or(0.0, f64::from)
    })?;
    settle(world, id, outcome, fields)
}

fn settle(
    world: &mut WorldState,
    id: EntityId,
    outcome: StepOutcome,
    fields: &mut ThreatFields,
) -> Result<(), AgentError> {
    if let StepOutcome::Moved { from, to, .. } = outcome {
        fields.player_shift(from, to);
    }
    team::settle_step(world, id, outcome)
}

// ---------------------------------------------------------------------------
// Projectiles
// ---------------------------------------------------------------------------

/// What happened to a shot on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Advanced one cell.
    Flew,
    /// Hit a wall, a player, or the board edge.
    Crashed,
    /// Travelled past its lifetime and was removed.
    Expired,
    /// Was already crashed and has been removed.
    Removed,
}

/// Fire a shot from the player's cell toward `target`. The heading is the
/// compass direction closest to the target.
///
/// Returns the new shot, or `None` when the player stands on the target.
///
/// # Errors
///
/// Returns [`AgentError`] if the player is stale.
pub fn shoot(
    world: &mut WorldState,
    id: EntityId,
    target: Position,
    rules: &CombatRules,
    fields: &mut ThreatFields,
) -> Result<Option<EntityId>, AgentError> {
    let pos = world.require_position(id)?;
    let Some(heading) = pos.delta_to(target).and_then(Direction::closest_unit) else {
        return Ok(None);
    };
    let shot = FireShot {
        orientation: heading,
        travelled: 0,
        lifetime: rules.shot_lifetime,
        crashed: false,
    };
    let shot_id = world.spawn(Entity::FireShot(shot), pos)?;
    fields.shot_enter(heading, pos);
    world.player_mut(id)?.orientation = heading;
    debug!(player = %id, shot = %shot_id, heading = %heading, "shot fired");
    Ok(Some(shot_id))
}

/// One projectile turn.
///
/// # Errors
///
/// Returns [`AgentError`] if `id` is not a shot on the grid.
pub fn step_fire_shot(
    world: &mut WorldState,
    id: EntityId,
    rules: &CombatRules,
    fields: &mut ThreatFields,
) -> Result<ShotOutcome, AgentError> {
    let shot = *world.fire_shot(id)?;
    let pos = world.require_position(id)?;
    if shot.crashed {
        world.despawn(id)?;
        return Ok(ShotOutcome::Removed);
    }
    let heading = shot.orientation;
    let Some(next) = pos.offset(heading).filter(|&c| world.grid().in_bounds(c)) else {
        crash(world, id, heading, pos, fields)?;
        return Ok(ShotOutcome::Crashed);
    };

    world.relocate(id, next)?;
    fields.shot_shift(heading, pos, next);
    let travelled = shot.travelled.saturating_add(1);
    world.fire_shot_mut(id)?.travelled = travelled;

    let hit_wall = world.cell_has(next, Entity::is_wall);
    let victims: Vec<EntityId> = world
        .occupants(next)
        .filter(|(_, e)| matches!(e, Entity::Player(_)))
        .map(|(victim, _)| victim)
        .collect();
    if hit_wall || !victims.is_empty() {
        for victim in victims {
            hit(world, victim, rules)?;
        }
        crash(world, id, heading, next, fields)?;
        return Ok(ShotOutcome::Crashed);
    }
    if travelled > shot.lifetime {
        fields.shot_leave(heading, next);
        world.despawn(id)?;
        return Ok(ShotOutcome::Expired);
    }
    Ok(ShotOutcome::Flew)
}

fn crash(
    world: &mut WorldState,
    id: EntityId,
    heading: Direction,
    at: Position,
    fields: &mut ThreatFields,
) -> Result<(), AgentError> {
    fields.shot_leave(heading, at);
    world.fire_shot_mut(id)?.crashed = true;
    trace!(shot = %id, position = %at, "shot crashed");
    Ok(())
}

/// Lock a hit player and make it drop its flag one cell behind itself,
/// or on its own cell when that cell is off the board or a wall.
fn hit(world: &mut WorldState, victim: EntityId, rules: &CombatRules) -> Result<(), AgentError> {
    let player = world.player_mut(victim)?;
    player.lock_countdown = rules.lock_ticks;
    let behind = player.orientation.reversed();
    debug!(player = %victim, lock = rules.lock_ticks, "player hit");
    let Some(flag) = team::drop_flag(world, victim)? else {
        return Ok(());
    };
    let pos = world.require_position(victim)?;
    let landing = behind
        .and_then(|d| pos.offset(d))
        .filter(|&c| world.grid().in_bounds(c) && !world.cell_has(c, Entity::is_wall))
        .unwrap_or(pos);
    world.relocate(flag, landing)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::entity::Flag;

    fn rules() -> CombatRules {
        CombatRules {
            connectivity: Connectivity::Moore,
            movement: MovementConfig::default(),
            lock_ticks: 4,
            shot_lifetime: 100,
            shoot_probability: 0.3,
            delivery_targets: PerSide::new(Position::new(1, 5), Position::new(18, 5)),
        }
    }

    struct Arena {
        world: WorldState,
        fields: ThreatFields,
        tables: TeamTables,
    }

    fn arena(attacker_at: Position) -> Arena {
        let mut world = WorldState::new(20, 11).unwrap();
        let mut fields = ThreatFields::new(20, 11, 1).unwrap();
        let left_flag = world
            .spawn(
                Entity::Flag(Flag { side: Side::Left, home: Position::new(4, 5), carrier: None }),
                Position::new(4, 5),
            )
            .unwrap();
        let right_flag = world
            .spawn(
                Entity::Flag(Flag { side: Side::Right, home: Position::new(15, 5), carrier: None }),
                Position::new(15, 5),
            )
            .unwrap();
        let attacker = enlist(
            &mut world,
            &mut fields,
            Player::new(Side::Left, 1.0, PlayerAction::AttackFlag),
            attacker_at,
        )
        .unwrap();
        Arena {
            world,
            fields,
            tables: TeamTables {
                players: PerSide::new(vec![attacker], vec![]),
                jails: PerSide::default(),
                flags: PerSide::new(left_flag, right_flag),
                deliveries: PerSide::new(
                    (3..8).map(|y| Position::new(1, y)).collect(),
                    (3..8).map(|y| Position::new(18, y)).collect(),
                ),
            },
        }
    }

    #[test]
    fn baseline_edge_cost_is_positive() {
        let fields = ThreatFields::new(5, 5, 1).unwrap();
        assert!((fields.edge_cost(Position::new(2, 2)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn attacker_plans_toward_flag_and_captures_it() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut a = arena(Position::new(10, 5));
        let attacker = *a.tables.players.left.first().unwrap();
        let flag_id = a.tables.flags.right;
        let r = rules();

        step_player(&mut a.world, attacker, &a.tables, &r, &mut a.fields, &mut rng).unwrap();
        assert_eq!(a.world.position(attacker).map(|p| p.x), Some(11));

        for _ in 0..10 {
            step_player(&mut a.world, attacker, &a.tables, &r, &mut a.fields, &mut rng).unwrap();
        }
        assert_eq!(a.world.flag(flag_id).unwrap().carrier, Some(attacker));
        assert_eq!(a.world.position(flag_id), a.world.position(attacker));
        a.world.verify().unwrap();
    }

    #[test]
    fn shot_locks_player_and_drops_flag_behind_it() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut a = arena(Position::new(10, 5));
        let carrier = *a.tables.players.left.first().unwrap();
        let flag_id = a.tables.flags.right;
        a.world.relocate(flag_id, Position::new(10, 5)).unwrap();
        team::pick_up(&mut a.world, carrier, flag_id).unwrap();
        a.world.player_mut(carrier).unwrap().orientation = Direction::WEST;

        let shooter = enlist(
            &mut a.world,
            &mut a.fields,
            Player::new(Side::Right, 1.0, PlayerAction::DefendFlag),
            Position::new(13, 5),
        )
        .unwrap();
        let r = rules();
        let shot = shoot(&mut a.world, shooter, Position::new(10, 5), &r, &mut a.fields)
            .unwrap()
            .unwrap();
        assert_eq!(a.world.fire_shot(shot).unwrap().orientation, Direction::WEST);

        assert_eq!(step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap(), ShotOutcome::Flew);
        assert_eq!(step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap(), ShotOutcome::Flew);
        assert_eq!(
            step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap(),
            ShotOutcome::Crashed
        );
        let victim = a.world.player(carrier).unwrap();
        assert_eq!(victim.lock_countdown, 4);
        assert_eq!(victim.carried_flag, None);
        assert_eq!(a.world.position(flag_id), Some(Position::new(11, 5)));
        assert!(a.fields.shots().is_at_baseline());

        assert_eq!(
            step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap(),
            ShotOutcome::Removed
        );
        assert!(a.world.entity(shot).is_none());

        // Locked: four idle turns.
        for remaining in (0..4).rev() {
            assert!(!step_player(&mut a.world, carrier, &a.tables, &r, &mut a.fields, &mut rng).unwrap());
            assert_eq!(a.world.player(carrier).unwrap().lock_countdown, remaining);
        }
    }

    #[test]
    fn wall_hit_crashes_and_field_returns_to_baseline() {
        let mut a = arena(Position::new(10, 5));
        let shooter = *a.tables.players.left.first().unwrap();
        a.world.spawn(Entity::Wall, Position::new(10, 8)).unwrap();
        let r = rules();
        let shot = shoot(&mut a.world, shooter, Position::new(10, 9), &r, &mut a.fields)
            .unwrap()
            .unwrap();
        assert!(!a.fields.shots().is_at_baseline());
        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap());
        }
        assert_eq!(
            outcomes,
            vec![ShotOutcome::Flew, ShotOutcome::Flew, ShotOutcome::Crashed, ShotOutcome::Removed]
        );
        assert!(a.fields.shots().is_at_baseline());
        a.world.verify().unwrap();
    }

    #[test]
    fn expired_shot_withdraws_its_threat() {
        let mut a = arena(Position::new(2, 2));
        let shooter = *a.tables.players.left.first().unwrap();
        let mut r = rules();
        r.shot_lifetime = 3;
        let shot = shoot(&mut a.world, shooter, Position::new(12, 2), &r, &mut a.fields)
            .unwrap()
            .unwrap();
        let mut last = ShotOutcome::Flew;
        for _ in 0..4 {
            last = step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap();
        }
        assert_eq!(last, ShotOutcome::Expired);
        assert!(a.world.entity(shot).is_none());
        assert!(a.fields.shots().is_at_baseline());
    }

    #[test]
    fn shot_leaving_the_board_crashes() {
        let mut a = arena(Position::new(19, 5));
        let shooter = *a.tables.players.left.first().unwrap();
        let r = rules();
        let shot = shoot(&mut a.world, shooter, Position::new(25, 5), &r, &mut a.fields)
            .unwrap()
            .unwrap();
        assert_eq!(
            step_fire_shot(&mut a.world, shot, &r, &mut a.fields).unwrap(),
            ShotOutcome::Crashed
        );
        assert_eq!(a.world.position(shot), Some(Position::new(19, 5)));
    }

    #[test]
    fn player_pressure_follows_moves() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut a = arena(Position::new(10, 5));
        let attacker = *a.tables.players.left.first().unwrap();
        step_player(&mut a.world, attacker, &a.tables, &rules(), &mut a.fields, &mut rng).unwrap();
        let pos = a.world.position(attacker).unwrap();
        assert_eq!(a.fields.players().value_at(pos), Some(5));
        assert_eq!(a.fields.players().value_at(Position::new(8, 5)), Some(1));
    }
}
