//! Greedy capture-the-flag players.
//!
//! Each activation a free player re-evaluates its role from the team
//! state, in priority order: rescue a jailed teammate, defend the own
//! flag, arrest an adjacent opponent, or go for the opposing flag. All
//! movement is a one-step greedy choice with Manhattan costs.

use crowdgrid_types::{EntityId, PlayerAction, Position, Side};
use crowdgrid_world::{Connectivity, distance};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::entity::Entity;
use crate::error::AgentError;
use crate::movement::{self, MovementConfig, StepOutcome};
use crate::patrol;
use crate::state::WorldState;
use crate::team::{self, TeamTables};

/// Tunables of the greedy flag game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagRules {
    /// Neighborhood players move in.
    pub connectivity: Connectivity,
    /// Stay penalty and jitter.
    pub movement: MovementConfig,
    /// Defenders allowed at once.
    pub max_defenders: usize,
    /// A player defends only when more than this many teammates are
    /// farther from the own flag.
    pub defend_threshold: usize,
    /// Opponents closer than this Manhattan distance are arrested.
    pub engage_distance: u32,
}

impl Default for FlagRules {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::VonNeumann,
            movement: MovementConfig::default(),
            max_defenders: 3,
            defend_threshold: 3,
            engage_distance: 2,
        }
    }
}

/// One player turn. Returns the action taken, or `None` if the player is
/// jailed or was not activated.
///
/// # Errors
///
/// Returns [`AgentError`] if a team table names a stale entity.
pub fn step_player<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &FlagRules,
    rng: &mut R,
) -> Result<Option<PlayerAction>, AgentError> {
    let player = world.player(id)?;
    if player.arrested_in.is_some() || !movement::activates(rng, player.speed) {
        return Ok(None);
    }
    let side = player.side;
    let current = player.action;
    let pos = world.require_position(id)?;
    let flag_pos = world.require_position(*tables.flags.get(side))?;
    let my_distance = distance::chebyshev(pos, flag_pos);

    let mut rescuing = false;
    let mut defenders = 0usize;
    let mut farther = 0usize;
    for &ally in tables.players.get(side) {
        match world.player(ally)?.action {
            PlayerAction::Rescue => rescuing = true,
            PlayerAction::DefendFlag => defenders = defenders.saturating_add(1),
            _ => {}
        }
        if distance::chebyshev(world.require_position(ally)?, flag_pos) > my_distance {
            farther = farther.saturating_add(1);
        }
    }
    let jailed = jailed_allies(world, tables, side)?;

    let action = if !jailed.is_empty() && (!rescuing || current == PlayerAction::Rescue) {
        PlayerAction::Rescue
    } else if defenders < rules.max_defenders && farther > rules.defend_threshold {
        PlayerAction::DefendFlag
    } else if nearest_opponent(world, tables, side, pos)?.is_some_and(|d| d < rules.engage_distance) {
        PlayerAction::AttackEnemy
    } else {
        PlayerAction::AttackFlag
    };
    world.player_mut(id)?.action = action;

    match action {
        PlayerAction::Rescue => rescue_ally(world, id, &jailed, tables, rules, rng)?,
        PlayerAction::DefendFlag => defend_flag(world, id, tables, rules, rng)?,
        PlayerAction::AttackEnemy => attack_enemy(world, id, tables, rng)?,
        PlayerAction::AttackFlag => attack_flag(world, id, tables, rules, rng)?,
        PlayerAction::Idle => {}
    }
    Ok(Some(action))
}

// ---------------------------------------------------------------------------
// Candidate cells
// ---------------------------------------------------------------------------

/// Cells a player may step to.
///
/// Walls and other players block. Unless the own flag is carried away, a
/// player keeps out of the flag's immediate surroundings: a candidate must
/// be farther than `min(1, d - 1)` in Chebyshev distance, where `d` is the
/// player's current distance.
///
/// # Errors
///
/// Returns [`AgentError`] if the player or its flag is stale.
pub fn player_candidates(
    world: &WorldState,
    id: EntityId,
    tables: &TeamTables,
    connectivity: Connectivity,
) -> Result<Vec<Position>, AgentError> {
    let side = world.player(id)?.side;
    let pos = world.require_position(id)?;
    let flag_id = *tables.flags.get(side);
    let carried = world.flag(flag_id)?.carrier.is_some();
    let flag_pos = world.require_position(flag_id)?;
    let threshold = i64::from(distance::chebyshev(pos, flag_pos)).saturating_sub(1).min(1);

    let mut cells = movement::candidate_cells(world, pos, connectivity, |e| {
        matches!(e, Entity::Wall | Entity::Player(_))
    });
    if !carried {
        cells.retain(|&c| i64::from(distance::chebyshev(c, flag_pos)) > threshold);
    }
    Ok(cells)
}

fn step_toward<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &FlagRules,
    targets: &[Position],
    rng: &mut R,
) -> Result<StepOutcome, AgentError> {
    let candidates = player_candidates(world, id, tables, rules.connectivity)?;
    let outcome = movement::step_to_cheapest(world, id, candidates, &rules.movement, rng, |c| {
        targets
            .iter()
            .map(|&t| distance::manhattan(c, t))
            .min()
            .map_or(0.0, f64::from)
    })?;
    team::settle_step(world, id, outcome)?;
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Team queries
// ---------------------------------------------------------------------------

/// Teammates of `side` currently held in opposing jails, with their cells.
///
/// # Errors
///
/// Returns [`AgentError`] if a jail or prisoner handle is stale.
pub fn jailed_allies(
    world: &WorldState,
    tables: &TeamTables,
    side: Side,
) -> Result<Vec<(EntityId, Position)>, AgentError> {
    let mut out = Vec::new();
    for &jail in tables.jails.get(side.opponent()) {
        if let Some(prisoner) = world.jail(jail)?.prisoner {
            out.push((prisoner, world.require_position(prisoner)?));
        }
    }
    Ok(out)
}

fn nearest_opponent(
    world: &WorldState,
    tables: &TeamTables,
    side: Side,
    pos: Position,
) -> Result<Option<u32>, AgentError> {
    let mut nearest: Option<u32> = None;
    for &enemy in tables.players.get(side.opponent()) {
        let d = distance::manhattan(pos, world.require_position(enemy)?);
        nearest = Some(nearest.map_or(d, |n| n.min(d)));
    }
    Ok(nearest)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Go for the opposing flag: capture it, wait one turn, then deliver it.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn attack_flag<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &FlagRules,
    rng: &mut R,
) -> Result<(), AgentError> {
    let player = world.player_mut(id)?;
    if player.carried_flag.is_none() {
        return capture_flag(world, id, tables, rules, rng);
    }
    if player.flag_wait {
        player.flag_wait = false;
        return Ok(());
    }
    let side = player.side;
    step_toward(world, id, tables, rules, tables.deliveries.get(side), rng)?;
    Ok(())
}

/// Step toward the opposing flag and pick it up if it is unclaimed and
/// within one cell (Moore adjacency or the same cell).
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn capture_flag<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &FlagRules,
    rng: &mut R,
) -> Result<(), AgentError> {
    let side = world.player(id)?.side;
    let enemy_flag = *tables.flags.get(side.opponent());
    let target = world.require_position(enemy_flag)?;
    step_toward(world, id, tables, rules, &[target], rng)?;
    try_pick_up(world, id, enemy_flag)
}

/// Pick up `flag` if it is unclaimed and within one cell of the player.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn try_pick_up(world: &mut WorldState, id: EntityId, flag: EntityId) -> Result<(), AgentError> {
    let pos = world.require_position(id)?;
    let flag_pos = world.require_position(flag)?;
    if world.flag(flag)?.carrier.is_none() && distance::chebyshev(pos, flag_pos) <= 1 {
        team::pick_up(world, id, flag)?;
    }
    Ok(())
}

/// Guard the own flag: chase it if carried, patrol the ring when on it,
/// otherwise return to the ring.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn defend_flag<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rules: &FlagRules,
    rng: &mut R,
) -> Result<(), AgentError> {
    let side = world.player(id)?.side;
    let flag_id = *tables.flags.get(side);
    let flag_pos = world.require_position(flag_id)?;
    let pos = world.require_position(id)?;
    if world.flag(flag_id)?.carrier.is_some() {
        team::drop_flag(world, id)?;
        step_toward(world, id, tables, rules, &[flag_pos], rng)?;
    } else if distance::chebyshev(pos, flag_pos) == 2 {
        patrol(world, id, flag_pos)?;
    } else {
        let ring: Vec<Position> = patrol::ring_cells(flag_pos)
            .into_iter()
            .filter(|&c| world.grid().in_bounds(c))
            .collect();
        step_toward(world, id, tables, rules, &ring, rng)?;
    }
    Ok(())
}

/// Step to the next ring cell around `center` if it is empty.
///
/// # Errors
///
/// Returns [`AgentError`] if the player is stale.
pub fn patrol(world: &mut WorldState, id: EntityId, center: Position) -> Result<(), AgentError> {
    let pos = world.require_position(id)?;
    let Some(next) = patrol::next_patrol_cell(center, pos) else {
        return Ok(());
    };
    let outcome = if world.grid().in_bounds(next) && world.grid().is_empty_cell(next) {
        movement::move_to(world, id, pos, next)?
    } else {
        StepOutcome::Blocked
    };
    team::settle_step(world, id, outcome)
}

/// Arrest a random adjacent, free opponent into a random empty own jail.
/// The opponent drops any flag it carries.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn attack_enemy<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    tables: &TeamTables,
    rng: &mut R,
) -> Result<(), AgentError> {
    let side = world.player(id)?.side;
    let pos = world.require_position(id)?;
    let mut enemies = Vec::new();
    for cell in world.grid().neighbors(pos, Connectivity::Moore, false) {
        for (other, entity) in world.occupants(cell) {
            if let Entity::Player(p) = entity
                && p.side != side
                && p.arrested_in.is_none()
            {
                enemies.push(other);
            }
        }
    }
    let Some(&target) = enemies.choose(rng) else {
        return Ok(());
    };
    let mut free_jails = Vec::new();
    for &jail in tables.jails.get(side) {
        let cell = world.require_position(jail)?;
        let occupied = world.cell_has(cell, |e| matches!(e, Entity::Player(_)));
        if world.jail(jail)?.prisoner.is_none() && !occupied {
            free_jails.push(jail);
        }
    }
    let Some(&jail) = free_jails.choose(rng) else {
        return Ok(());
    };
    arrest(world, target, jail)
}

/// Move `target` into `jail` and mark it arrested.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn arrest(world: &mut WorldState, target: EntityId, jail: EntityId) -> Result<(), AgentError> {
    team::drop_flag(world, target)?;
    let cell = world.require_position(jail)?;
    world.relocate(target, cell)?;
    world.jail_mut(jail)?.prisoner = Some(target);
    let prisoner = world.player_mut(target)?;
    prisoner.arrested_in = Some(jail);
    prisoner.action = PlayerAction::Idle;
    debug!(player = %target, jail = %jail, "player arrested");
    Ok(())
}

/// Walk toward the nearest jailed teammate and free every jailed teammate
/// within one cell afterwards. Drops any carried flag first.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn rescue_ally<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: EntityId,
    jailed: &[(EntityId, Position)],
    tables: &TeamTables,
    rules: &FlagRules,
    rng: &mut R,
) -> Result<(), AgentError> {
    team::drop_flag(world, id)?;
    let targets: Vec<Position> = jailed.iter().map(|&(_, p)| p).collect();
    step_toward(world, id, tables, rules, &targets, rng)?;
    let pos = world.require_position(id)?;
    for &(prisoner, cell) in jailed {
        if distance::chebyshev(pos, cell) <= 1 {
            release(world, prisoner)?;
        }
    }
    Ok(())
}

/// Free a jailed player where it stands.
///
/// # Errors
///
/// Returns [`AgentError`] if a handle is stale.
pub fn release(world: &mut WorldState, prisoner: EntityId) -> Result<(), AgentError> {
    let player = world.player_mut(prisoner)?;
    let Some(jail) = player.arrested_in.take() else {
        return Ok(());
    };
    world.jail_mut(jail)?.prisoner = None;
    debug!(player = %prisoner, jail = %jail, "player freed");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::entity::{Flag, Jail, Player};
    use crowdgrid_types::PerSide;

    struct Board {
        world: WorldState,
        tables: TeamTables,
    }

    fn flag(world: &mut WorldState, side: Side, at: Position) -> EntityId {
        world
            .spawn(
                Entity::Flag(Flag {
                    side,
                    home: at,
                    carrier: None,
                }),
                at,
            )
            .unwrap()
    }

    fn player(world: &mut WorldState, side: Side, at: Position) -> EntityId {
        world
            .spawn(Entity::Player(Player::new(side, 1.0, PlayerAction::Idle)), at)
            .unwrap()
    }

    /// 20x11 board, left flag at (3, 5), right flag at (16, 5), one jail
    /// per team, delivery column at x = 1 and x = 18.
    fn board(left: &[Position], right: &[Position]) -> Board {
        let mut world = WorldState::new(20, 11).unwrap();
        let flags = PerSide::new(
            flag(&mut world, Side::Left, Position::new(3, 5)),
            flag(&mut world, Side::Right, Position::new(16, 5)),
        );
        let jails = PerSide::new(
            vec![world
                .spawn(Entity::Jail(Jail { side: Side::Left, prisoner: None }), Position::new(9, 0))
                .unwrap()],
            vec![world
                .spawn(Entity::Jail(Jail { side: Side::Right, prisoner: None }), Position::new(9, 10))
                .unwrap()],
        );
        let players = PerSide::new(
            left.iter().map(|&p| player(&mut world, Side::Left, p)).collect(),
            right.iter().map(|&p| player(&mut world, Side::Right, p)).collect(),
        );
        let deliveries = PerSide::new(
            (3..8).map(|y| Position::new(1, y)).collect(),
            (3..8).map(|y| Position::new(18, y)).collect(),
        );
        Board {
            world,
            tables: TeamTables {
                players,
                jails,
                flags,
                deliveries,
            },
        }
    }

    #[test]
    fn adjacent_attacker_captures_and_carries_flag() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut b = board(&[Position::new(15, 5)], &[]);
        let attacker = *b.tables.players.left.first().unwrap();
        let enemy_flag = b.tables.flags.right;
        let rules = FlagRules::default();

        let action = step_player(&mut b.world, attacker, &b.tables, &rules, &mut rng).unwrap();
        assert_eq!(action, Some(PlayerAction::AttackFlag));
        assert_eq!(b.world.flag(enemy_flag).unwrap().carrier, Some(attacker));
        assert!(b.world.player(attacker).unwrap().flag_wait);

        // Grace turn: no move.
        let before = b.world.position(attacker);
        step_player(&mut b.world, attacker, &b.tables, &rules, &mut rng).unwrap();
        assert_eq!(b.world.position(attacker), before);

        for _ in 0..60 {
            step_player(&mut b.world, attacker, &b.tables, &rules, &mut rng).unwrap();
            if b.world.flag(enemy_flag).unwrap().carrier.is_some() {
                assert_eq!(b.world.position(enemy_flag), b.world.position(attacker));
            }
        }
        assert_eq!(b.world.position(attacker).map(|p| p.x), Some(1));
        b.world.verify().unwrap();
    }

    #[test]
    fn players_keep_clear_of_own_flag() {
        let b = board(&[Position::new(5, 5)], &[]);
        let me = *b.tables.players.left.first().unwrap();
        let cells = player_candidates(&b.world, me, &b.tables, Connectivity::VonNeumann).unwrap();
        assert!(!cells.contains(&Position::new(4, 5)));
        assert!(cells.contains(&Position::new(5, 5)));
        assert!(cells.contains(&Position::new(6, 5)));
    }

    #[test]
    fn adjacent_opponent_is_arrested_and_drops_flag() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut b = board(&[Position::new(10, 5)], &[Position::new(11, 5)]);
        let cop = *b.tables.players.left.first().unwrap();
        let thief = *b.tables.players.right.first().unwrap();
        let jail = *b.tables.jails.left.first().unwrap();

        attack_enemy(&mut b.world, cop, &b.tables, &mut rng).unwrap();
        let prisoner = b.world.player(thief).unwrap();
        assert_eq!(prisoner.arrested_in, Some(jail));
        assert_eq!(b.world.position(thief), Some(Position::new(9, 0)));
        assert_eq!(b.world.jail(jail).unwrap().prisoner, Some(thief));
        assert_eq!(jailed_allies(&b.world, &b.tables, Side::Right).unwrap().len(), 1);

        // Jailed players do nothing.
        assert_eq!(
            step_player(&mut b.world, thief, &b.tables, &FlagRules::default(), &mut rng).unwrap(),
            None
        );
    }

    #[test]
    fn rescuer_frees_adjacent_prisoner() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut b = board(&[], &[Position::new(12, 2), Position::new(10, 1)]);
        let prisoner = *b.tables.players.right.first().unwrap();
        let rescuer = *b.tables.players.right.last().unwrap();
        let jail = *b.tables.jails.left.first().unwrap();
        arrest(&mut b.world, prisoner, jail).unwrap();

        let rules = FlagRules::default();
        let action = step_player(&mut b.world, rescuer, &b.tables, &rules, &mut rng).unwrap();
        assert_eq!(action, Some(PlayerAction::Rescue));
        assert_eq!(b.world.player(prisoner).unwrap().arrested_in, None);
        assert_eq!(b.world.jail(jail).unwrap().prisoner, None);
    }

    #[test]
    fn patrol_wraps_from_last_ring_index() {
        let mut b = board(&[Position::new(4, 7)], &[]);
        let defender = *b.tables.players.left.first().unwrap();
        // (4, 7) is offset (1, 2) from the flag: ring index 15.
        patrol(&mut b.world, defender, Position::new(3, 5)).unwrap();
        assert_eq!(b.world.position(defender), Some(Position::new(5, 7)));
        assert_eq!(b.world.player(defender).unwrap().orientation, crowdgrid_types::Direction::EAST);
    }

    #[test]
    fn patrol_waits_when_next_cell_is_taken() {
        let mut b = board(&[Position::new(4, 7), Position::new(5, 7)], &[]);
        let defender = *b.tables.players.left.first().unwrap();
        patrol(&mut b.world, defender, Position::new(3, 5)).unwrap();
        assert_eq!(b.world.position(defender), Some(Position::new(4, 7)));
        assert_eq!(b.world.player(defender).unwrap().cant_move, 1);
    }
}
