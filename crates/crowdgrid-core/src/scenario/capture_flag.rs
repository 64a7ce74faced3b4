//! Greedy capture the flag with jails and rescues.

use rand::rngs::StdRng;
use tracing::info;

use crowdgrid_agents::entity::{Delivery, Flag, Jail, Player};
use crowdgrid_agents::flag::{self, FlagRules};
use crowdgrid_agents::{Entity, TeamTables, WorldState, team};
use crowdgrid_types::{
    EntityId, EntityKind, PerSide, PlayerAction, Position, Scoreboard, Side, WalkerRecord,
};
use crowdgrid_world::Connectivity;

use super::Scenario;
use super::layout::{self, Layout};
use crate::config::CaptureFlagConfig;
use crate::error::ScenarioError;

/// Column of each team's flag, counted from its own edge.
pub(crate) const FLAG_INSET: i32 = 4;

/// Column of each team's starting line, counted from its own edge.
pub(crate) const ROSTER_INSET: i32 = 6;

/// The greedy capture-the-flag scenario.
#[derive(Debug, Clone)]
pub struct CaptureFlagScenario {
    rules: FlagRules,
    tables: TeamTables,
    scoreboard: Scoreboard,
}

impl CaptureFlagScenario {
    /// Validate `config` and lay out jails, delivery columns, flags,
    /// players, and border walls.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] for out-of-range parameters or placements
    /// that leave the board or collide.
    pub fn build(config: &CaptureFlagConfig) -> Result<(WorldState, Self), ScenarioError> {
        layout::check_speed("player speed", config.speed)?;
        layout::check_non_negative("stay penalty", config.movement.stay_penalty)?;
        layout::check_non_negative("jitter", config.movement.jitter)?;
        if config.players == 0 || config.jails == 0 || config.delivery_size == 0 {
            return Err(ScenarioError::invalid(
                "players, jails, and delivery size must all be positive",
            ));
        }
        let roster = layout::coord("roster size", config.players)?;
        let jails = layout::coord("jail count", config.jails)?;
        let delivery = layout::coord("delivery size", config.delivery_size)?;

        let (width, height) = (config.width, config.height);
        let mut plan = Layout::new(width, height)?;
        let mut world = WorldState::new(width, height)?;
        let mid_y = height / 2;
        let right = width.saturating_sub(1);

        // Jails sit in the top and bottom walls, centered.
        let jail_row = PerSide::new(0, height.saturating_sub(1));
        let first_jail = (width / 2).saturating_sub(jails / 2);
        let mut jail_ids: PerSide<Vec<EntityId>> = PerSide::default();
        for side in Side::ALL {
            for i in 0..jails {
                let cell = Position::new(first_jail.saturating_add(i), *jail_row.get(side));
                let pos = plan.claim("jail", cell)?;
                let id = world.spawn(Entity::Jail(Jail { side, prisoner: None }), pos)?;
                jail_ids.get_mut(side).push(id);
            }
        }

        let delivery_x = PerSide::new(1, right.saturating_sub(1));
        let deliveries = delivery_column(&mut plan, &mut world, delivery_x, mid_y, delivery, 0)?;

        let flag_x = PerSide::new(FLAG_INSET, right.saturating_sub(FLAG_INSET));
        let flags = place_flags(&mut plan, &mut world, flag_x, mid_y)?;

        let line_x = PerSide::new(ROSTER_INSET, right.saturating_sub(ROSTER_INSET));
        let top = mid_y.saturating_add(delivery / 2).saturating_add(roster / 2);
        let mut players: PerSide<Vec<EntityId>> = PerSide::default();
        for side in Side::ALL {
            for i in 0..roster {
                let y = top.saturating_sub(i.saturating_mul(2));
                let pos = plan.claim("player", Position::new(*line_x.get(side), y))?;
                let player = Player::new(side, config.speed, PlayerAction::Idle);
                players.get_mut(side).push(world.spawn(Entity::Player(player), pos)?);
            }
        }
        let walls = plan.build_walls(&mut world)?;

        info!(
            width,
            height,
            players = config.players,
            jails = config.jails,
            walls,
            "Capture-the-flag board built"
        );

        let rules = FlagRules {
            connectivity: Connectivity::VonNeumann,
            movement: config.movement,
            max_defenders: config.max_defenders,
            ..FlagRules::default()
        };
        let tables = TeamTables {
            players,
            jails: jail_ids,
            flags,
            deliveries,
        };
        Ok((
            world,
            Self {
                rules,
                tables,
                scoreboard: Scoreboard::default(),
            },
        ))
    }

    /// Team lookup tables.
    pub const fn tables(&self) -> &TeamTables {
        &self.tables
    }

    /// Player rules in effect.
    pub const fn rules(&self) -> &FlagRules {
        &self.rules
    }
}

impl Scenario for CaptureFlagScenario {
    fn name(&self) -> &'static str {
        "capture_flag"
    }

    fn activate(
        &mut self,
        world: &mut WorldState,
        id: EntityId,
        rng: &mut StdRng,
    ) -> Result<(), ScenarioError> {
        match world.entity(id).map(Entity::kind) {
            Some(EntityKind::Player) => {
                flag::step_player(world, id, &self.tables, &self.rules, rng)?;
            }
            Some(EntityKind::Flag) => {
                team::step_flag(world, id, &self.tables, &mut self.scoreboard)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn walker_records(&self) -> &[WalkerRecord] {
        &[]
    }

    fn scoreboard(&self) -> Option<Scoreboard> {
        Some(self.scoreboard)
    }
}

/// Place a vertical delivery column per team, centered on `mid_y`, and
/// return the cells. `trim` drops that many cells from each end.
pub(crate) fn delivery_column(
    plan: &mut Layout,
    world: &mut WorldState,
    column_x: PerSide<i32>,
    mid_y: i32,
    size: i32,
    trim: i32,
) -> Result<PerSide<Vec<Position>>, ScenarioError> {
    let top = mid_y.saturating_add(size / 2);
    let mut cells: PerSide<Vec<Position>> = PerSide::default();
    for side in Side::ALL {
        for i in trim..size.saturating_sub(trim) {
            let cell = Position::new(*column_x.get(side), top.saturating_sub(i));
            let pos = plan.claim("delivery", cell)?;
            world.spawn(Entity::Delivery(Delivery { side }), pos)?;
            cells.get_mut(side).push(pos);
        }
    }
    Ok(cells)
}

/// Place both flags at their homes on row `mid_y`.
pub(crate) fn place_flags(
    plan: &mut Layout,
    world: &mut WorldState,
    flag_x: PerSide<i32>,
    mid_y: i32,
) -> Result<PerSide<EntityId>, ScenarioError> {
    let mut place = |side: Side| -> Result<EntityId, ScenarioError> {
        let home = plan.claim("flag", Position::new(*flag_x.get(side), mid_y))?;
        let flag = Flag {
            side,
            home,
            carrier: None,
        };
        Ok(world.spawn(Entity::Flag(flag), home)?)
    };
    let left = place(Side::Left)?;
    let right = place(Side::Right)?;
    Ok(PerSide::new(left, right))
}
