//! Flag war: A* attackers, patrolling defenders, and projectiles.

use rand::rngs::StdRng;
use tracing::info;

use crowdgrid_agents::combat::{self, CombatRules, ThreatFields};
use crowdgrid_agents::entity::Player;
use crowdgrid_agents::{Entity, TeamTables, WorldState, team};
use crowdgrid_types::{
    EntityId, EntityKind, PerSide, PlayerAction, Position, Scoreboard, Side, WalkerRecord,
};

use super::Scenario;
use super::capture_flag::{FLAG_INSET, ROSTER_INSET, delivery_column, place_flags};
use super::layout::{self, Layout};
use crate::config::FlagWarConfig;
use crate::error::ScenarioError;

/// The flag-war scenario.
#[derive(Debug, Clone)]
pub struct FlagWarScenario {
    rules: CombatRules,
    tables: TeamTables,
    fields: ThreatFields,
    scoreboard: Scoreboard,
}

impl FlagWarScenario {
    /// Validate `config` and lay out delivery zones, flags, both rosters,
    /// and border walls. Each team's first `attackers` players attack.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] for out-of-range parameters or placements
    /// that leave the board or collide.
    pub fn build(config: &FlagWarConfig) -> Result<(WorldState, Self), ScenarioError> {
        layout::check_speed("player speed", config.speed)?;
        layout::check_probability("shoot probability", config.shoot_probability)?;
        layout::check_non_negative("stay penalty", config.movement.stay_penalty)?;
        layout::check_non_negative("jitter", config.movement.jitter)?;
        if config.players == 0 || config.delivery_size == 0 {
            return Err(ScenarioError::invalid("players and delivery size must be positive"));
        }
        for side in Side::ALL {
            if *config.attackers.get(side) > config.players {
                return Err(ScenarioError::invalid(format!(
                    "{side} attackers exceed the roster of {}",
                    config.players
                )));
            }
        }
        if config.field_baseline < 1 {
            return Err(ScenarioError::invalid("field baseline must be at least 1"));
        }
        let roster = layout::coord("roster size", config.players)?;
        let delivery = layout::coord("delivery size", config.delivery_size)?;

        let (width, height) = (config.width, config.height);
        let mut plan = Layout::new(width, height)?;
        let mut world = WorldState::new(width, height)?;
        let mut fields = ThreatFields::new(width, height, config.field_baseline)?;
        let mid_y = height / 2;
        let right = width.saturating_sub(1);

        // Full outer column plus a shorter inner one.
        let outer_x = PerSide::new(1, right.saturating_sub(1));
        let inner_x = PerSide::new(2, right.saturating_sub(2));
        let mut deliveries = delivery_column(&mut plan, &mut world, outer_x, mid_y, delivery, 0)?;
        let inner = delivery_column(&mut plan, &mut world, inner_x, mid_y, delivery, 1)?;
        for side in Side::ALL {
            deliveries.get_mut(side).extend_from_slice(inner.get(side));
        }

        let flags = place_flags(
            &mut plan,
            &mut world,
            PerSide::new(FLAG_INSET, right.saturating_sub(FLAG_INSET)),
            mid_y,
        )?;

        let line_x = PerSide::new(ROSTER_INSET, right.saturating_sub(ROSTER_INSET));
        let half = roster / 2;
        let mut players: PerSide<Vec<EntityId>> = PerSide::default();
        for side in Side::ALL {
            let attackers = *config.attackers.get(side);
            for (slot, i) in (0..roster).enumerate() {
                let offset = i.saturating_sub(half).saturating_mul(2).saturating_add(1);
                let cell = Position::new(*line_x.get(side), mid_y.saturating_add(offset));
                let pos = plan.claim("player", cell)?;
                let action = if slot < attackers {
                    PlayerAction::AttackFlag
                } else {
                    PlayerAction::DefendFlag
                };
                let player = Player::new(side, config.speed, action);
                players.get_mut(side).push(combat::enlist(&mut world, &mut fields, player, pos)?);
            }
        }
        let walls = plan.build_walls(&mut world)?;

        info!(
            width,
            height,
            players = config.players,
            attackers_left = config.attackers.left,
            attackers_right = config.attackers.right,
            walls,
            "Flag-war board built"
        );

        let rules = CombatRules {
            connectivity: config.connectivity,
            movement: config.movement,
            lock_ticks: config.lock_ticks,
            shot_lifetime: config.shot_lifetime,
            shoot_probability: config.shoot_probability,
            delivery_targets: PerSide::new(
                Position::new(*outer_x.get(Side::Left), mid_y),
                Position::new(*outer_x.get(Side::Right), mid_y),
            ),
        };
        let tables = TeamTables {
            players,
            jails: PerSide::default(),
            flags,
            deliveries,
        };
        Ok((
            world,
            Self {
                rules,
                tables,
                fields,
                scoreboard: Scoreboard::default(),
            },
        ))
    }

    /// Team lookup tables.
    pub const fn tables(&self) -> &TeamTables {
        &self.tables
    }

    /// Combat rules in effect.
    pub const fn rules(&self) -> &CombatRules {
        &self.rules
    }

    /// Player pressure and projectile threat.
    pub const fn fields(&self) -> &ThreatFields {
        &self.fields
    }
}

impl Scenario for FlagWarScenario {
    fn name(&self) -> &'static str {
        "flag_war"
    }

    fn activate(
        &mut self,
        world: &mut WorldState,
        id: EntityId,
        rng: &mut StdRng,
    ) -> Result<(), ScenarioError> {
        match world.entity(id).map(Entity::kind) {
            Some(EntityKind::Player) => {
                combat::step_player(world, id, &self.tables, &self.rules, &mut self.fields, rng)?;
            }
            Some(EntityKind::FireShot) => {
                combat::step_fire_shot(world, id, &self.rules, &mut self.fields)?;
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_board_layout() {
        let (world, scenario) = FlagWarScenario::build(&FlagWarConfig::default()).unwrap();
        let snapshot = world.snapshot();
        assert_eq!(snapshot.count_kind(EntityKind::Player), 16);
        assert_eq!(snapshot.count_kind(EntityKind::Delivery), 16);
        assert_eq!(snapshot.count_kind(EntityKind::Jail), 0);
        assert_eq!(snapshot.count_kind(EntityKind::Wall), 2 * 40 + 2 * 25);

        let tables = scenario.tables();
        assert_eq!(tables.deliveries.left.len(), 8);
        assert!(tables.deliveries.right.iter().all(|p| p.x == 38 || p.x == 37));
        assert_eq!(scenario.rules().delivery_targets.left, Position::new(1, 13));

        let ys: Vec<i32> = tables
            .players
            .left
            .iter()
            .filter_map(|&id| world.position(id))
            .map(|p| p.y)
            .collect();
        assert_eq!(ys, vec![6, 8, 10, 12, 14, 16, 18, 20]);
        world.verify().unwrap();
    }

    #[test]
    fn first_players_attack_and_rest_defend() {
        let config = FlagWarConfig {
            attackers: PerSide::new(3, 0),
            ..FlagWarConfig::default()
        };
        let (world, scenario) = FlagWarScenario::build(&config).unwrap();
        let actions = |side: Side| -> Vec<PlayerAction> {
            scenario
                .tables()
                .players
                .get(side)
                .iter()
                .map(|&id| world.player(id).unwrap().action)
                .collect()
        };
        let left = actions(Side::Left);
        assert_eq!(left.iter().filter(|&&a| a == PlayerAction::AttackFlag).count(), 3);
        assert!(actions(Side::Right).iter().all(|&a| a == PlayerAction::DefendFlag));
    }

    #[test]
    fn player_pressure_is_stamped_on_setup() {
        let (world, scenario) = FlagWarScenario::build(&FlagWarConfig::default()).unwrap();
        let id = *scenario.tables().players.left.first().unwrap();
        let pos = world.position(id).unwrap();
        assert!(scenario.fields().edge_cost(pos) > 2.0);
        assert!((scenario.fields().edge_cost(Position::new(20, 1)) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn motionless_players_are_rejected() {
        let config = FlagWarConfig {
            speed: 0.0,
            ..FlagWarConfig::default()
        };
        assert!(matches!(
            FlagWarScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn too_many_attackers_is_rejected() {
        let config = FlagWarConfig {
            attackers: PerSide::new(9, 2),
            ..FlagWarConfig::default()
        };
        assert!(matches!(
            FlagWarScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }
}
