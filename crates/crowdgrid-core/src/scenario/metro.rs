//! Metro station: walkers stream in from one side and out the other.

use rand::rngs::StdRng;
use tracing::info;

use crowdgrid_agents::crowd::{self, CrowdRules, PressureMap};
use crowdgrid_agents::entity::Portal;
use crowdgrid_agents::{Entity, WorldState};
use crowdgrid_types::{EntityId, EntityKind, PerSide, Position, Scoreboard, Side, WalkerRecord};
use crowdgrid_world::Connectivity;

use super::Scenario;
use super::layout::{self, Layout};
use crate::config::{MetroConfig, MetroLayout};
use crate::error::ScenarioError;

/// The metro station scenario.
#[derive(Debug, Clone)]
pub struct MetroScenario {
    rules: CrowdRules,
    goals: PerSide<Vec<Position>>,
    pressure: Option<PressureMap>,
    records: Vec<WalkerRecord>,
}

impl MetroScenario {
    /// Validate `config`, lay out the station, and return the world with
    /// its portals and walls in place.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] for out-of-range parameters, portals off
    /// the side walls' rows, or overlapping portals.
    pub fn build(config: &MetroConfig) -> Result<(WorldState, Self), ScenarioError> {
        for side in Side::ALL {
            layout::check_probability("admission rate", *config.admission.get(side))?;
        }
        let metric = config.goal_metric.unwrap_or_else(|| config.layout.default_metric());
        let goal_weight = config
            .goal_weight
            .unwrap_or_else(|| config.layout.default_goal_weight());
        let jitter = config.jitter.unwrap_or_else(|| config.layout.default_jitter());
        layout::check_non_negative("goal weight", goal_weight)?;
        layout::check_non_negative("impatience", config.impatience)?;
        layout::check_non_negative("jitter", jitter)?;
        layout::check_non_negative("pressure weight", config.pressure_weight)?;
        for side in Side::ALL {
            let (admitting, removing) = match config.layout {
                MetroLayout::Unidirectional => {
                    (config.entry_rows.get(side), config.exit_rows.get(side))
                }
                MetroLayout::Bidirectional => {
                    (config.gate_rows.get(side), config.gate_rows.get(side))
                }
            };
            if admitting.is_empty() || removing.is_empty() {
                return Err(ScenarioError::invalid(format!(
                    "{side} side needs at least one admitting and one removing portal"
                )));
            }
        }

        let mut plan = Layout::new(config.width, config.height)?;
        let mut world = WorldState::new(config.width, config.height)?;
        let mut goals: PerSide<Vec<Position>> = PerSide::default();
        let wall_x = PerSide::new(0, config.width.saturating_sub(1));

        let mut portals = 0usize;
        for side in Side::ALL {
            let x = *wall_x.get(side);
            let mut place = |what: &'static str, rows: &[i32], entity: Entity, goal: bool| {
                for &y in rows {
                    let pos = plan.claim(what, Position::new(x, y))?;
                    world.spawn(entity.clone(), pos)?;
                    if goal {
                        goals.get_mut(side).push(pos);
                    }
                    portals = portals.saturating_add(1);
                }
                Ok::<(), ScenarioError>(())
            };
            let portal = Portal { side };
            match config.layout {
                MetroLayout::Unidirectional => {
                    let entries = config.entry_rows.get(side).as_slice();
                    place("entry", entries, Entity::Entry(portal), false)?;
                    let exits = config.exit_rows.get(side).as_slice();
                    place("exit", exits, Entity::Exit(portal), true)?;
                }
                MetroLayout::Bidirectional => {
                    let gates = config.gate_rows.get(side).as_slice();
                    place("gate", gates, Entity::Gate(portal), true)?;
                }
            }
        }
        let walls = plan.build_walls(&mut world)?;

        let pressure = if config.track_pressure || config.pressure_weight > 0.0 {
            Some(PressureMap::new(config.width, config.height)?)
        } else {
            None
        };
        let rules = CrowdRules {
            connectivity: Connectivity::Moore,
            goal_metric: metric,
            goal_weight,
            impatience: config.impatience,
            jitter,
            entries_block: config.layout == MetroLayout::Unidirectional,
            pressure_weight: config.pressure_weight,
            admission: config.admission,
        };

        info!(
            layout = ?config.layout,
            width = config.width,
            height = config.height,
            portals,
            walls,
            pressure = pressure.is_some(),
            "Metro station built"
        );

        Ok((
            world,
            Self {
                rules,
                goals,
                pressure,
                records: Vec::new(),
            },
        ))
    }

    /// Walker rules in effect.
    pub const fn rules(&self) -> &CrowdRules {
        &self.rules
    }

    /// Removal portal cells per side.
    pub const fn goals(&self) -> &PerSide<Vec<Position>> {
        &self.goals
    }

    /// Crowd pressure, when tracked.
    pub const fn pressure(&self) -> Option<&PressureMap> {
        self.pressure.as_ref()
    }
}

impl Scenario for MetroScenario {
    fn name(&self) -> &'static str {
        "metro"
    }

    fn activate(
        &mut self,
        world: &mut WorldState,
        id: EntityId,
        rng: &mut StdRng,
    ) -> Result<(), ScenarioError> {
        match world.entity(id).map(Entity::kind) {
            Some(EntityKind::Walker) => {
                crowd::step_walker(world, id, &self.rules, &self.goals, self.pressure.as_mut(), rng)?;
            }
            Some(EntityKind::Entry | EntityKind::Exit | EntityKind::Gate) => {
                crowd::step_portal(
                    world,
                    id,
                    &self.rules,
                    self.pressure.as_mut(),
                    &mut self.records,
                    rng,
                )?;
            }
            _ => {}
        }
        Ok(())
    }

    fn walker_records(&self) -> &[WalkerRecord] {
        &self.records
    }

    fn scoreboard(&self) -> Option<Scoreboard> {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn count(world: &WorldState, kind: EntityKind) -> usize {
        world.snapshot().count_kind(kind)
    }

    #[test]
    fn unidirectional_station_layout() {
        let (world, scenario) = MetroScenario::build(&MetroConfig::default()).unwrap();
        assert_eq!(count(&world, EntityKind::Entry), 8);
        assert_eq!(count(&world, EntityKind::Exit), 8);
        assert_eq!(count(&world, EntityKind::Gate), 0);
        // Perimeter of 45x30 minus the 16 portal cells.
        assert_eq!(count(&world, EntityKind::Wall), 2 * 45 + 2 * 28 - 16);
        assert!(scenario.rules().entries_block);
        assert_eq!(scenario.goals().left.len(), 4);
        assert!(scenario.goals().left.iter().all(|p| p.x == 0));
        world.verify().unwrap();
    }

    #[test]
    fn bidirectional_station_uses_gates() {
        let config = MetroConfig {
            layout: MetroLayout::Bidirectional,
            ..MetroConfig::default()
        };
        let (world, scenario) = MetroScenario::build(&config).unwrap();
        assert_eq!(count(&world, EntityKind::Gate), 12);
        assert_eq!(count(&world, EntityKind::Entry), 0);
        assert!(!scenario.rules().entries_block);
        assert!((scenario.rules().goal_weight - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overlapping_portals_are_rejected() {
        let config = MetroConfig {
            exit_rows: PerSide::new(vec![22, 23], vec![3]),
            ..MetroConfig::default()
        };
        let err = MetroScenario::build(&config).unwrap_err();
        assert!(matches!(err, ScenarioError::Overlap { position } if position == Position::new(0, 22)));
    }

    #[test]
    fn side_without_exits_is_rejected() {
        let config = MetroConfig {
            exit_rows: PerSide::new(vec![], vec![3, 4, 5, 6]),
            ..MetroConfig::default()
        };
        assert!(matches!(
            MetroScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn side_without_entries_is_rejected() {
        let config = MetroConfig {
            entry_rows: PerSide::new(vec![19, 20], vec![]),
            ..MetroConfig::default()
        };
        assert!(matches!(
            MetroScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn side_without_gates_is_rejected() {
        let config = MetroConfig {
            layout: MetroLayout::Bidirectional,
            gate_rows: PerSide::new(vec![21, 22], vec![]),
            ..MetroConfig::default()
        };
        assert!(matches!(
            MetroScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn portal_row_off_board_is_rejected() {
        let config = MetroConfig {
            entry_rows: PerSide::new(vec![40], vec![7]),
            ..MetroConfig::default()
        };
        assert!(matches!(
            MetroScenario::build(&config),
            Err(ScenarioError::OutOfBounds { what: "entry", .. })
        ));
    }

    #[test]
    fn bad_admission_rate_is_rejected() {
        let config = MetroConfig {
            admission: PerSide::new(0.2, 1.2),
            ..MetroConfig::default()
        };
        assert!(matches!(
            MetroScenario::build(&config),
            Err(ScenarioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn walls_are_never_activated_into_errors() {
        let (mut world, mut scenario) = MetroScenario::build(&MetroConfig::default()).unwrap();
        let wall = world.entities().iter().find(|(_, e)| e.is_wall()).map(|(id, _)| id).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        scenario.activate(&mut world, wall, &mut rng).unwrap();
    }
}
