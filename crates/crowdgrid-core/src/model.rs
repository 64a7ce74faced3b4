//! The simulation model: world, scheduler, scenario, and random stream.
//!
//! [`Model::step`] is one tick: clear the removal record, then let the
//! scheduler activate every live entity once. Mutations are visible
//! immediately to entities activated later in the same tick. After the
//! pass the grid invariant is checked, and a violation aborts the run.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crowdgrid_agents::WorldState;
use crowdgrid_types::{Scoreboard, WalkerRecord, WorldSnapshot};

use crate::config::SimulationConfig;
use crate::error::{ScenarioError, TickError};
use crate::scenario::{AnyScenario, Scenario};
use crate::scheduler::TurnScheduler;

/// Summary of one completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number, starting at 1.
    pub tick: u64,
    /// Entities that took their turn.
    pub activated: usize,
    /// Entities skipped because they were removed earlier in the tick.
    pub skipped: usize,
    /// Acting entities spawned during the tick.
    pub spawned: usize,
    /// Entities removed during the tick.
    pub removed: usize,
    /// Live entities at the end of the tick.
    pub live: usize,
}

/// A scenario bound to its world and a seeded random stream.
#[derive(Debug, Clone)]
pub struct Model<S = AnyScenario> {
    world: WorldState,
    scheduler: TurnScheduler,
    scenario: S,
    rng: StdRng,
}

impl<S: Scenario> Model<S> {
    /// Wrap a built world and scenario. Every acting entity already in
    /// the world is registered with the scheduler.
    pub fn new(mut world: WorldState, scenario: S, seed: u64) -> Self {
        let mut scheduler = TurnScheduler::new();
        let registered = scheduler.admit_spawned(&mut world);
        info!(
            scenario = scenario.name(),
            seed,
            registered,
            entities = world.entities().len(),
            "Model initialized"
        );
        Self {
            world,
            scheduler,
            scenario,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if a behavior fails or the grid invariant is
    /// broken at the end of the tick. The model should not be stepped
    /// again after an error.
    pub fn step(&mut self) -> Result<TickReport, TickError> {
        let tick = self.world.begin_tick()?;
        let stats = self
            .scheduler
            .step(&mut self.world, &mut self.scenario, &mut self.rng)?;
        self.world.verify()?;

        let report = TickReport {
            tick,
            activated: stats.activated,
            skipped: stats.skipped,
            spawned: stats.registered,
            removed: self.world.removals().len(),
            live: self.world.entities().len(),
        };
        debug!(
            tick,
            activated = report.activated,
            skipped = report.skipped,
            spawned = report.spawned,
            removed = report.removed,
            live = report.live,
            "Tick complete"
        );
        Ok(report)
    }

    /// The world.
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// The scenario.
    pub const fn scenario(&self) -> &S {
        &self.scenario
    }

    /// The scheduler.
    pub const fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Ticks completed so far.
    pub const fn tick(&self) -> u64 {
        self.world.tick()
    }

    /// Observable state of every live entity.
    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }

    /// Counters of every walker removed so far.
    pub fn walker_records(&self) -> &[WalkerRecord] {
        self.scenario.walker_records()
    }

    /// Delivered flags per team, for the flag games.
    pub fn scoreboard(&self) -> Option<Scoreboard> {
        self.scenario.scoreboard()
    }
}

impl Model<AnyScenario> {
    /// Build the configured scenario and seed the model.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the scenario configuration is rejected.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ScenarioError> {
        let (world, scenario) = AnyScenario::build(&config.scenario)?;
        Ok(Self::new(world, scenario, config.seed))
    }
}
