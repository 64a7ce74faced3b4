//! Scenario composition roots.
//!
//! A scenario builds the static layout into a fresh [`WorldState`], holds
//! the read-only team tables and rule sets its agents consult, and maps
//! each activated entity to the behavior for its variant.

pub mod capture_flag;
pub mod flag_war;
pub mod layout;
pub mod metro;

use rand::rngs::StdRng;

use crowdgrid_agents::WorldState;
use crowdgrid_types::{EntityId, Scoreboard, WalkerRecord};

use crate::config::ScenarioConfig;
use crate::error::ScenarioError;

pub use capture_flag::CaptureFlagScenario;
pub use flag_war::FlagWarScenario;
pub use metro::MetroScenario;

/// Behavior dispatch for one scenario.
pub trait Scenario {
    /// Short scenario name for logs.
    fn name(&self) -> &'static str;

    /// Run one turn of the live entity `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the entity's behavior fails.
    fn activate(
        &mut self,
        world: &mut WorldState,
        id: EntityId,
        rng: &mut StdRng,
    ) -> Result<(), ScenarioError>;

    /// Counters of every walker removed so far, in removal order.
    fn walker_records(&self) -> &[WalkerRecord];

    /// Delivered flags per team, for the flag games.
    fn scoreboard(&self) -> Option<Scoreboard>;
}

/// Any of the built-in scenarios.
#[derive(Debug, Clone)]
pub enum AnyScenario {
    /// Metro station crowd flow.
    Metro(MetroScenario),
    /// Greedy capture the flag.
    CaptureFlag(CaptureFlagScenario),
    /// Flag war with projectiles.
    FlagWar(FlagWarScenario),
}

impl AnyScenario {
    /// Build the configured scenario and its world.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the configuration is rejected.
    pub fn build(config: &ScenarioConfig) -> Result<(WorldState, Self), ScenarioError> {
        Ok(match config {
            ScenarioConfig::Metro(c) => {
                let (world, scenario) = MetroScenario::build(c)?;
                (world, Self::Metro(scenario))
            }
            ScenarioConfig::CaptureFlag(c) => {
                let (world, scenario) = CaptureFlagScenario::build(c)?;
                (world, Self::CaptureFlag(scenario))
            }
            ScenarioConfig::FlagWar(c) => {
                let (world, scenario) = FlagWarScenario::build(c)?;
                (world, Self::FlagWar(scenario))
            }
        })
    }
}

impl Scenario for AnyScenario {
    fn name(&self) -> &'static str {
        match self {
            Self::Metro(s) => s.name(),
            Self::CaptureFlag(s) => s.name(),
            Self::FlagWar(s) => s.name(),
        }
    }

    fn activate(
        &mut self,
        world: &mut WorldState,
        id: EntityId,
        rng: &mut StdRng,
    ) -> Result<(), ScenarioError> {
        match self {
            Self::Metro(s) => s.activate(world, id, rng),
            Self::CaptureFlag(s) => s.activate(world, id, rng),
            Self::FlagWar(s) => s.activate(world, id, rng),
        }
    }

    fn walker_records(&self) -> &[WalkerRecord] {
        match self {
            Self::Metro(s) => s.walker_records(),
            Self::CaptureFlag(s) => s.walker_records(),
            Self::FlagWar(s) => s.walker_records(),
        }
    }

    fn scoreboard(&self) -> Option<Scoreboard> {
        match self {
            Self::Metro(s) => s.scoreboard(),
            Self::CaptureFlag(s) => s.scoreboard(),
            Self::FlagWar(s) => s.scoreboard(),
        }
    }
}
