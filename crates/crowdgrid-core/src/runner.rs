//! Bounded run loop with a per-tick callback.

use tracing::info;

use crowdgrid_agents::WorldState;
use crowdgrid_types::{Scoreboard, WorldSnapshot};

use crate::error::TickError;
use crate::model::{Model, TickReport};
use crate::scenario::Scenario;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed by this run.
    pub ticks_run: u64,
    /// The model's tick counter after the run.
    pub final_tick: u64,
    /// Live entities after the last tick.
    pub live_entities: usize,
    /// Walkers removed by exits and gates since the model was built.
    pub exited_walkers: usize,
    /// Delivered flags per team, for the flag games.
    pub scoreboard: Option<Scoreboard>,
    /// The last tick report, if any tick ran.
    pub last_report: Option<TickReport>,
}

/// Callback invoked after each tick completes.
pub trait TickCallback {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, report: &TickReport, world: &WorldState);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _report: &TickReport, _world: &WorldState) {}
}

/// Keeps the snapshot taken after every tick.
#[derive(Debug, Default)]
pub struct SnapshotLog {
    /// One snapshot per completed tick, oldest first.
    pub snapshots: Vec<WorldSnapshot>,
}

impl TickCallback for SnapshotLog {
    fn on_tick(&mut self, _report: &TickReport, world: &WorldState) {
        self.snapshots.push(world.snapshot());
    }
}

/// Step `model` `ticks` times, calling `callback` after each tick.
///
/// # Errors
///
/// Returns [`RunnerError`] from the first tick that fails; ticks already
/// completed stay applied.
pub fn run_ticks<S: Scenario>(
    model: &mut Model<S>,
    ticks: u64,
    callback: &mut dyn TickCallback,
) -> Result<RunSummary, RunnerError> {
    info!(
        scenario = model.scenario().name(),
        ticks,
        start_tick = model.tick(),
        "Simulation starting"
    );

    let mut last_report = None;
    let mut ticks_run: u64 = 0;
    while ticks_run < ticks {
        let report = model.step()?;
        callback.on_tick(&report, model.world());
        last_report = Some(report);
        ticks_run = ticks_run.saturating_add(1);
    }

    let summary = RunSummary {
        ticks_run,
        final_tick: model.tick(),
        live_entities: model.world().entities().len(),
        exited_walkers: model.walker_records().len(),
        scoreboard: model.scoreboard(),
        last_report,
    };
    info!(
        ticks_run,
        final_tick = summary.final_tick,
        live_entities = summary.live_entities,
        exited_walkers = summary.exited_walkers,
        "Simulation ended"
    );
    Ok(summary)
}
