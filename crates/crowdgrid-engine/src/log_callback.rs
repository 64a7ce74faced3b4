//! Tick callback that reports progress through `tracing`.

use crowdgrid_agents::WorldState;
use crowdgrid_core::{TickCallback, TickReport};
use crowdgrid_types::EntityKind;
use tracing::{debug, info};

/// Logs every tick at debug level and a population line every
/// `interval` ticks at info level.
pub struct LogCallback {
    interval: u64,
}

impl LogCallback {
    /// Report population every `interval` ticks; zero disables it.
    pub const fn new(interval: u64) -> Self {
        Self { interval }
    }
}

impl TickCallback for LogCallback {
    fn on_tick(&mut self, report: &TickReport, world: &WorldState) {
        debug!(
            tick = report.tick,
            activated = report.activated,
            removed = report.removed,
            "Tick"
        );
        if report.tick.checked_rem(self.interval) != Some(0) {
            return;
        }
        let snapshot = world.snapshot();
        info!(
            tick = report.tick,
            live = report.live,
            walkers = snapshot.count_kind(EntityKind::Walker),
            players = snapshot.count_kind(EntityKind::Player),
            shots = snapshot.count_kind(EntityKind::FireShot),
            "Progress"
        );
    }
}
