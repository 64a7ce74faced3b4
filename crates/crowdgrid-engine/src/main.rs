//! Headless engine for the Crowdgrid simulation.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `crowdgrid-config.yaml`
//! 3. Build the configured scenario into a seeded model
//! 4. Run the configured number of ticks
//! 5. Log the result

mod error;
mod log_callback;

use std::path::Path;

use crowdgrid_core::{Model, Scenario, SimulationConfig, run_ticks};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_callback::LogCallback;

/// Ticks between progress lines.
const PROGRESS_INTERVAL: u64 = 100;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a tick fails.
fn main() -> Result<(), EngineError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("crowdgrid-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(seed = config.seed, ticks = config.ticks, "Configuration loaded");

    // 3. Build the model.
    let mut model = Model::from_config(&config)?;
    info!(
        scenario = model.scenario().name(),
        width = model.world().grid().width(),
        height = model.world().grid().height(),
        "Scenario ready"
    );

    // 4. Run.
    let mut callback = LogCallback::new(PROGRESS_INTERVAL);
    let summary = run_ticks(&mut model, config.ticks, &mut callback)?;

    // 5. Log the result.
    info!(
        ticks = summary.ticks_run,
        live_entities = summary.live_entities,
        exited_walkers = summary.exited_walkers,
        "Run complete"
    );
    if let Some(score) = summary.scoreboard {
        info!(left = score.left, right = score.right, "Final score");
    }
    Ok(())
}

/// Load `crowdgrid-config.yaml` from the working directory, or the
/// defaults when it is absent.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new("crowdgrid-config.yaml");
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
