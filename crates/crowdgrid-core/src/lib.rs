//! Turn scheduling, scenario construction, and the tick loop for the
//! Crowdgrid simulation.
//!
//! # Modules
//!
//! - [`config`] -- YAML run configuration.
//! - [`scheduler`] -- Randomized per-tick activation over stable handles.
//! - [`scenario`] -- Composition roots: metro station, greedy capture the
//!   flag, and flag war.
//! - [`model`] -- [`Model`]: one seeded world plus its scenario.
//! - [`runner`] -- Bounded runs with a per-tick callback.
//! - [`error`] -- Error types for scenario construction and ticks.

pub mod config;
pub mod error;
pub mod model;
pub mod runner;
pub mod scenario;
pub mod scheduler;

pub use config::{ConfigError, ScenarioConfig, SimulationConfig};
pub use error::{ScenarioError, TickError};
pub use model::{Model, TickReport};
pub use runner::{NoOpCallback, RunSummary, RunnerError, SnapshotLog, TickCallback, run_ticks};
pub use scenario::{AnyScenario, Scenario};
pub use scheduler::TurnScheduler;
