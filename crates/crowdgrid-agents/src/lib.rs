//! Entity state, movement policy, and role behaviors for the Crowdgrid
//! simulation.
//!
//! Behaviors never hold a back-reference to a model. Each one receives the
//! [`WorldState`] and whatever rule tables it needs as explicit arguments,
//! mutates the world immediately, and returns a plain outcome.
//!
//! # Modules
//!
//! - [`entity`] -- The closed [`Entity`] sum type and per-variant state.
//! - [`registry`] -- Tombstoning arena addressed by stable handles.
//! - [`state`] -- [`WorldState`]: grid plus arena plus per-tick removals.
//! - [`movement`] -- Candidate filtering and cheapest-cell selection
//!   shared by every mobile role.
//! - [`patrol`] -- The 16-cell patrol ring.
//! - [`crowd`] -- Walkers, entries, exits, and gates.
//! - [`team`] -- Team tables and flag carrying shared by the flag games.
//! - [`flag`] -- Greedy capture-the-flag players.
//! - [`combat`] -- Flag-war players with A* planning, and projectiles.
//! - [`error`] -- Error types for entity operations.

pub mod combat;
pub mod crowd;
pub mod entity;
pub mod error;
pub mod flag;
pub mod movement;
pub mod patrol;
pub mod registry;
pub mod state;
pub mod team;

pub use entity::Entity;
pub use error::AgentError;
pub use movement::{MovementConfig, StepOutcome};
pub use registry::EntityRegistry;
pub use state::{RemovalSet, WorldState};
pub use team::TeamTables;
