//! Shared type definitions for the Crowdgrid simulation.
//!
//! This crate is the single source of truth for the value types that flow
//! between the grid engine, the agent behaviors, the scenario models, and
//! any rendering or analysis collaborator that consumes per-tick snapshots.
//!
//! # Modules
//!
//! - [`ids`] -- Stable arena handles for entities
//! - [`geometry`] -- Grid positions and step directions
//! - [`enums`] -- Sides, entity kinds, player actions, per-side tables
//! - [`snapshot`] -- Per-tick observable snapshot and aggregate counters

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use enums::{EntityKind, PerSide, PlayerAction, Side};
pub use geometry::{Direction, Position};
pub use ids::EntityId;
pub use snapshot::{EntitySnapshot, Scoreboard, WalkerRecord, WorldSnapshot, leader, record_delivery};
