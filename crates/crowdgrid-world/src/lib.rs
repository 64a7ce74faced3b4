//! Spatial substrate for the Crowdgrid simulation.
//!
//! This crate knows nothing about walkers or flags. It models a bounded
//! rectangular grid of cells that may each hold several entities, the
//! distance metrics used to score candidate moves, additive influence
//! fields stamped by masks, and a cost-aware A* search.
//!
//! # Modules
//!
//! - [`grid`] -- [`SpatialGrid`], the authority on which entity sits in
//!   which cell, plus neighborhood enumeration.
//! - [`distance`] -- Manhattan, Chebyshev, and diagonal (octile) metrics.
//! - [`influence`] -- [`InfluenceMask`] kernels and the [`InfluenceField`]
//!   they are applied to.
//! - [`path`] -- A* over any [`SearchSpace`].
//! - [`error`] -- Error types for grid and field operations.

pub mod distance;
pub mod error;
pub mod grid;
pub mod influence;
pub mod path;

// Re-export primary types at crate root.
pub use distance::DistanceMetric;
pub use error::WorldError;
pub use grid::{Connectivity, SpatialGrid};
pub use influence::{InfluenceField, InfluenceMask};
pub use path::{SearchSpace, find_path};
