//! Randomized per-tick activation of every registered entity.
//!
//! The scheduler holds only handles. Removal is enacted by whoever removes
//! (the entity leaves the grid and its arena slot becomes a tombstone), so
//! the activation loop never mutates the structure it iterates; it skips
//! handles that died earlier in the same tick instead.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

use crowdgrid_agents::{Entity, WorldState};
use crowdgrid_types::EntityId;

use crate::error::TickError;
use crate::scenario::Scenario;

/// Counts from one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationStats {
    /// Entities that took their turn.
    pub activated: usize,
    /// Entities skipped because they were removed earlier this tick.
    pub skipped: usize,
    /// Acting entities registered at the end of the pass.
    pub registered: usize,
}

/// Live-entity registry with a fresh random order every tick.
#[derive(Debug, Clone, Default)]
pub struct TurnScheduler {
    registered: Vec<EntityId>,
}

impl TurnScheduler {
    /// An empty scheduler.
    pub const fn new() -> Self {
        Self {
            registered: Vec::new(),
        }
    }

    /// Add a handle to the registry.
    pub fn register(&mut self, id: EntityId) {
        self.registered.push(id);
    }

    /// Registered handles, in insertion order.
    pub fn registered(&self) -> &[EntityId] {
        &self.registered
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// A fresh permutation of the registry.
    pub fn activation_order(&self, rng: &mut StdRng) -> Vec<EntityId> {
        let mut order = self.registered.clone();
        order.shuffle(rng);
        order
    }

    /// Activate every registered entity once, in random order.
    ///
    /// Entities spawned during the pass join the registry at its end and
    /// first act next tick. Handles removed during the pass are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] from the first behavior that fails; the rest of
    /// the tick is not run.
    pub fn step<S: Scenario + ?Sized>(
        &mut self,
        world: &mut WorldState,
        scenario: &mut S,
        rng: &mut StdRng,
    ) -> Result<ActivationStats, TickError> {
        let mut stats = ActivationStats::default();
        for id in self.activation_order(rng) {
            if world.was_removed(id) || !world.entities().is_live(id) {
                trace!(entity = %id, "skipping entity removed this tick");
                stats.skipped = stats.skipped.saturating_add(1);
                continue;
            }
            scenario.activate(world, id, rng)?;
            stats.activated = stats.activated.saturating_add(1);
        }
        stats.registered = self.admit_spawned(world);
        Ok(stats)
    }

    /// Register acting entities spawned since the last call and forget
    /// handles that are no longer live. Returns how many were registered.
    pub fn admit_spawned(&mut self, world: &mut WorldState) -> usize {
        let before = self.registered.len();
        for id in world.take_spawned() {
            if world.entity(id).is_some_and(Entity::acts) {
                self.registered.push(id);
            }
        }
        let added = self.registered.len().saturating_sub(before);
        self.registered.retain(|&id| world.entities().is_live(id));
        added
    }
}
