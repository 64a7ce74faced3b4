//! The shared world handle passed to every behavior.
//!
//! [`WorldState`] owns the spatial grid and the entity arena together and
//! is the only way behaviors mutate either, so an entity's registry slot
//! and its grid cell always appear and disappear as a pair. It also keeps
//! the per-tick removal record and the list of entities spawned during the
//! current tick.

use std::collections::BTreeSet;

use crowdgrid_types::{EntityId, EntityKind, EntitySnapshot, Position, WorldSnapshot};
use crowdgrid_world::SpatialGrid;
use tracing::debug;

use crate::entity::{Entity, FireShot, Flag, Jail, Player, Walker};
use crate::error::AgentError;
use crate::registry::EntityRegistry;

// ---------------------------------------------------------------------------
// RemovalSet
// ---------------------------------------------------------------------------

/// Entities removed during the current tick. Cleared at tick start.
#[derive(Debug, Clone, Default)]
pub struct RemovalSet {
    removed: BTreeSet<EntityId>,
}

impl RemovalSet {
    /// Whether `id` was removed this tick.
    pub fn contains(&self, id: EntityId) -> bool {
        self.removed.contains(&id)
    }

    /// Number of removals this tick.
    pub fn len(&self) -> usize {
        self.removed.len()
    }

    /// Whether nothing was removed this tick.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    fn insert(&mut self, id: EntityId) {
        self.removed.insert(id);
    }

    fn clear(&mut self) {
        self.removed.clear();
    }
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

/// Grid, entity arena, and per-tick bookkeeping.
#[derive(Debug, Clone)]
pub struct WorldState {
    grid: SpatialGrid,
    entities: EntityRegistry,
    removals: RemovalSet,
    spawned: Vec<EntityId>,
    tick: u64,
}

impl WorldState {
    /// Create an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] for degenerate dimensions.
    pub fn new(width: i32, height: i32) -> Result<Self, AgentError> {
        Ok(Self {
            grid: SpatialGrid::new(width, height)?,
            entities: EntityRegistry::new(),
            removals: RemovalSet::default(),
            spawned: Vec::new(),
            tick: 0,
        })
    }

    /// The spatial grid, read-only.
    pub const fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// The entity arena, read-only.
    pub const fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Number of completed or in-progress ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Removals recorded during the current tick.
    pub const fn removals(&self) -> &RemovalSet {
        &self.removals
    }

    /// Whether `id` was removed earlier in this tick.
    pub fn was_removed(&self, id: EntityId) -> bool {
        self.removals.contains(id)
    }

    /// Start a new tick: clear the removal record and advance the counter.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::TickOverflow`] if the counter would wrap.
    pub fn begin_tick(&mut self) -> Result<u64, AgentError> {
        self.removals.clear();
        self.tick = self.tick.checked_add(1).ok_or(AgentError::TickOverflow)?;
        Ok(self.tick)
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Add an entity to the arena and the grid.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if `pos` is off the board; nothing is
    /// stored in that case.
    pub fn spawn(&mut self, entity: Entity, pos: Position) -> Result<EntityId, AgentError> {
        self.grid.check_bounds(pos)?;
        let kind = entity.kind();
        let id = self.entities.insert(entity);
        self.grid.place(id, pos)?;
        self.spawned.push(id);
        debug!(entity = %id, ?kind, position = %pos, "entity spawned");
        Ok(id)
    }

    /// Move an entity to `to`, returning the cell it left.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if `to` is off the board or the
    /// entity is not on the grid.
    pub fn relocate(&mut self, id: EntityId, to: Position) -> Result<Position, AgentError> {
        Ok(self.grid.move_entity(id, to)?)
    }

    /// Remove an entity from the grid and the arena and record the removal
    /// for the rest of this tick.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if the entity is not on the grid or
    /// [`AgentError::EntityNotFound`] if its slot is already a tombstone.
    pub fn despawn(&mut self, id: EntityId) -> Result<(Entity, Position), AgentError> {
        let pos = self.grid.remove(id)?;
        let entity = self.entities.remove(id).ok_or(AgentError::EntityNotFound(id))?;
        self.removals.insert(id);
        debug!(entity = %id, kind = ?entity.kind(), position = %pos, "entity removed");
        Ok((entity, pos))
    }

    /// Drain the handles spawned since the last call.
    pub fn take_spawned(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.spawned)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Borrow a live entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutably borrow a live entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Current cell of an entity.
    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.grid.position_of(id)
    }

    /// Current cell of an entity that must be on the grid.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unplaced`] if it is not.
    pub fn require_position(&self, id: EntityId) -> Result<Position, AgentError> {
        self.position(id).ok_or(AgentError::Unplaced(id))
    }

    /// Live entities in the cell at `pos`.
    pub fn occupants(&self, pos: Position) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.grid
            .occupants_at(pos)
            .iter()
            .filter_map(|&id| self.entities.get(id).map(|e| (id, e)))
    }

    /// Whether any occupant of `pos` satisfies `pred`.
    pub fn cell_has(&self, pos: Position, mut pred: impl FnMut(&Entity) -> bool) -> bool {
        self.occupants(pos).any(|(_, e)| pred(e))
    }

    // -------------------------------------------------------------------
    // Typed access
    // -------------------------------------------------------------------

    /// Borrow a walker.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn walker(&self, id: EntityId) -> Result<&Walker, AgentError> {
        let entity = self.require(id)?;
        entity.as_walker().ok_or_else(|| wrong_kind(id, EntityKind::Walker, entity))
    }

    /// Mutably borrow a walker.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn walker_mut(&mut self, id: EntityId) -> Result<&mut Walker, AgentError> {
        let entity = self.require_mut(id)?;
        let found = entity.kind();
        entity.as_walker_mut().ok_or(AgentError::WrongKind {
            entity: id,
            expected: EntityKind::Walker,
            found,
        })
    }

    /// Borrow a player.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn player(&self, id: EntityId) -> Result<&Player, AgentError> {
        let entity = self.require(id)?;
        entity.as_player().ok_or_else(|| wrong_kind(id, EntityKind::Player, entity))
    }

    /// Mutably borrow a player.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn player_mut(&mut self, id: EntityId) -> Result<&mut Player, AgentError> {
        let entity = self.require_mut(id)?;
        let found = entity.kind();
        entity.as_player_mut().ok_or(AgentError::WrongKind {
            entity: id,
            expected: EntityKind::Player,
            found,
        })
    }

    /// Borrow a flag.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn flag(&self, id: EntityId) -> Result<&Flag, AgentError> {
        let entity = self.require(id)?;
        entity.as_flag().ok_or_else(|| wrong_kind(id, EntityKind::Flag, entity))
    }

    /// Mutably borrow a flag.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn flag_mut(&mut self, id: EntityId) -> Result<&mut Flag, AgentError> {
        let entity = self.require_mut(id)?;
        let found = entity.kind();
        entity.as_flag_mut().ok_or(AgentError::WrongKind {
            entity: id,
            expected: EntityKind::Flag,
            found,
        })
    }

    /// Borrow a jail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn jail(&self, id: EntityId) -> Result<&Jail, AgentError> {
        let entity = self.require(id)?;
        entity.as_jail().ok_or_else(|| wrong_kind(id, EntityKind::Jail, entity))
    }

    /// Mutably borrow a jail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn jail_mut(&mut self, id: EntityId) -> Result<&mut Jail, AgentError> {
        let entity = self.require_mut(id)?;
        let found = entity.kind();
        entity.as_jail_mut().ok_or(AgentError::WrongKind {
            entity: id,
            expected: EntityKind::Jail,
            found,
        })
    }

    /// Borrow a projectile.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn fire_shot(&self, id: EntityId) -> Result<&FireShot, AgentError> {
        let entity = self.require(id)?;
        entity.as_fire_shot().ok_or_else(|| wrong_kind(id, EntityKind::FireShot, entity))
    }

    /// Mutably borrow a projectile.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EntityNotFound`] or [`AgentError::WrongKind`].
    pub fn fire_shot_mut(&mut self, id: EntityId) -> Result<&mut FireShot, AgentError> {
        let entity = self.require_mut(id)?;
        let found = entity.kind();
        entity.as_fire_shot_mut().ok_or(AgentError::WrongKind {
            entity: id,
            expected: EntityKind::FireShot,
            found,
        })
    }

    // -------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------

    /// Snapshot every live entity for renderers and analysis.
    pub fn snapshot(&self) -> WorldSnapshot {
        let entities = self
            .entities
            .iter()
            .filter_map(|(id, entity)| {
                let position = self.grid.position_of(id)?;
                let player = entity.as_player();
                Some(EntitySnapshot {
                    id,
                    kind: entity.kind(),
                    position,
                    orientation: entity.orientation(),
                    side: entity.side(),
                    carrying_flag: player.is_some_and(|p| p.carried_flag.is_some()),
                    jailed: player.is_some_and(|p| p.arrested_in.is_some()),
                    crashed: entity.as_fire_shot().is_some_and(|s| s.crashed),
                })
            })
            .collect();
        WorldSnapshot {
            tick: self.tick,
            width: self.grid.width(),
            height: self.grid.height(),
            entities,
        }
    }

    /// Check that the arena and the grid describe the same set of
    /// entities and that every grid entry is consistent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unplaced`] for a live entity with no cell, or
    /// [`AgentError::World`] for an inconsistent grid.
    pub fn verify(&self) -> Result<(), AgentError> {
        self.grid.verify()?;
        for (id, _) in self.entities.iter() {
            if self.grid.position_of(id).is_none() {
                return Err(AgentError::Unplaced(id));
            }
        }
        if self.grid.entity_count() != self.entities.len() {
            return Err(crowdgrid_world::WorldError::OccupancyMismatch {
                in_cells: self.grid.entity_count(),
                indexed: self.entities.len(),
            }
            .into());
        }
        Ok(())
    }

    fn require(&self, id: EntityId) -> Result<&Entity, AgentError> {
        self.entities.get(id).ok_or(AgentError::EntityNotFound(id))
    }

    fn require_mut(&mut self, id: EntityId) -> Result<&mut Entity, AgentError> {
        self.entities.get_mut(id).ok_or(AgentError::EntityNotFound(id))
    }
}

const fn wrong_kind(entity: EntityId, expected: EntityKind, found: &Entity) -> AgentError {
    AgentError::WrongKind {
        entity,
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entity::Portal;
    use crowdgrid_types::Side;

    #[test]
    fn spawn_and_despawn_keep_arena_and_grid_paired() {
        let mut world = WorldState::new(6, 4).unwrap();
        let wall = world.spawn(Entity::Wall, Position::new(0, 0)).unwrap();
        let walker = world
            .spawn(Entity::Walker(Walker::new(Side::Left, 0.5, 1.0)), Position::new(2, 2))
            .unwrap();
        world.verify().unwrap();
        assert_eq!(world.take_spawned(), vec![wall, walker]);
        assert!(world.take_spawned().is_empty());

        let (entity, pos) = world.despawn(walker).unwrap();
        assert_eq!(entity.kind(), EntityKind::Walker);
        assert_eq!(pos, Position::new(2, 2));
        assert!(world.was_removed(walker));
        assert!(world.entity(walker).is_none());
        world.verify().unwrap();

        world.begin_tick().unwrap();
        assert!(!world.was_removed(walker));
    }

    #[test]
    fn off_board_spawn_stores_nothing() {
        let mut world = WorldState::new(3, 3).unwrap();
        assert!(world.spawn(Entity::Wall, Position::new(5, 5)).is_err());
        assert!(world.entities().is_empty());
        world.verify().unwrap();
    }

    #[test]
    fn typed_access_reports_wrong_kind() {
        let mut world = WorldState::new(3, 3).unwrap();
        let exit = world
            .spawn(Entity::Exit(Portal { side: Side::Right }), Position::new(1, 1))
            .unwrap();
        assert!(matches!(
            world.player(exit),
            Err(AgentError::WrongKind {
                expected: EntityKind::Player,
                found: EntityKind::Exit,
                ..
            })
        ));
        assert!(matches!(
            world.walker(EntityId::new(99)),
            Err(AgentError::EntityNotFound(_))
        ));
    }

    #[test]
    fn snapshot_reports_flags_and_orientation() {
        let mut world = WorldState::new(5, 5).unwrap();
        let id = world
            .spawn(Entity::Walker(Walker::new(Side::Right, 0.7, 1.0)), Position::new(3, 1))
            .unwrap();
        let snap = world.snapshot();
        let entry = snap.entity(id).unwrap();
        assert_eq!(entry.kind, EntityKind::Walker);
        assert_eq!(entry.orientation, Some(crowdgrid_types::Direction::WEST));
        assert!(!entry.jailed && !entry.crashed);
        assert_eq!((snap.width, snap.height), (5, 5));
    }
}
