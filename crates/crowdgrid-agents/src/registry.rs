//! Arena of entities addressed by stable handles.
//!
//! Removing an entity leaves a tombstone in its slot. Handles are never
//! reused, so a handle held across a removal resolves to `None` instead
//! of silently naming a different entity.

use crowdgrid_types::EntityId;

use crate::entity::Entity;

/// Slot arena of [`Entity`] values.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    slots: Vec<Option<Entity>>,
    live: usize,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Store an entity and return its new handle.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new(u64::try_from(self.slots.len()).unwrap_or(u64::MAX));
        self.slots.push(Some(entity));
        self.live = self.live.saturating_add(1);
        id
    }

    /// Borrow a live entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        id.index()
            .and_then(|idx| self.slots.get(idx))
            .and_then(Option::as_ref)
    }

    /// Mutably borrow a live entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        id.index()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(Option::as_mut)
    }

    /// Tombstone an entity and return its final state.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let removed = id
            .index()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(Option::take);
        if removed.is_some() {
            self.live = self.live.saturating_sub(1);
        }
        removed
    }

    /// Whether `id` names a live entity.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entities.
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Whether no entity is live.
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live entities in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let entity = slot.as_ref()?;
            let raw = u64::try_from(idx).ok()?;
            Some((EntityId::new(raw), entity))
        })
    }
}
