//! Stable entity handles.
//!
//! Entities live in an arena and are referenced by an [`EntityId`] that
//! is never reused within a run. A removed entity leaves a tombstone in
//! its slot, so a stale handle can always be detected instead of
//! silently aliasing a newer entity.

use serde::{Deserialize, Serialize};

/// Unique handle for an entity in the simulation arena.
///
/// Handles are allocated sequentially starting at zero, which also makes
/// them the slot index into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a handle from its raw slot number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw slot number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the slot number as an arena index, if it fits in `usize`.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_raw_value() {
        let id = EntityId::new(17);
        assert_eq!(id.get(), 17);
        assert_eq!(id.index(), Some(17));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(EntityId::new(3).to_string(), "#3");
    }

    #[test]
    fn ordering_follows_allocation() {
        assert!(EntityId::new(1) < EntityId::new(2));
    }
}
