//! # Entity Management
//!
//! Entities are opaque identifiers made of:
//! - An index into component arrays
//! - A generation counter that invalidates ids of despawned entities

use std::fmt;

/// Opaque identifier for an entity.
///
/// Lower 32 bits hold the slot index, upper 32 bits the generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an entity ID from a slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Slot index into component storages.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation of the slot when this id was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Slot index widened for storage lookups.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.index() as usize
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("EntityId(null)")
        } else {
            write!(f, "EntityId({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Entity slot: id, attached-component mask and liveness.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    /// The identifier currently issued for this slot.
    pub id: EntityId,
    /// Bitmask of attached components (up to 64 component types).
    pub component_mask: u64,
    /// Whether this slot is currently alive.
    pub alive: bool,
}

impl Entity {
    /// Creates a live slot with no components.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            component_mask: 0,
            alive: true,
        }
    }

    /// Creates a dead slot that remembers the last generation issued.
    #[inline]
    #[must_use]
    pub const fn dead(last_generation: u32) -> Self {
        Self {
            id: EntityId::new(0, last_generation),
            component_mask: 0,
            alive: false,
        }
    }

    /// Checks if this slot has a specific component.
    #[inline]
    #[must_use]
    pub const fn has_component(self, component_id: u8) -> bool {
        (self.component_mask & (1 << component_id)) != 0
    }

    /// Checks if this slot carries every component in `mask`.
    #[inline]
    #[must_use]
    pub const fn has_all(self, mask: u64) -> bool {
        self.component_mask & mask == mask
    }

    /// Marks a component as attached.
    #[inline]
    pub fn add_component(&mut self, component_id: u8) {
        self.component_mask |= 1 << component_id;
    }

    /// Marks a component as detached.
    #[inline]
    pub fn remove_component(&mut self, component_id: u8) {
        self.component_mask &= !(1 << component_id);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::dead(0)
    }
}
