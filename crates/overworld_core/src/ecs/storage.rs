//! # Component Storage
//!
//! Pre-allocated, dense component storage with zero runtime allocations.
//!
//! - All component slots are pre-allocated at creation
//! - Access is O(1) via entity slot index
//! - Iteration is cache-friendly (contiguous memory)

use super::component::Component;

/// Pre-allocated storage for a single component type.
///
/// Slots are addressed by [`crate::EntityId::slot`]. Whether a slot is
/// meaningful is tracked by the owning world's component mask, not here.
pub struct ComponentStorage<C: Component> {
    data: Box<[C]>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates storage with every slot set to `C::default()`.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            data: vec![C::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Gets a component by slot index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Gets a mutable component by slot index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Overwrites the slot in place. Returns `false` if out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> bool {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = component;
            true
        } else {
            false
        }
    }

    /// Resets a slot to its default value.
    #[inline]
    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = C::default();
        }
    }
}
