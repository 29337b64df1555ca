//! # ECS World
//!
//! Entity slot bookkeeping for the state store. Component data lives in
//! [`ComponentStorage`](super::ComponentStorage)s owned by the consumer; the
//! world tracks liveness, generations and which components each slot carries.

use super::component::{Component, ComponentMask};
use super::entity::{Entity, EntityId};

/// Fixed-capacity entity container.
///
/// All memory is pre-allocated at creation. Spawning and despawning reuse
/// slots through a free list, bumping the slot generation so stale ids are
/// rejected.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(1024);
/// let id = world.spawn();
/// world.attach::<Position>(id);
/// for id in world.query(ComponentMask::of::<Position>()) { /* ... */ }
/// ```
pub struct World {
    entities: Box<[Entity]>,
    free_indices: Vec<u32>,
    alive_count: usize,
}

impl World {
    /// Creates a world with the specified entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );

        let entities = vec![Entity::dead(0); capacity].into_boxed_slice();
        // Reversed so the lowest index is handed out first.
        let free_indices: Vec<u32> = (0..capacity as u32).rev().collect();

        Self {
            entities,
            free_indices,
            alive_count: 0,
        }
    }

    /// Maximum number of simultaneously alive entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Spawns a new entity, returning its ID, or `EntityId::NULL` when full.
    #[inline]
    pub fn spawn(&mut self) -> EntityId {
        let Some(index) = self.free_indices.pop() else {
            return EntityId::NULL;
        };

        let slot = &mut self.entities[index as usize];
        let generation = slot.id.generation().wrapping_add(1);
        let id = EntityId::new(index, generation);
        *slot = Entity::new(id);
        self.alive_count += 1;
        id
    }

    /// Despawns an entity. Returns `false` for dead, stale or null ids.
    ///
    /// Component storages are not touched; callers reset their own slots.
    #[inline]
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }

        let slot = &mut self.entities[id.slot()];
        *slot = Entity::dead(id.generation());
        self.alive_count -= 1;
        self.free_indices.push(id.index());
        true
    }

    /// Checks if an id refers to a currently alive entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        if id.is_null() {
            return false;
        }
        self.entities
            .get(id.slot())
            .is_some_and(|e| e.alive && e.id.generation() == id.generation())
    }

    /// Gets an entity slot by id (None if dead or stale).
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.is_alive(id) {
            return None;
        }
        Some(&self.entities[id.slot()])
    }

    /// Gets a mutable entity slot by id (None if dead or stale).
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.is_alive(id) {
            return None;
        }
        Some(&mut self.entities[id.slot()])
    }

    /// Marks component `C` as attached to `id`.
    #[inline]
    pub fn attach<C: Component>(&mut self, id: EntityId) -> bool {
        match self.get_mut(id) {
            Some(entity) => {
                entity.add_component(C::ID);
                true
            }
            None => false,
        }
    }

    /// Marks component `C` as detached from `id`.
    #[inline]
    pub fn detach<C: Component>(&mut self, id: EntityId) -> bool {
        match self.get_mut(id) {
            Some(entity) => {
                entity.remove_component(C::ID);
                true
            }
            None => false,
        }
    }

    /// Checks whether `id` is alive and carries component `C`.
    #[inline]
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|e| e.has_component(C::ID))
    }

    /// Iterates over ids of alive entities carrying every component in `mask`,
    /// in ascending slot order.
    pub fn query(&self, mask: ComponentMask) -> impl Iterator<Item = EntityId> + '_ {
        let bits = mask.bits();
        self.entities
            .iter()
            .filter(move |e| e.alive && e.has_all(bits))
            .map(|e| e.id)
    }
}
