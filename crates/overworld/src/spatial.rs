//! # Spatial Index
//!
//! Tile-keyed occupancy with two partitions:
//!
//! ```text
//! static   terrain markers of the active map   rebuilt on invalidation
//! dynamic  movable entities on any map         rebuilt once per tick
//! ```
//!
//! Buckets are never freed. Clearing a partition bumps its generation and a
//! bucket whose stamp is older than the generation reads as empty, so a
//! rebuild reuses every `Vec` it allocated on earlier ticks.

use std::collections::HashMap;

use overworld_core::EntityId;

use crate::grid::TileLocation;

#[derive(Debug, Default)]
struct Bucket {
    stamp: u64,
    ids: Vec<EntityId>,
}

#[derive(Debug)]
struct Partition {
    generation: u64,
    buckets: HashMap<TileLocation, Bucket>,
}

impl Partition {
    fn new() -> Self {
        Self {
            generation: 1,
            buckets: HashMap::new(),
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.generation += 1;
    }

    fn insert(&mut self, location: TileLocation, id: EntityId) {
        let generation = self.generation;
        let bucket = self.buckets.entry(location).or_default();
        if bucket.stamp != generation {
            bucket.ids.clear();
            bucket.stamp = generation;
        }
        bucket.ids.push(id);
    }

    fn remove(&mut self, location: TileLocation, id: EntityId) -> bool {
        let generation = self.generation;
        match self.buckets.get_mut(&location) {
            Some(bucket) if bucket.stamp == generation => {
                let before = bucket.ids.len();
                bucket.ids.retain(|&e| e != id);
                bucket.ids.len() != before
            }
            _ => false,
        }
    }

    #[inline]
    fn get(&self, location: &TileLocation) -> &[EntityId] {
        match self.buckets.get(location) {
            Some(bucket) if bucket.stamp == self.generation => &bucket.ids,
            _ => &[],
        }
    }

    fn live(&self) -> impl Iterator<Item = (TileLocation, &[EntityId])> {
        let generation = self.generation;
        self.buckets
            .iter()
            .filter(move |(_, b)| b.stamp == generation && !b.ids.is_empty())
            .map(|(loc, b)| (*loc, b.ids.as_slice()))
    }
}

/// Read-only view of a tile's occupants across both partitions.
#[derive(Clone, Copy, Debug)]
pub struct Occupants<'a> {
    static_ids: &'a [EntityId],
    dynamic_ids: &'a [EntityId],
}

impl<'a> Occupants<'a> {
    /// Terrain markers on the tile.
    #[must_use]
    pub fn static_ids(&self) -> &'a [EntityId] {
        self.static_ids
    }

    /// Movers on the tile.
    #[must_use]
    pub fn dynamic_ids(&self) -> &'a [EntityId] {
        self.dynamic_ids
    }

    /// Every occupant, terrain first.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + 'a {
        self.static_ids
            .iter()
            .chain(self.dynamic_ids.iter())
            .copied()
    }

    /// Number of occupants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.static_ids.len() + self.dynamic_ids.len()
    }

    /// True if nothing occupies the tile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Occupancy index over static terrain markers and dynamic movers.
#[derive(Debug)]
pub struct SpatialIndex {
    static_part: Partition,
    dynamic_part: Partition,
    static_map: Option<i32>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Empty index with no map indexed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            static_part: Partition::new(),
            dynamic_part: Partition::new(),
            static_map: None,
        }
    }

    /// Clears the static partition and indexes the terrain markers of
    /// `map_id`. Markers on other maps are skipped.
    ///
    /// Takes `&mut self`, so no query can be in flight while indexing.
    pub fn index_static_tiles<I>(&mut self, map_id: i32, markers: I)
    where
        I: IntoIterator<Item = (EntityId, TileLocation)>,
    {
        self.static_part.clear();
        let mut count = 0usize;
        for (id, location) in markers {
            if location.map_id == map_id {
                self.static_part.insert(location, id);
                count += 1;
            }
        }
        self.static_map = Some(map_id);
        tracing::debug!(map_id, markers = count, "static tiles indexed");
    }

    /// Drops the static partition entirely (no active map).
    pub fn clear_static(&mut self) {
        self.static_part.clear();
        self.static_map = None;
    }

    /// Clears the dynamic partition and re-inserts every mover.
    pub fn rebuild_dynamic<I>(&mut self, movers: I)
    where
        I: IntoIterator<Item = (EntityId, TileLocation)>,
    {
        self.dynamic_part.clear();
        for (id, location) in movers {
            self.dynamic_part.insert(location, id);
        }
    }

    /// Moves a single mover between dynamic buckets without a full rebuild.
    pub fn update_dynamic(&mut self, id: EntityId, old: Option<TileLocation>, new: TileLocation) {
        if let Some(old) = old {
            self.dynamic_part.remove(old, id);
        }
        self.dynamic_part.insert(new, id);
    }

    /// Removes a mover from its dynamic bucket.
    pub fn remove_dynamic(&mut self, id: EntityId, location: TileLocation) -> bool {
        self.dynamic_part.remove(location, id)
    }

    /// Occupants of a tile. The static half is empty for any map other
    /// than the indexed one.
    #[must_use]
    pub fn query(&self, location: TileLocation) -> Occupants<'_> {
        let static_ids = if self.static_map == Some(location.map_id) {
            self.static_part.get(&location)
        } else {
            if self.static_map.is_none() {
                tracing::trace!(map_id = location.map_id, "query before static indexing");
            }
            &[]
        };
        Occupants {
            static_ids,
            dynamic_ids: self.dynamic_part.get(&location),
        }
    }

    /// Map whose terrain is currently indexed.
    #[must_use]
    pub const fn indexed_map(&self) -> Option<i32> {
        self.static_map
    }

    /// True if `map_id` is the indexed map.
    #[must_use]
    pub fn is_indexed(&self, map_id: i32) -> bool {
        self.static_map == Some(map_id)
    }

    /// Non-empty static buckets, in no particular order.
    pub fn static_entries(&self) -> impl Iterator<Item = (TileLocation, &[EntityId])> {
        self.static_part.live()
    }

    /// Non-empty dynamic buckets, in no particular order.
    pub fn dynamic_entries(&self) -> impl Iterator<Item = (TileLocation, &[EntityId])> {
        self.dynamic_part.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> EntityId {
        EntityId::new(index, 1)
    }

    #[test]
    fn test_query_unindexed_map_is_empty() {
        let index = SpatialIndex::new();
        assert!(index.query(TileLocation::new(9, 0, 0)).is_empty());
    }

    #[test]
    fn test_static_only_for_indexed_map() {
        let mut index = SpatialIndex::new();
        index.index_static_tiles(
            1,
            [
                (id(0), TileLocation::new(1, 2, 2)),
                (id(1), TileLocation::new(2, 2, 2)),
            ],
        );
        assert_eq!(index.query(TileLocation::new(1, 2, 2)).static_ids(), &[id(0)]);
        assert!(index.query(TileLocation::new(2, 2, 2)).is_empty());
        assert_eq!(index.static_entries().count(), 1);
    }

    #[test]
    fn test_rebuild_dynamic_drops_old_entries() {
        let mut index = SpatialIndex::new();
        index.rebuild_dynamic([(id(3), TileLocation::new(1, 0, 0))]);
        index.rebuild_dynamic([(id(3), TileLocation::new(1, 1, 0))]);

        assert!(index.query(TileLocation::new(1, 0, 0)).is_empty());
        assert_eq!(
            index.query(TileLocation::new(1, 1, 0)).dynamic_ids(),
            &[id(3)]
        );
        assert_eq!(index.dynamic_entries().count(), 1);
    }

    #[test]
    fn test_update_dynamic_moves_bucket() {
        let mut index = SpatialIndex::new();
        let a = TileLocation::new(1, 0, 0);
        let b = TileLocation::new(1, 4, 4);
        index.rebuild_dynamic([(id(0), a), (id(1), a)]);
        index.update_dynamic(id(0), Some(a), b);

        assert_eq!(index.query(a).dynamic_ids(), &[id(1)]);
        assert_eq!(index.query(b).dynamic_ids(), &[id(0)]);
        assert!(index.remove_dynamic(id(0), b));
        assert!(!index.remove_dynamic(id(0), b));
    }

    #[test]
    fn test_occupants_iter_chains_partitions() {
        let mut index = SpatialIndex::new();
        let tile = TileLocation::new(1, 1, 1);
        index.index_static_tiles(1, [(id(0), tile)]);
        index.rebuild_dynamic([(id(5), tile)]);

        let occupants = index.query(tile);
        assert_eq!(occupants.len(), 2);
        assert_eq!(occupants.iter().collect::<Vec<_>>(), vec![id(0), id(5)]);
    }
}
