//! # Tile Maps
//!
//! Static per-tile flags supplied by the map-loading collaborator, plus a
//! decoder for packed map-cell words and metatile behaviour bytes.
//!
//! ## Packed layout
//!
//! ```text
//! map word (u16):  [15..12 elevation][11..10 collision][9..0 metatile id]
//! behaviour (u8):  0x1D..=0x20  jump north / south / west / east (ledge)
//!                  0x15..=0x1C  directional impassable
//!                  0x33         impassable
//! ```

use std::collections::HashMap;

use crate::error::{MovementError, MovementResult};
use crate::grid::{Direction, TileCoord};

/// Collision value in the packed map word that marks a solid cell.
const COLLISION_SOLID: u16 = 3;

/// Behaviour bytes that block movement regardless of collision bits.
const SOLID_BEHAVIORS: [u8; 4] = [0x05, 0x0C, 0x11, 0x33];

/// Static flags for one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileFlags {
    /// Entities may enter the tile.
    pub walkable: bool,
    /// One-way tile entered only in `ledge_jump_direction`.
    pub is_ledge: bool,
    /// Required approach direction for a ledge.
    pub ledge_jump_direction: Option<Direction>,
    /// Height layer, 0-15. Zero means "any level".
    pub elevation: u8,
}

impl TileFlags {
    /// Plain walkable ground.
    pub const OPEN: Self = Self {
        walkable: true,
        is_ledge: false,
        ledge_jump_direction: None,
        elevation: 0,
    };

    /// A wall or any other impassable tile.
    pub const BLOCKED: Self = Self {
        walkable: false,
        is_ledge: false,
        ledge_jump_direction: None,
        elevation: 0,
    };

    /// A ledge that can be jumped when moving in `direction`.
    #[must_use]
    pub const fn ledge(direction: Direction) -> Self {
        Self {
            walkable: true,
            is_ledge: true,
            ledge_jump_direction: Some(direction),
            elevation: 0,
        }
    }

    /// Copy with a different elevation.
    #[must_use]
    pub const fn with_elevation(mut self, elevation: u8) -> Self {
        self.elevation = elevation & 0x0F;
        self
    }

    /// Decodes a packed map-cell word and its metatile behaviour byte.
    #[must_use]
    pub fn from_packed(map_word: u16, behavior: u8) -> Self {
        let collision = (map_word >> 10) & 0x3;
        let elevation = ((map_word >> 12) & 0xF) as u8;

        let jump = match behavior {
            0x1D => Some(Direction::North),
            0x1E => Some(Direction::South),
            0x1F => Some(Direction::West),
            0x20 => Some(Direction::East),
            _ => None,
        };
        let solid_behavior =
            (0x15..=0x1C).contains(&behavior) || SOLID_BEHAVIORS.contains(&behavior);

        Self {
            walkable: collision != COLLISION_SOLID && !solid_behavior,
            is_ledge: jump.is_some(),
            ledge_jump_direction: jump,
            elevation,
        }
    }
}

/// Row-major tile flags for one map.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMap {
    map_id: i32,
    width: i32,
    height: i32,
    flags: Vec<TileFlags>,
}

impl GridMap {
    /// A `width` x `height` map filled with `fill`.
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::InvalidConfig`] for non-positive dimensions.
    pub fn filled(map_id: i32, width: i32, height: i32, fill: TileFlags) -> MovementResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(MovementError::InvalidConfig(format!(
                "map {map_id} has invalid size {width}x{height}"
            )));
        }
        let len = width as usize * height as usize;
        Ok(Self {
            map_id,
            width,
            height,
            flags: vec![fill; len],
        })
    }

    /// A map built from row-major flags.
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::InvalidConfig`] when `flags` does not hold
    /// exactly `width * height` entries.
    pub fn from_flags(
        map_id: i32,
        width: i32,
        height: i32,
        flags: Vec<TileFlags>,
    ) -> MovementResult<Self> {
        if width <= 0 || height <= 0 || flags.len() != width as usize * height as usize {
            return Err(MovementError::InvalidConfig(format!(
                "map {map_id}: {} flags do not fill {width}x{height}",
                flags.len()
            )));
        }
        Ok(Self {
            map_id,
            width,
            height,
            flags,
        })
    }

    /// Decodes a map from packed cell words and a behaviour lookup by
    /// metatile id (lower 10 bits of each word).
    ///
    /// # Errors
    ///
    /// Same as [`GridMap::from_flags`].
    pub fn from_packed(
        map_id: i32,
        width: i32,
        height: i32,
        words: &[u16],
        behavior_of: impl Fn(u16) -> u8,
    ) -> MovementResult<Self> {
        let flags = words
            .iter()
            .map(|&word| TileFlags::from_packed(word, behavior_of(word & 0x3FF)))
            .collect();
        Self::from_flags(map_id, width, height, flags)
    }

    /// Map id.
    #[inline]
    #[must_use]
    pub const fn map_id(&self) -> i32 {
        self.map_id
    }

    /// Width in tiles.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in tiles.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// True if the tile lies on this map.
    #[inline]
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    #[inline]
    fn offset(&self, tile: TileCoord) -> Option<usize> {
        self.contains(tile)
            .then(|| tile.y as usize * self.width as usize + tile.x as usize)
    }

    /// Flags of a tile, `None` off the map.
    #[inline]
    #[must_use]
    pub fn flags(&self, tile: TileCoord) -> Option<&TileFlags> {
        self.offset(tile).and_then(|i| self.flags.get(i))
    }

    /// Overwrites a tile's flags. Returns `false` off the map.
    ///
    /// Callers must invalidate static tiles afterwards.
    pub fn set_flags(&mut self, tile: TileCoord, flags: TileFlags) -> bool {
        match self.offset(tile).and_then(|i| self.flags.get_mut(i)) {
            Some(slot) => {
                *slot = flags;
                true
            }
            None => false,
        }
    }

    /// Iterates every tile with its flags, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, &TileFlags)> {
        let width = self.width;
        self.flags
            .iter()
            .enumerate()
            .map(move |(i, f)| (TileCoord::new(i as i32 % width, i as i32 / width), f))
    }
}

/// Every loaded map, keyed by map id.
#[derive(Debug, Default)]
pub struct TileMaps {
    maps: HashMap<i32, GridMap>,
}

impl TileMaps {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces a map, returning the previous one.
    pub fn insert(&mut self, map: GridMap) -> Option<GridMap> {
        self.maps.insert(map.map_id(), map)
    }

    /// Removes a map.
    pub fn remove(&mut self, map_id: i32) -> Option<GridMap> {
        self.maps.remove(&map_id)
    }

    /// Looks up a map.
    #[inline]
    #[must_use]
    pub fn get(&self, map_id: i32) -> Option<&GridMap> {
        self.maps.get(&map_id)
    }

    /// Looks up a map for editing.
    pub fn get_mut(&mut self, map_id: i32) -> Option<&mut GridMap> {
        self.maps.get_mut(&map_id)
    }

    /// Flags of a tile on any loaded map.
    #[inline]
    #[must_use]
    pub fn flags(&self, map_id: i32, tile: TileCoord) -> Option<&TileFlags> {
        self.get(map_id).and_then(|m| m.flags(tile))
    }

    /// Number of loaded maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// True when no map is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
