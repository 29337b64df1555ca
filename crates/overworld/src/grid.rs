//! # Grid Primitives
//!
//! Tile coordinates, map-qualified tile locations and the four movement
//! directions. Screen convention: `x` grows east, `y` grows south.

use serde::{Deserialize, Serialize};

/// One of the four grid directions. Diagonal movement does not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards negative `y`.
    North,
    /// Towards positive `x`.
    East,
    /// Towards positive `y`.
    #[default]
    South,
    /// Towards negative `x`.
    West,
}

impl Direction {
    /// All directions in neighbour expansion order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit tile offset for one step in this direction.
    #[inline]
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The direction pointing the other way.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction of the first axis on which `to` differs from `from`,
    /// checking `x` before `y`. `None` if the tiles are equal.
    #[must_use]
    pub fn toward(from: TileCoord, to: TileCoord) -> Option<Self> {
        if to.x > from.x {
            Some(Direction::East)
        } else if to.x < from.x {
            Some(Direction::West)
        } else if to.y > from.y {
            Some(Direction::South)
        } else if to.y < from.y {
            Some(Direction::North)
        } else {
            None
        }
    }
}

/// A tile position on a single map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TileCoord {
    /// Creates a coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile `tiles` steps away in `direction`.
    #[inline]
    #[must_use]
    pub const fn step(self, direction: Direction, tiles: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx * tiles,
            y: self.y + dy * tiles,
        }
    }

    /// The adjacent tile in `direction`.
    #[inline]
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        self.step(direction, 1)
    }

    /// Manhattan distance in tiles.
    #[inline]
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Qualifies this coordinate with a map id.
    #[inline]
    #[must_use]
    pub const fn on(self, map_id: i32) -> TileLocation {
        TileLocation {
            map_id,
            x: self.x,
            y: self.y,
        }
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A tile on a specific map: the spatial index bucket key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileLocation {
    /// Map the tile belongs to.
    pub map_id: i32,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TileLocation {
    /// Creates a location.
    #[inline]
    #[must_use]
    pub const fn new(map_id: i32, x: i32, y: i32) -> Self {
        Self { map_id, x, y }
    }

    /// The map-local coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(self) -> TileCoord {
        TileCoord {
            x: self.x,
            y: self.y,
        }
    }
}
