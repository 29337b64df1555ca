//! # Collision Service
//!
//! Pure query facade over tile flags and spatial occupancy. Answers one
//! question: may an entity enter tile `to` from `from` moving in `direction`.
//!
//! ```text
//! 1. target flags      not walkable / off map    -> Impassable
//! 2. ledge             wrong approach            -> WrongLedgeApproach
//! 3. elevation (opt)   both non-zero, different  -> ElevationMismatch
//! 4. occupancy         other solid body on target -> EntityOccupied
//! 5. allowed (ledge_jump set when 2 matched)
//! ```

use overworld_core::{ComponentStorage, EntityId};

use crate::components::Body;
use crate::grid::{Direction, TileCoord};
use crate::map::TileMaps;
use crate::service::Callable;
use crate::spatial::SpatialIndex;

/// Why a move was refused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// Target tile is not walkable or does not exist.
    #[default]
    Impassable,
    /// Target is a ledge approached from the wrong side.
    WrongLedgeApproach,
    /// A solid entity stands on (or is headed to) the target tile.
    EntityOccupied,
    /// Source and target elevations differ.
    ElevationMismatch,
}

/// Outcome of a collision check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionVerdict {
    /// Whether the move may proceed.
    pub allowed: bool,
    /// Set when `allowed` is false.
    pub reason: Option<BlockReason>,
    /// Set when the target is a ledge entered in its jump direction.
    pub ledge_jump: Option<Direction>,
}

impl CollisionVerdict {
    /// Plain allowed step.
    pub const ALLOWED: Self = Self {
        allowed: true,
        reason: None,
        ledge_jump: None,
    };

    /// Allowed move that turns into a ledge jump.
    #[must_use]
    pub const fn jump(direction: Direction) -> Self {
        Self {
            allowed: true,
            reason: None,
            ledge_jump: Some(direction),
        }
    }

    /// Refused move.
    #[must_use]
    pub const fn blocked(reason: BlockReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            ledge_jump: None,
        }
    }
}

/// A single collision query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveQuery {
    /// Map both tiles are on.
    pub map_id: i32,
    /// Tile the entity leaves.
    pub from: TileCoord,
    /// Tile the entity wants to enter.
    pub to: TileCoord,
    /// Direction of travel.
    pub direction: Direction,
}

/// Stateless collision checks over borrowed simulation state.
#[derive(Clone, Copy)]
pub struct CollisionService<'a> {
    maps: &'a TileMaps,
    index: &'a SpatialIndex,
    bodies: &'a ComponentStorage<Body>,
    elevation_blocking: bool,
    mover: Option<EntityId>,
}

impl<'a> CollisionService<'a> {
    /// Creates a service view.
    #[must_use]
    pub fn new(maps: &'a TileMaps, index: &'a SpatialIndex, bodies: &'a ComponentStorage<Body>) -> Self {
        Self {
            maps,
            index,
            bodies,
            elevation_blocking: false,
            mover: None,
        }
    }

    /// View that asks on behalf of `mover`. The mover's own index entries
    /// never block it, including the stale one it left behind on arrival.
    #[must_use]
    pub const fn for_mover(mut self, mover: EntityId) -> Self {
        self.mover = Some(mover);
        self
    }

    /// Enables the elevation rule.
    #[must_use]
    pub const fn with_elevation_blocking(mut self, enabled: bool) -> Self {
        self.elevation_blocking = enabled;
        self
    }

    /// Tile data this service reads.
    #[must_use]
    pub const fn maps(&self) -> &'a TileMaps {
        self.maps
    }

    /// Checks whether `to` may be entered from `from` moving in `direction`.
    #[must_use]
    pub fn check(
        &self,
        map_id: i32,
        from: TileCoord,
        to: TileCoord,
        direction: Direction,
    ) -> CollisionVerdict {
        let Some(target) = self.maps.flags(map_id, to) else {
            return CollisionVerdict::blocked(BlockReason::Impassable);
        };
        if !target.walkable {
            return CollisionVerdict::blocked(BlockReason::Impassable);
        }

        let mut ledge_jump = None;
        if target.is_ledge {
            if target.ledge_jump_direction != Some(direction) {
                return CollisionVerdict::blocked(BlockReason::WrongLedgeApproach);
            }
            ledge_jump = Some(direction);
        } else if self.elevation_blocking {
            if let Some(source) = self.maps.flags(map_id, from) {
                if source.elevation != 0 && target.elevation != 0 && source.elevation != target.elevation {
                    return CollisionVerdict::blocked(BlockReason::ElevationMismatch);
                }
            }
        }

        if self.is_occupied(map_id, to) {
            return CollisionVerdict::blocked(BlockReason::EntityOccupied);
        }

        match ledge_jump {
            Some(direction) => CollisionVerdict::jump(direction),
            None => CollisionVerdict::ALLOWED,
        }
    }

    /// True if a solid entity other than the mover is indexed on the tile.
    #[must_use]
    pub fn is_occupied(&self, map_id: i32, tile: TileCoord) -> bool {
        self.index
            .query(tile.on(map_id))
            .iter()
            .filter(|&id| Some(id) != self.mover)
            .any(|id| self.bodies.get(id.slot()).is_some_and(|b| b.solid))
    }
}

impl Callable for CollisionService<'_> {
    type Request<'r> = MoveQuery;
    type Response = CollisionVerdict;

    fn name(&self) -> &'static str {
        "collision"
    }

    fn call(&self, request: Self::Request<'_>) -> CollisionVerdict {
        self.check(request.map_id, request.from, request.to, request.direction)
    }
}
