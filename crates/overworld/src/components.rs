//! # Movement Components
//!
//! Plain data records attached to movers and static markers. Every mover
//! carries the full set for its whole lifetime: requests toggle flags on
//! [`MoveIntent`] and [`MovementRoute`] instead of attaching or detaching
//! components, so the entity's component mask never changes while it walks.

use overworld_core::{Component, ComponentStorage};

use crate::grid::{Direction, TileCoord, TileLocation};

/// Logical tile position plus the derived render offset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Column (authoritative).
    pub tile_x: i32,
    /// Row (authoritative).
    pub tile_y: i32,
    /// Map the entity is on.
    pub map_id: i32,
    /// Horizontal render offset from the tile origin, in pixels.
    pub pixel_offset_x: f32,
    /// Vertical render offset from the tile origin, in pixels.
    pub pixel_offset_y: f32,
}

impl Component for Position {
    const ID: u8 = 0;
}

impl Position {
    /// A snapped position on `map_id` at `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn new(map_id: i32, x: i32, y: i32) -> Self {
        Self {
            tile_x: x,
            tile_y: y,
            map_id,
            pixel_offset_x: 0.0,
            pixel_offset_y: 0.0,
        }
    }

    /// The map-local tile.
    #[inline]
    #[must_use]
    pub const fn tile(&self) -> TileCoord {
        TileCoord::new(self.tile_x, self.tile_y)
    }

    /// The map-qualified tile.
    #[inline]
    #[must_use]
    pub const fn location(&self) -> TileLocation {
        TileLocation::new(self.map_id, self.tile_x, self.tile_y)
    }

    /// Moves to `tile` and zeroes the pixel offset.
    #[inline]
    pub fn snap_to(&mut self, tile: TileCoord) {
        self.tile_x = tile.x;
        self.tile_y = tile.y;
        self.pixel_offset_x = 0.0;
        self.pixel_offset_y = 0.0;
    }

    /// True when the render offset is exactly zero.
    #[inline]
    #[must_use]
    pub fn is_snapped(&self) -> bool {
        self.pixel_offset_x == 0.0 && self.pixel_offset_y == 0.0
    }
}

/// How an in-flight move was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepKind {
    /// Ordinary one-tile step.
    #[default]
    Walk,
    /// Jump over a ledge tile, landing past it.
    LedgeJump,
}

/// An in-flight tile transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Tile the move started on.
    pub from: TileCoord,
    /// Tile the move ends on.
    pub to: TileCoord,
    /// Seconds spent so far, within `[0, duration]`.
    pub elapsed: f32,
    /// Total seconds for the move.
    pub duration: f32,
    /// Direction of travel.
    pub direction: Direction,
    /// Direction the sprite faces while moving.
    pub facing: Direction,
    /// Walk or ledge jump.
    pub kind: StepKind,
}

impl Step {
    /// Fraction of the move completed, clamped to `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Interpolated pixel offset relative to `from`.
    #[must_use]
    pub fn pixel_offset(&self, tile_size: f32) -> (f32, f32) {
        let t = self.progress();
        let dx = (self.to.x - self.from.x) as f32;
        let dy = (self.to.y - self.from.y) as f32;
        (dx * tile_size * t, dy * tile_size * t)
    }
}

/// Per-entity movement state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum MovementState {
    /// At rest on a tile; the pixel offset is zero.
    #[default]
    Idle,
    /// Travelling between two tiles.
    Moving(Step),
}

impl Component for MovementState {
    const ID: u8 = 1;
}

impl MovementState {
    /// True when at rest.
    #[inline]
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, MovementState::Idle)
    }

    /// The in-flight move, if any.
    #[inline]
    #[must_use]
    pub const fn step(&self) -> Option<&Step> {
        match self {
            MovementState::Moving(step) => Some(step),
            MovementState::Idle => None,
        }
    }
}

/// A single-step move request, permanently attached and flag-toggled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveIntent {
    /// Whether a request is pending.
    pub active: bool,
    /// Requested direction.
    pub requested_direction: Direction,
    /// Tick at which the request was made.
    pub queued_at: u64,
}

impl Component for MoveIntent {
    const ID: u8 = 2;
}

impl MoveIntent {
    /// Arms the intent. A later request overwrites an earlier pending one.
    #[inline]
    pub fn activate(&mut self, direction: Direction, tick: u64) {
        self.active = true;
        self.requested_direction = direction;
        self.queued_at = tick;
    }

    /// Disarms the intent, keeping the record for reuse.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Waypoints produced by the pathfinder and consumed by the movement engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovementRoute {
    /// Turning points of the route, ending at the goal.
    pub waypoints: Vec<TileCoord>,
    /// Index of the waypoint currently being walked towards.
    pub cursor: usize,
    /// Suspends route following without discarding it.
    pub paused: bool,
    /// Destination the route was planned for.
    pub goal: Option<TileLocation>,
    /// Automatic re-plans left after a blocked waypoint.
    pub replans_left: u8,
}

impl Component for MovementRoute {
    const ID: u8 = 3;
}

impl MovementRoute {
    /// True when there is nothing left to walk.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.waypoints.len()
    }

    /// Waypoint currently targeted.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<TileCoord> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Waypoints not yet reached.
    #[must_use]
    pub fn remaining(&self) -> &[TileCoord] {
        self.waypoints.get(self.cursor..).unwrap_or(&[])
    }

    /// Replaces the route, reusing the waypoint buffer.
    pub fn assign(&mut self, waypoints: &[TileCoord], goal: TileLocation) {
        self.waypoints.clear();
        self.waypoints.extend_from_slice(waypoints);
        self.cursor = 0;
        self.goal = Some(goal);
    }

    /// Drops the waypoints but keeps the goal and buffer.
    pub fn invalidate(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
    }

    /// Forgets the route entirely.
    pub fn clear(&mut self) {
        self.invalidate();
        self.goal = None;
        self.paused = false;
        self.replans_left = 0;
    }
}

/// Movement speed in tiles per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementSpeed {
    /// Tiles travelled per second.
    pub tiles_per_second: f32,
}

impl Component for MovementSpeed {
    const ID: u8 = 4;
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self {
            tiles_per_second: 4.0,
        }
    }
}

impl MovementSpeed {
    /// Creates a speed.
    #[must_use]
    pub const fn new(tiles_per_second: f32) -> Self {
        Self { tiles_per_second }
    }

    /// Seconds needed to cross `tiles` tiles.
    #[inline]
    #[must_use]
    pub fn duration_for(&self, tiles: u32) -> f32 {
        tiles as f32 / self.tiles_per_second
    }
}

/// Collision body of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Body {
    /// Blocks other entities from entering its tile.
    pub solid: bool,
    /// Indexed in the dynamic partition and driven by the movement engine.
    pub movable: bool,
}

impl Component for Body {
    const ID: u8 = 5;
}

impl Body {
    /// A solid mover (actor).
    pub const ACTOR: Self = Self {
        solid: true,
        movable: true,
    };

    /// A solid terrain marker (sign, tree, boulder).
    pub const OBSTACLE: Self = Self {
        solid: true,
        movable: false,
    };

    /// A non-blocking terrain marker (flowers, tall grass).
    pub const DECORATION: Self = Self {
        solid: false,
        movable: false,
    };
}

/// Last direction the entity faced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Facing(pub Direction);

impl Component for Facing {
    const ID: u8 = 6;
}

/// Dense storages for every movement component, indexed by entity slot.
pub struct ComponentStore {
    /// Positions of movers and static markers.
    pub positions: ComponentStorage<Position>,
    /// Movement state machines.
    pub states: ComponentStorage<MovementState>,
    /// Pending single-step requests.
    pub intents: ComponentStorage<MoveIntent>,
    /// Pathfinder routes.
    pub routes: ComponentStorage<MovementRoute>,
    /// Movement speeds.
    pub speeds: ComponentStorage<MovementSpeed>,
    /// Collision bodies.
    pub bodies: ComponentStorage<Body>,
    /// Facing directions.
    pub facings: ComponentStorage<Facing>,
}

impl ComponentStore {
    /// Allocates every storage with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: ComponentStorage::new(capacity),
            states: ComponentStorage::new(capacity),
            intents: ComponentStorage::new(capacity),
            routes: ComponentStorage::new(capacity),
            speeds: ComponentStorage::new(capacity),
            bodies: ComponentStorage::new(capacity),
            facings: ComponentStorage::new(capacity),
        }
    }

    /// Restores every component of a slot to its default.
    pub fn reset(&mut self, slot: usize) {
        self.positions.reset(slot);
        self.states.reset(slot);
        self.intents.reset(slot);
        // keep the waypoint buffer for the next occupant of this slot
        if let Some(route) = self.routes.get_mut(slot) {
            route.clear();
        }
        self.speeds.reset(slot);
        self.bodies.reset(slot);
        self.facings.reset(slot);
    }
}
