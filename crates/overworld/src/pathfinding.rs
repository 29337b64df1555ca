//! # Pathfinding Service
//!
//! Bounded A* over 4-neighbour tile adjacency.
//!
//! - Manhattan heuristic, unit cost per tile travelled
//! - Expansion legality delegated to [`CollisionService::check`]
//! - A correctly approached ledge is a single edge to its landing tile
//! - Ties on `f` go to the node discovered first
//! - More than `node_cap` expansions means "no path"
//!
//! Returned waypoints are smoothed: only turning points, both ends of a
//! ledge jump, and the goal survive. The start tile is never included.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use parking_lot::Mutex;

use crate::collision::CollisionService;
use crate::grid::{Direction, TileCoord, TileLocation};
use crate::service::Callable;

/// Why a search produced no path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathFailure {
    /// Start and goal are on different maps.
    DifferentMap,
    /// The map is not loaded or an endpoint lies off it.
    OutOfBounds,
    /// The open set ran dry.
    Unreachable,
    /// The search expanded more nodes than allowed.
    NodeCapExceeded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    seq: u64,
    g: u32,
    tile: TileCoord,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for a min-heap on (f, seq)
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct SearchScratch {
    open: BinaryHeap<OpenNode>,
    best_g: HashMap<TileCoord, u32>,
    came_from: HashMap<TileCoord, (TileCoord, bool)>,
    trail: Vec<(TileCoord, bool)>,
}

impl SearchScratch {
    fn reset(&mut self) {
        self.open.clear();
        self.best_g.clear();
        self.came_from.clear();
        self.trail.clear();
    }
}

/// A path request against a collision view.
#[derive(Clone, Copy)]
pub struct PathQuery<'r> {
    /// Legality oracle for expansion.
    pub collision: CollisionService<'r>,
    /// Where the walker stands.
    pub start: TileLocation,
    /// Where it wants to go.
    pub goal: TileLocation,
}

/// A* search with reusable scratch buffers.
pub struct Pathfinder {
    node_cap: usize,
    ledge_jump_tiles: i32,
    scratch: Mutex<SearchScratch>,
}

impl Pathfinder {
    /// Creates a pathfinder with the given expansion cap and ledge jump
    /// distance.
    #[must_use]
    pub fn new(node_cap: usize, ledge_jump_tiles: i32) -> Self {
        Self {
            node_cap,
            ledge_jump_tiles,
            scratch: Mutex::new(SearchScratch::default()),
        }
    }

    /// Expansion cap.
    #[must_use]
    pub const fn node_cap(&self) -> usize {
        self.node_cap
    }

    /// Searches from `start` to `goal`, writing smoothed waypoints into
    /// `out`. `out` is empty when `start == goal`.
    ///
    /// # Errors
    ///
    /// Returns the reason no path exists. Failure is a normal outcome.
    pub fn find_into(
        &self,
        collision: &CollisionService<'_>,
        start: TileLocation,
        goal: TileLocation,
        out: &mut Vec<TileCoord>,
    ) -> Result<(), PathFailure> {
        out.clear();
        if start.map_id != goal.map_id {
            return Err(PathFailure::DifferentMap);
        }
        let map = collision
            .maps()
            .get(start.map_id)
            .ok_or(PathFailure::OutOfBounds)?;
        let (from, to) = (start.coord(), goal.coord());
        if !map.contains(from) || !map.contains(to) {
            return Err(PathFailure::OutOfBounds);
        }
        if from == to {
            return Ok(());
        }

        let mut local = None;
        let mut guard = self.scratch.try_lock();
        let scratch = match guard.as_mut() {
            Some(scratch) => &mut **scratch,
            None => local.insert(SearchScratch::default()),
        };
        scratch.reset();

        let result = self.search(collision, start.map_id, from, to, scratch);
        if result.is_ok() {
            Self::smooth(from, &scratch.trail, out);
        }
        result
    }

    fn search(
        &self,
        collision: &CollisionService<'_>,
        map_id: i32,
        start: TileCoord,
        goal: TileCoord,
        scratch: &mut SearchScratch,
    ) -> Result<(), PathFailure> {
        let maps = collision.maps();
        let mut seq = 0u64;
        let mut expanded = 0usize;

        scratch.best_g.insert(start, 0);
        scratch.open.push(OpenNode {
            f: start.manhattan(goal),
            seq,
            g: 0,
            tile: start,
        });

        while let Some(node) = scratch.open.pop() {
            if scratch.best_g.get(&node.tile).is_some_and(|&g| g < node.g) {
                continue;
            }
            if node.tile == goal {
                Self::reconstruct(start, goal, scratch);
                return Ok(());
            }

            expanded += 1;
            if expanded > self.node_cap {
                tracing::debug!(map_id, ?start, ?goal, expanded, "path node cap reached");
                return Err(PathFailure::NodeCapExceeded);
            }

            for direction in Direction::ALL {
                let next = node.tile.neighbor(direction);
                let verdict = collision.check(map_id, node.tile, next, direction);
                if !verdict.allowed {
                    continue;
                }

                let (successor, jumped) = if verdict.ledge_jump.is_some() {
                    let landing = next.step(direction, self.ledge_jump_tiles);
                    if !maps.flags(map_id, landing).is_some_and(|f| f.walkable) {
                        continue;
                    }
                    (landing, true)
                } else {
                    (next, false)
                };

                let g = node.g + node.tile.manhattan(successor);
                if scratch.best_g.get(&successor).is_some_and(|&best| best <= g) {
                    continue;
                }
                scratch.best_g.insert(successor, g);
                scratch.came_from.insert(successor, (node.tile, jumped));
                seq += 1;
                scratch.open.push(OpenNode {
                    f: g + successor.manhattan(goal),
                    seq,
                    g,
                    tile: successor,
                });
            }
        }

        Err(PathFailure::Unreachable)
    }

    fn reconstruct(start: TileCoord, goal: TileCoord, scratch: &mut SearchScratch) {
        let mut current = goal;
        while current != start {
            let Some(&(parent, jumped)) = scratch.came_from.get(&current) else {
                break;
            };
            scratch.trail.push((current, jumped));
            current = parent;
        }
        scratch.trail.reverse();
    }

    /// Keeps the goal, every turning point, and both ends of each jump.
    fn smooth(start: TileCoord, trail: &[(TileCoord, bool)], out: &mut Vec<TileCoord>) {
        let mut previous = start;
        for (i, &(tile, jumped)) in trail.iter().enumerate() {
            let keep = match trail.get(i + 1) {
                None => true,
                Some(&(next, next_jumped)) => {
                    jumped
                        || next_jumped
                        || Direction::toward(previous, tile) != Direction::toward(tile, next)
                }
            };
            if keep {
                out.push(tile);
            }
            previous = tile;
        }
    }
}

impl Callable for Pathfinder {
    type Request<'r> = PathQuery<'r>;
    type Response = Option<Vec<TileCoord>>;

    fn name(&self) -> &'static str {
        "pathfinding"
    }

    fn call(&self, request: Self::Request<'_>) -> Option<Vec<TileCoord>> {
        let mut out = Vec::new();
        self.find_into(&request.collision, request.start, request.goal, &mut out)
            .ok()
            .map(|()| out)
    }
}
