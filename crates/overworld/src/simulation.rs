//! # Simulation
//!
//! Owns the entity store, tile maps, spatial index, movement engine,
//! pathfinder and event bus, and exposes the interface collaborators use.
//!
//! ```text
//! tick(dt):
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. stamp tick on the event bus                                │
//! │ 2. re-index static tiles if invalidated                       │
//! │ 3. movement engine (plan -> commit -> rebuild dynamic)        │
//! │ 4. queue re-plans from blocked routes                         │
//! │ 5. solve pending path requests                                │
//! │ 6. record timing, warn on slow ticks                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use overworld_core::{Component, ComponentMask, EntityId, World};

use crate::collision::{CollisionService, CollisionVerdict};
use crate::components::{
    Body, ComponentStore, Facing, MoveIntent, MovementRoute, MovementSpeed, MovementState, Position,
};
use crate::config::MovementConfig;
use crate::error::{MovementError, MovementResult};
use crate::events::EventBus;
use crate::grid::{Direction, TileCoord, TileLocation};
use crate::map::{GridMap, TileMaps};
use crate::movement::{MovementContext, MovementEngine};
use crate::pathfinding::{PathQuery, Pathfinder};
use crate::service::{Callable, TickDriven};
use crate::spatial::SpatialIndex;
use crate::stats::{TickStats, TickStatsAccumulator};

#[derive(Clone, Copy, Debug)]
struct PathRequest {
    entity: EntityId,
    goal: TileLocation,
    replans_left: u8,
}

/// The tile movement core.
pub struct Simulation {
    config: MovementConfig,
    world: World,
    store: ComponentStore,
    maps: TileMaps,
    active_map: Option<i32>,
    static_dirty: bool,
    index: SpatialIndex,
    engine: MovementEngine,
    pathfinder: Pathfinder,
    path_requests: VecDeque<PathRequest>,
    path_buffer: Vec<TileCoord>,
    bus: Arc<EventBus>,
    tick: u64,
    stats: TickStatsAccumulator,
}

impl Simulation {
    /// Creates a simulation with every storage pre-allocated.
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::InvalidConfig`] if the config does not validate.
    pub fn new(config: MovementConfig) -> MovementResult<Self> {
        config
            .validate()
            .map_err(|e| MovementError::InvalidConfig(e.to_string()))?;

        let capacity = config.entity_capacity;
        Ok(Self {
            world: World::new(capacity),
            store: ComponentStore::new(capacity),
            maps: TileMaps::new(),
            active_map: None,
            static_dirty: false,
            index: SpatialIndex::new(),
            engine: MovementEngine::new(&config),
            pathfinder: Pathfinder::new(config.path_node_cap, config.ledge_jump_tiles),
            path_requests: VecDeque::with_capacity(config.path_request_capacity),
            path_buffer: Vec::new(),
            bus: Arc::new(EventBus::new(config.event_pool_capacity)),
            tick: 0,
            stats: TickStatsAccumulator::new(config.slow_tick_warn_us),
            config,
        })
    }

    // =========================================================================
    // Maps
    // =========================================================================

    /// Installs a map, makes it active and invalidates static tiles.
    pub fn load_map(&mut self, map: GridMap) {
        let map_id = map.map_id();
        tracing::debug!(map_id, width = map.width(), height = map.height(), "map loaded");
        self.maps.insert(map);
        self.active_map = Some(map_id);
        self.invalidate_static_tiles();
    }

    /// Switches the active map without touching the index. The caller must
    /// follow up with [`Simulation::invalidate_static_tiles`].
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::UnknownMap`] if the map was never loaded.
    pub fn set_active_map(&mut self, map_id: i32) -> MovementResult<()> {
        if self.maps.get(map_id).is_none() {
            return Err(MovementError::UnknownMap(map_id));
        }
        self.active_map = Some(map_id);
        Ok(())
    }

    /// Removes a map's tile data.
    pub fn unload_map(&mut self, map_id: i32) -> Option<GridMap> {
        let removed = self.maps.remove(map_id);
        if removed.is_some() && self.active_map == Some(map_id) {
            self.active_map = None;
            self.invalidate_static_tiles();
        }
        removed
    }

    /// Map whose terrain is collision-active.
    #[must_use]
    pub const fn active_map(&self) -> Option<i32> {
        self.active_map
    }

    /// Loaded tile data.
    #[must_use]
    pub fn maps(&self) -> &TileMaps {
        &self.maps
    }

    /// Mutable tile data. Call [`Simulation::invalidate_static_tiles`] after
    /// editing.
    pub fn map_mut(&mut self, map_id: i32) -> Option<&mut GridMap> {
        self.maps.get_mut(map_id)
    }

    /// Marks the static partition stale. It is re-indexed once, before the
    /// next tick or query that needs it; repeated calls are idempotent.
    pub fn invalidate_static_tiles(&mut self) {
        if !self.static_dirty {
            tracing::debug!(map_id = ?self.active_map, "static tiles invalidated");
        }
        self.static_dirty = true;
    }

    fn refresh_static(&mut self) {
        if !self.static_dirty {
            return;
        }
        self.static_dirty = false;

        let Some(map_id) = self.active_map else {
            self.index.clear_static();
            return;
        };
        let mask = ComponentMask::of::<Position>().with::<Body>();
        let store = &self.store;
        self.index.index_static_tiles(
            map_id,
            self.world.query(mask).filter_map(|id| {
                let slot = id.slot();
                let body = store.bodies.get(slot)?;
                if body.movable {
                    return None;
                }
                store.positions.get(slot).map(|p| (id, p.location()))
            }),
        );
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Spawns a mover at `location` with the default speed.
    ///
    /// # Errors
    ///
    /// Fails if the map is unknown, the tile is off the map, or the entity
    /// store is full.
    pub fn spawn_actor(&mut self, location: TileLocation) -> MovementResult<EntityId> {
        self.validate_tile(location)?;
        let id = self.spawn_slot()?;
        let slot = id.slot();

        self.store.positions.set(slot, Position::new(location.map_id, location.x, location.y));
        self.store.states.set(slot, MovementState::Idle);
        self.store.intents.set(slot, MoveIntent::default());
        self.store
            .speeds
            .set(slot, MovementSpeed::new(self.config.default_tiles_per_second));
        self.store.bodies.set(slot, Body::ACTOR);
        self.store.facings.set(slot, Facing::default());

        self.world.attach::<Position>(id);
        self.world.attach::<MovementState>(id);
        self.world.attach::<MoveIntent>(id);
        self.world.attach::<MovementRoute>(id);
        self.world.attach::<MovementSpeed>(id);
        self.world.attach::<Body>(id);
        self.world.attach::<Facing>(id);

        self.index.update_dynamic(id, None, location);
        tracing::trace!(entity = ?id, ?location, "actor spawned");
        Ok(id)
    }

    /// Spawns a terrain marker. Markers never move; solid ones block tiles.
    ///
    /// # Errors
    ///
    /// Same as [`Simulation::spawn_actor`].
    pub fn spawn_static(&mut self, location: TileLocation, body: Body) -> MovementResult<EntityId> {
        debug_assert!(!body.movable, "static markers cannot be movable");
        self.validate_tile(location)?;
        let id = self.spawn_slot()?;
        let slot = id.slot();

        self.store.positions.set(slot, Position::new(location.map_id, location.x, location.y));
        self.store.bodies.set(slot, Body { movable: false, ..body });
        self.world.attach::<Position>(id);
        self.world.attach::<Body>(id);

        if self.active_map == Some(location.map_id) {
            self.invalidate_static_tiles();
        }
        Ok(id)
    }

    /// Removes an entity and its index entries.
    ///
    /// # Errors
    ///
    /// Returns [`MovementError::EntityNotFound`] for dead or stale ids.
    pub fn despawn(&mut self, entity: EntityId) -> MovementResult<()> {
        let slot = self.require::<Position>(entity)?;
        let location = self.store.positions.get(slot).map(Position::location);
        let movable = self.store.bodies.get(slot).is_some_and(|b| b.movable);

        match location {
            Some(location) if movable => {
                self.index.remove_dynamic(entity, location);
            }
            _ => self.invalidate_static_tiles(),
        }
        self.store.reset(slot);
        self.world.despawn(entity);
        Ok(())
    }

    /// Changes a mover's speed. Takes effect from its next move.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities or a non-positive speed.
    pub fn set_speed(&mut self, entity: EntityId, tiles_per_second: f32) -> MovementResult<()> {
        if !(tiles_per_second.is_finite() && tiles_per_second > 0.0) {
            return Err(MovementError::InvalidConfig(format!(
                "speed must be positive, got {tiles_per_second}"
            )));
        }
        let slot = self.require::<MovementSpeed>(entity)?;
        self.store.speeds.set(slot, MovementSpeed::new(tiles_per_second));
        Ok(())
    }

    /// True if the id refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.world.is_alive(entity)
    }

    // =========================================================================
    // Collaborator interface
    // =========================================================================

    /// Arms the entity's move intent. A request made while moving is taken
    /// on arrival, chaining straight into the next move.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities or entities that cannot move.
    pub fn request_move(&mut self, entity: EntityId, direction: Direction) -> MovementResult<()> {
        let slot = self.require::<MoveIntent>(entity)?;
        if let Some(intent) = self.store.intents.get_mut(slot) {
            intent.activate(direction, self.tick);
        }
        Ok(())
    }

    /// Current position, for rendering.
    #[must_use]
    pub fn position(&self, entity: EntityId) -> Option<Position> {
        let slot = self.require::<Position>(entity).ok()?;
        self.store.positions.get(slot).copied()
    }

    /// Overwrites the position, bypassing the state machine. The entity ends
    /// idle with no pending intent or route, and its index entry moves
    /// immediately.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities or maps. An out-of-range tile is a
    /// contract violation: it panics in debug builds and returns
    /// [`MovementError::TileOutOfRange`] otherwise.
    pub fn teleport(&mut self, entity: EntityId, map_id: i32, x: i32, y: i32) -> MovementResult<()> {
        let slot = self.require::<Position>(entity)?;
        let map = self.maps.get(map_id).ok_or(MovementError::UnknownMap(map_id))?;
        let in_range = map.contains(TileCoord::new(x, y));
        debug_assert!(in_range, "teleport target ({x}, {y}) is outside map {map_id}");
        if !in_range {
            return Err(MovementError::TileOutOfRange { map_id, x, y });
        }

        let Some(position) = self.store.positions.get_mut(slot) else {
            return Err(MovementError::EntityNotFound(entity));
        };
        let old = position.location();
        *position = Position::new(map_id, x, y);
        let new = position.location();

        self.store.states.set(slot, MovementState::Idle);
        if let Some(intent) = self.store.intents.get_mut(slot) {
            intent.deactivate();
        }
        if let Some(route) = self.store.routes.get_mut(slot) {
            route.clear();
        }

        if self.store.bodies.get(slot).is_some_and(|b| b.movable) {
            self.index.update_dynamic(entity, Some(old), new);
        } else {
            self.invalidate_static_tiles();
        }
        tracing::debug!(entity = ?entity, from = ?old, to = ?new, "teleported");
        Ok(())
    }

    /// Queues a path search toward `goal`. The route is filled in during a
    /// later tick, or left empty if no path exists. Returns `false` if the
    /// entity cannot follow routes or the queue is full.
    pub fn request_path(&mut self, entity: EntityId, goal: TileLocation) -> bool {
        if self.require::<MovementRoute>(entity).is_err() {
            tracing::debug!(entity = ?entity, "path request for an entity without a route");
            return false;
        }
        if self.path_requests.len() >= self.config.path_request_capacity {
            tracing::warn!(
                entity = ?entity,
                capacity = self.config.path_request_capacity,
                "path request queue full"
            );
            return false;
        }
        self.path_requests.push_back(PathRequest {
            entity,
            goal,
            replans_left: self.config.max_replans,
        });
        true
    }

    /// The event bus, for subscriptions.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickStats {
        let started = Instant::now();
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.bus.set_tick(self.tick);

        if !self.static_dirty && self.active_map.is_some() && self.index.indexed_map() != self.active_map {
            tracing::warn!(
                active = ?self.active_map,
                indexed = ?self.index.indexed_map(),
                "active map changed without invalidating static tiles"
            );
        }
        self.refresh_static();

        let report = self.engine.tick(
            MovementContext {
                world: &self.world,
                store: &mut self.store,
                maps: &self.maps,
                index: &mut self.index,
                bus: &self.bus,
            },
            dt,
        );

        for replan in self.engine.drain_replans() {
            if self.path_requests.len() < self.config.path_request_capacity {
                self.path_requests.push_back(PathRequest {
                    entity: replan.entity,
                    goal: replan.goal,
                    replans_left: replan.replans_left,
                });
            } else {
                tracing::warn!(entity = ?replan.entity, "path request queue full, dropping re-plan");
            }
        }
        let (paths_solved, paths_failed) = self.solve_paths();

        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        if elapsed_us > self.config.slow_tick_warn_us {
            tracing::warn!(
                tick = self.tick,
                elapsed_us,
                movers = report.movers,
                "slow movement tick"
            );
        }

        let stats = TickStats {
            tick: self.tick,
            movers: report.movers,
            parallel: report.parallel,
            moves_started: report.started,
            moves_completed: report.completed,
            moves_blocked: report.blocked,
            moves_cancelled: report.cancelled,
            paths_solved,
            paths_failed,
            elapsed_us,
        };
        self.stats.record(&stats);
        stats
    }

    fn solve_paths(&mut self) -> (u32, u32) {
        let (mut solved, mut failed) = (0, 0);
        let pending = self.path_requests.len();

        for _ in 0..pending {
            let Some(request) = self.path_requests.pop_front() else {
                break;
            };
            if !self.world.is_alive(request.entity) {
                continue;
            }
            let slot = request.entity.slot();
            let Some(position) = self.store.positions.get(slot).copied() else {
                continue;
            };
            let start_tile = match self.store.states.get(slot) {
                Some(MovementState::Moving(step)) => step.to,
                _ => position.tile(),
            };

            let collision = CollisionService::new(&self.maps, &self.index, &self.store.bodies)
                .with_elevation_blocking(self.config.elevation_blocking)
                .for_mover(request.entity);
            let result = self.pathfinder.find_into(
                &collision,
                start_tile.on(position.map_id),
                request.goal,
                &mut self.path_buffer,
            );

            let Some(route) = self.store.routes.get_mut(slot) else {
                continue;
            };
            match result {
                Ok(()) => {
                    route.assign(&self.path_buffer, request.goal);
                    route.replans_left = request.replans_left;
                    solved += 1;
                    tracing::debug!(
                        entity = ?request.entity,
                        goal = ?request.goal,
                        waypoints = self.path_buffer.len(),
                        "path solved"
                    );
                }
                Err(reason) => {
                    route.clear();
                    failed += 1;
                    tracing::debug!(entity = ?request.entity, goal = ?request.goal, ?reason, "no path");
                }
            }
        }
        (solved, failed)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current movement state.
    #[must_use]
    pub fn movement_state(&self, entity: EntityId) -> Option<MovementState> {
        let slot = self.require::<MovementState>(entity).ok()?;
        self.store.states.get(slot).copied()
    }

    /// Current route.
    #[must_use]
    pub fn route(&self, entity: EntityId) -> Option<&MovementRoute> {
        let slot = self.require::<MovementRoute>(entity).ok()?;
        self.store.routes.get(slot)
    }

    /// Last direction faced.
    #[must_use]
    pub fn facing(&self, entity: EntityId) -> Option<Direction> {
        let slot = self.require::<Facing>(entity).ok()?;
        self.store.facings.get(slot).map(|f| f.0)
    }

    /// Suspends route following.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities or entities without a route.
    pub fn pause_route(&mut self, entity: EntityId) -> MovementResult<()> {
        self.set_route_paused(entity, true)
    }

    /// Resumes route following.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities or entities without a route.
    pub fn resume_route(&mut self, entity: EntityId) -> MovementResult<()> {
        self.set_route_paused(entity, false)
    }

    fn set_route_paused(&mut self, entity: EntityId, paused: bool) -> MovementResult<()> {
        let slot = self.require::<MovementRoute>(entity)?;
        if let Some(route) = self.store.routes.get_mut(slot) {
            route.paused = paused;
        }
        Ok(())
    }

    /// Asks the collision service whether the entity could step in
    /// `direction` from where it stands (or is heading).
    ///
    /// # Errors
    ///
    /// Fails for unknown entities.
    pub fn check_move(&mut self, entity: EntityId, direction: Direction) -> MovementResult<CollisionVerdict> {
        let slot = self.require::<Position>(entity)?;
        self.refresh_static();
        let Some(position) = self.store.positions.get(slot).copied() else {
            return Err(MovementError::EntityNotFound(entity));
        };
        let from = match self.store.states.get(slot) {
            Some(MovementState::Moving(step)) => step.to,
            _ => position.tile(),
        };
        let collision = CollisionService::new(&self.maps, &self.index, &self.store.bodies)
            .with_elevation_blocking(self.config.elevation_blocking)
            .for_mover(entity);
        Ok(collision.check(position.map_id, from, from.neighbor(direction), direction))
    }

    /// Runs a path search immediately, without touching any route.
    pub fn find_path(&mut self, start: TileLocation, goal: TileLocation) -> Option<Vec<TileCoord>> {
        self.refresh_static();
        let collision = CollisionService::new(&self.maps, &self.index, &self.store.bodies)
            .with_elevation_blocking(self.config.elevation_blocking);
        self.pathfinder.call(PathQuery {
            collision,
            start,
            goal,
        })
    }

    /// Occupancy index.
    #[must_use]
    pub fn spatial(&self) -> &SpatialIndex {
        &self.index
    }

    /// Live movable entities, in index order.
    pub fn movers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.world
            .query(MovementEngine::mover_mask())
            .filter(move |id| self.store.bodies.get(id.slot()).is_some_and(|b| b.movable))
    }

    /// Pending path requests.
    #[must_use]
    pub fn pending_path_requests(&self) -> usize {
        self.path_requests.len()
    }

    /// Ticks completed.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Accumulated tick statistics.
    #[must_use]
    pub fn stats(&self) -> &TickStatsAccumulator {
        &self.stats
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    fn spawn_slot(&mut self) -> MovementResult<EntityId> {
        let id = self.world.spawn();
        if id.is_null() {
            tracing::warn!(capacity = self.world.capacity(), "entity capacity exhausted");
            return Err(MovementError::CapacityExhausted {
                capacity: self.world.capacity(),
            });
        }
        Ok(id)
    }

    fn validate_tile(&self, location: TileLocation) -> MovementResult<()> {
        let map = self
            .maps
            .get(location.map_id)
            .ok_or(MovementError::UnknownMap(location.map_id))?;
        if !map.contains(location.coord()) {
            return Err(MovementError::TileOutOfRange {
                map_id: location.map_id,
                x: location.x,
                y: location.y,
            });
        }
        Ok(())
    }

    fn require<C: Component>(&self, entity: EntityId) -> MovementResult<usize> {
        if !self.world.is_alive(entity) {
            return Err(MovementError::EntityNotFound(entity));
        }
        if !self.world.has::<C>(entity) {
            let name = std::any::type_name::<C>();
            return Err(MovementError::MissingComponent {
                entity,
                component: name.rsplit("::").next().unwrap_or(name),
            });
        }
        Ok(entity.slot())
    }
}
