//! # Movement Engine
//!
//! Per-entity tile state machine, advanced once per tick in two phases:
//!
//! ```text
//! Phase 1  plan      read-only, per entity, parallel above the threshold
//!          ├─ advance elapsed, detect arrival
//!          └─ pick the next attempt (intent first, then route) + collision
//!
//! Phase 2  commit    serial, entity index order
//!          ├─ arrival: snap, MoveCompleted
//!          ├─ same-tick reservation check
//!          ├─ allowed: rent MoveStarted, publish, read `cancelled`, return
//!          └─ blocked: MoveBlocked, invalidate route, queue re-plan
//!
//! Then     rebuild the dynamic spatial partition once
//! ```
//!
//! An arrival with a pending attempt goes straight back into `Moving`
//! within the same commit, so continuous input never renders an idle frame.

use std::collections::HashSet;

use overworld_core::{ComponentMask, EntityId, World};
use rayon::prelude::*;

use crate::collision::{BlockReason, CollisionService, CollisionVerdict};
use crate::components::{
    Body, ComponentStore, MoveIntent, MovementRoute, MovementSpeed, MovementState, Position, Step,
    StepKind,
};
use crate::config::MovementConfig;
use crate::events::{EventBus, MoveBlocked, MoveCompleted, MoveStarted};
use crate::grid::{Direction, TileCoord, TileLocation};
use crate::map::TileMaps;
use crate::service::TickDriven;
use crate::spatial::SpatialIndex;

/// Float slack when comparing accumulated time against a move's duration.
const ARRIVAL_EPSILON: f32 = 1e-4;

/// Borrowed simulation state for one engine tick.
pub struct MovementContext<'a> {
    /// Entity liveness and component masks.
    pub world: &'a World,
    /// Component data.
    pub store: &'a mut ComponentStore,
    /// Static tile flags.
    pub maps: &'a TileMaps,
    /// Occupancy index; its dynamic partition is rebuilt at the end.
    pub index: &'a mut SpatialIndex,
    /// Event delivery.
    pub bus: &'a EventBus,
}

/// Counters for one engine tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementReport {
    /// Movable entities processed.
    pub movers: usize,
    /// Whether planning ran on the worker pool.
    pub parallel: bool,
    /// Moves committed.
    pub started: u32,
    /// Arrivals.
    pub completed: u32,
    /// Refused attempts.
    pub blocked: u32,
    /// Moves vetoed by a `MoveStarted` handler.
    pub cancelled: u32,
}

/// A route whose next waypoint became blocked and should be planned again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplanRequest {
    /// Walker.
    pub entity: EntityId,
    /// Original destination.
    pub goal: TileLocation,
    /// Re-plans left after this one.
    pub replans_left: u8,
}

#[derive(Clone, Copy, Debug)]
struct Settings {
    tile_size: f32,
    parallel_threshold: usize,
    ledge_jump_tiles: i32,
    elevation_blocking: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepSource {
    Intent,
    Route,
}

#[derive(Clone, Copy, Debug)]
struct Attempt {
    source: StepSource,
    from: TileCoord,
    target: TileCoord,
    landing: TileCoord,
    direction: Direction,
    verdict: CollisionVerdict,
}

#[derive(Clone, Copy, Debug)]
enum Advance {
    Idle,
    InFlight(Step),
    Arrived { step: Step, leftover: f32 },
}

#[derive(Clone, Copy, Debug)]
struct Plan {
    id: EntityId,
    advance: Advance,
    route_cursor: Option<usize>,
    route_done: bool,
    attempt: Option<Attempt>,
}

impl Plan {
    const fn pending(id: EntityId) -> Self {
        Self {
            id,
            advance: Advance::Idle,
            route_cursor: None,
            route_done: false,
            attempt: None,
        }
    }
}

/// Drives every mover's [`MovementState`].
pub struct MovementEngine {
    settings: Settings,
    plans: Vec<Plan>,
    reserved: HashSet<TileLocation>,
    replans: Vec<ReplanRequest>,
}

impl MovementEngine {
    /// Creates an engine with empty scratch buffers.
    #[must_use]
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            settings: Settings {
                tile_size: config.tile_size_px,
                parallel_threshold: config.parallel_threshold,
                ledge_jump_tiles: config.ledge_jump_tiles,
                elevation_blocking: config.elevation_blocking,
            },
            plans: Vec::new(),
            reserved: HashSet::new(),
            replans: Vec::new(),
        }
    }

    /// Components every mover carries.
    #[must_use]
    pub const fn mover_mask() -> ComponentMask {
        ComponentMask::of::<Position>()
            .with::<MovementState>()
            .with::<MoveIntent>()
            .with::<MovementRoute>()
            .with::<MovementSpeed>()
            .with::<Body>()
    }

    /// Takes the re-plan requests queued by blocked routes.
    pub fn drain_replans(&mut self) -> std::vec::Drain<'_, ReplanRequest> {
        self.replans.drain(..)
    }

    fn plan_all(&mut self, ctx: &MovementContext<'_>, dt: f32) -> bool {
        let settings = self.settings;
        let store: &ComponentStore = &*ctx.store;
        let collision = CollisionService::new(ctx.maps, &*ctx.index, &store.bodies)
            .with_elevation_blocking(settings.elevation_blocking);

        let parallel = self.plans.len() > settings.parallel_threshold;
        if parallel {
            self.plans.par_iter_mut().for_each(|plan| {
                *plan = plan_entity(plan.id, store, &collision, settings, dt);
            });
        } else {
            for plan in &mut self.plans {
                *plan = plan_entity(plan.id, store, &collision, settings, dt);
            }
        }
        parallel
    }

    fn commit_all(&mut self, ctx: &mut MovementContext<'_>, dt: f32, report: &mut MovementReport) {
        self.reserved.clear();
        for plan in &self.plans {
            let target = match plan.advance {
                Advance::InFlight(step) | Advance::Arrived { step, .. } => step.to,
                Advance::Idle => continue,
            };
            if let Some(position) = ctx.store.positions.get(plan.id.slot()) {
                self.reserved.insert(target.on(position.map_id));
            }
        }

        for i in 0..self.plans.len() {
            let plan = self.plans[i];
            let slot = plan.id.slot();
            let Some(map_id) = ctx.store.positions.get(slot).map(|p| p.map_id) else {
                continue;
            };

            let (carry, from_idle) = match plan.advance {
                Advance::InFlight(step) => {
                    self.set_moving(ctx.store, slot, step);
                    continue;
                }
                Advance::Arrived { step, leftover } => {
                    arrive(ctx, plan.id, map_id, &step);
                    report.completed += 1;
                    (leftover, false)
                }
                Advance::Idle => (dt, true),
            };

            if let Some(route) = ctx.store.routes.get_mut(slot) {
                if let Some(cursor) = plan.route_cursor {
                    route.cursor = cursor;
                }
                if plan.route_done {
                    tracing::trace!(entity = ?plan.id, "route finished");
                    route.clear();
                }
            }

            if let Some(attempt) = plan.attempt {
                self.commit_attempt(ctx, plan.id, map_id, attempt, carry, from_idle, report);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_attempt(
        &mut self,
        ctx: &mut MovementContext<'_>,
        id: EntityId,
        map_id: i32,
        attempt: Attempt,
        carry: f32,
        from_idle: bool,
        report: &mut MovementReport,
    ) {
        let slot = id.slot();
        let mut verdict = attempt.verdict;
        if verdict.allowed
            && (self.reserved.contains(&attempt.target.on(map_id))
                || self.reserved.contains(&attempt.landing.on(map_id)))
        {
            verdict = CollisionVerdict::blocked(BlockReason::EntityOccupied);
        }

        if attempt.source == StepSource::Intent {
            if let Some(intent) = ctx.store.intents.get_mut(slot) {
                intent.deactivate();
            }
        }
        if let Some(facing) = ctx.store.facings.get_mut(slot) {
            facing.0 = attempt.direction;
        }

        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_default();
            ctx.bus.notify::<MoveBlocked, _>(|e| {
                e.configure(id, map_id, attempt.from, attempt.target, attempt.direction, reason);
            });
            report.blocked += 1;
            if attempt.source == StepSource::Route {
                self.invalidate_route(ctx.store, id);
            }
            return;
        }

        let cancelled = {
            let mut started = ctx.bus.rent::<MoveStarted>();
            started.configure(
                id,
                map_id,
                attempt.from,
                attempt.landing,
                attempt.direction,
                verdict.ledge_jump,
            );
            ctx.bus.publish(&mut *started);
            started.cancelled
        };
        if cancelled {
            tracing::trace!(entity = ?id, direction = ?attempt.direction, "move cancelled by handler");
            report.cancelled += 1;
            return;
        }

        let kind = if verdict.ledge_jump.is_some() {
            if !ctx.maps.flags(map_id, attempt.landing).is_some_and(|f| f.walkable) {
                tracing::warn!(entity = ?id, map_id, landing = ?attempt.landing, "ledge jump lands on a tile that is not walkable");
            }
            StepKind::LedgeJump
        } else {
            StepKind::Walk
        };
        let speed = ctx.store.speeds.get(slot).copied().unwrap_or_default();
        let tiles = match kind {
            StepKind::LedgeJump => self.settings.ledge_jump_tiles.unsigned_abs(),
            StepKind::Walk => 1,
        };
        let duration = speed.duration_for(tiles);
        let step = Step {
            from: attempt.from,
            to: attempt.landing,
            elapsed: carry.min(duration),
            duration,
            direction: attempt.direction,
            facing: attempt.direction,
            kind,
        };
        self.reserved.insert(attempt.landing.on(map_id));
        report.started += 1;

        if from_idle && step.elapsed + ARRIVAL_EPSILON >= step.duration {
            arrive(ctx, id, map_id, &step);
            report.completed += 1;
        } else {
            self.set_moving(ctx.store, slot, step);
        }
    }

    fn set_moving(&self, store: &mut ComponentStore, slot: usize, step: Step) {
        store.states.set(slot, MovementState::Moving(step));
        if let Some(position) = store.positions.get_mut(slot) {
            let (x, y) = step.pixel_offset(self.settings.tile_size);
            position.pixel_offset_x = x;
            position.pixel_offset_y = y;
        }
    }

    fn invalidate_route(&mut self, store: &mut ComponentStore, id: EntityId) {
        let Some(route) = store.routes.get_mut(id.slot()) else {
            return;
        };
        route.invalidate();
        match route.goal {
            Some(goal) if route.replans_left > 0 => {
                route.replans_left -= 1;
                self.replans.push(ReplanRequest {
                    entity: id,
                    goal,
                    replans_left: route.replans_left,
                });
                tracing::debug!(entity = ?id, ?goal, "route blocked, re-planning");
            }
            _ => {
                tracing::debug!(entity = ?id, "route blocked, giving up");
                route.clear();
            }
        }
    }
}

impl TickDriven for MovementEngine {
    type Context<'a> = MovementContext<'a>;
    type Output = MovementReport;

    fn name(&self) -> &'static str {
        "movement"
    }

    fn tick(&mut self, mut ctx: Self::Context<'_>, dt: f32) -> MovementReport {
        let mut report = MovementReport::default();

        self.plans.clear();
        let bodies = &ctx.store.bodies;
        self.plans.extend(
            ctx.world
                .query(Self::mover_mask())
                .filter(|id| bodies.get(id.slot()).is_some_and(|b| b.movable))
                .map(Plan::pending),
        );
        report.movers = self.plans.len();

        report.parallel = self.plan_all(&ctx, dt);
        self.commit_all(&mut ctx, dt, &mut report);

        let positions = &ctx.store.positions;
        ctx.index.rebuild_dynamic(
            self.plans
                .iter()
                .filter_map(|plan| positions.get(plan.id.slot()).map(|p| (plan.id, p.location()))),
        );

        report
    }
}

fn plan_entity(
    id: EntityId,
    store: &ComponentStore,
    collision: &CollisionService<'_>,
    settings: Settings,
    dt: f32,
) -> Plan {
    let slot = id.slot();
    let mut plan = Plan::pending(id);
    let (Some(position), Some(state), Some(intent), Some(route)) = (
        store.positions.get(slot),
        store.states.get(slot),
        store.intents.get(slot),
        store.routes.get(slot),
    ) else {
        return plan;
    };

    let origin = match *state {
        MovementState::Moving(step) => {
            let elapsed = step.elapsed + dt;
            if elapsed + ARRIVAL_EPSILON < step.duration {
                plan.advance = Advance::InFlight(Step { elapsed, ..step });
                return plan;
            }
            plan.advance = Advance::Arrived {
                step,
                leftover: (elapsed - step.duration).max(0.0),
            };
            step.to
        }
        MovementState::Idle => position.tile(),
    };

    let next = if intent.active {
        Some((intent.requested_direction, StepSource::Intent))
    } else if !route.paused && !route.is_empty() {
        let mut cursor = route.cursor;
        while route.waypoints.get(cursor) == Some(&origin) {
            cursor += 1;
        }
        if cursor != route.cursor {
            plan.route_cursor = Some(cursor);
        }
        match route.waypoints.get(cursor) {
            Some(&waypoint) => Direction::toward(origin, waypoint).map(|d| (d, StepSource::Route)),
            None => {
                plan.route_done = true;
                None
            }
        }
    } else {
        None
    };

    if let Some((direction, source)) = next {
        let target = origin.neighbor(direction);
        let verdict = collision
            .for_mover(id)
            .check(position.map_id, origin, target, direction);
        let landing = match verdict.ledge_jump {
            Some(jump) => target.step(jump, settings.ledge_jump_tiles),
            None => target,
        };
        plan.attempt = Some(Attempt {
            source,
            from: origin,
            target,
            landing,
            direction,
            verdict,
        });
    }

    plan
}

fn arrive(ctx: &mut MovementContext<'_>, id: EntityId, map_id: i32, step: &Step) {
    let slot = id.slot();
    if let Some(position) = ctx.store.positions.get_mut(slot) {
        position.snap_to(step.to);
    }
    ctx.store.states.set(slot, MovementState::Idle);
    if let Some(facing) = ctx.store.facings.get_mut(slot) {
        facing.0 = step.direction;
    }
    ctx.bus.notify::<MoveCompleted, _>(|e| {
        e.configure(id, map_id, step.from, step.to, step.direction);
    });
}
