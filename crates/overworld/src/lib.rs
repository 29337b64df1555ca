//! # Overworld
//!
//! Tile-based movement core for a top-down overworld:
//! - Two-layer spatial index (static terrain markers, dynamic movers)
//! - Stateless collision service (walkable tiles, one-way ledges, occupancy)
//! - Tick-driven movement state machine with smooth pixel interpolation
//! - Pooled, prioritized, cancellable movement events
//! - Bounded A* pathfinding with path smoothing and route following
//!
//! ## Architecture Rules
//!
//! 1. **Blocked moves are outcomes** - they raise events, never errors
//! 2. **One writer per tick** - planning reads shared state, commits run serially
//! 3. **Pools never block** - an empty event pool hands out a fresh instance
//! 4. **The library installs no subscriber** - logging goes through `tracing`
//!
//! ## Example
//!
//! ```rust,ignore
//! use overworld::{Direction, GridMap, MovementConfig, Simulation, TileFlags, TileLocation};
//!
//! let mut sim = Simulation::new(MovementConfig::default())?;
//! sim.load_map(GridMap::filled(1, 20, 20, TileFlags::OPEN)?);
//! let player = sim.spawn_actor(TileLocation::new(1, 5, 5))?;
//! sim.request_move(player, Direction::East)?;
//! sim.tick(1.0 / 60.0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collision;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod map;
pub mod movement;
pub mod pathfinding;
pub mod service;
pub mod simulation;
pub mod spatial;
pub mod stats;

pub use collision::{BlockReason, CollisionService, CollisionVerdict, MoveQuery};
pub use components::{
    Body, ComponentStore, Facing, MoveIntent, MovementRoute, MovementSpeed, MovementState, Position, Step,
    StepKind,
};
pub use config::{ConfigError, MovementConfig};
pub use error::{MovementError, MovementResult};
pub use events::{
    Event, EventBus, EventHeader, MoveBlocked, MoveCompleted, MoveStarted, NotificationEvent, SubscriptionId,
};
pub use grid::{Direction, TileCoord, TileLocation};
pub use map::{GridMap, TileFlags, TileMaps};
pub use movement::{MovementContext, MovementEngine, MovementReport, ReplanRequest};
pub use pathfinding::{PathFailure, PathQuery, Pathfinder};
pub use service::{Callable, TickDriven};
pub use simulation::Simulation;
pub use spatial::{Occupants, SpatialIndex};
pub use stats::{TickStats, TickStatsAccumulator};

pub use overworld_core::EntityId;
