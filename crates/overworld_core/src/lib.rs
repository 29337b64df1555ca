//! # Overworld Core
//!
//! The simulation state store consumed by the tile movement core:
//! - Generational entity ids over a fixed-capacity slot array
//! - Dense, pre-allocated component storages keyed by entity index
//! - Bitmask-filtered iteration over alive entities
//! - Bounded object pools for per-tick scratch instances
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - storages are sized at creation
//! 2. **Components are plain data** - behaviour lives in the systems that read them
//! 3. **Pools never block** - an empty pool hands out a fresh instance instead
//!
//! ## Example
//!
//! ```rust,ignore
//! use overworld_core::{World, ComponentStorage};
//!
//! let mut world = World::new(4096);
//! let id = world.spawn();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ecs;
pub mod memory;

pub use ecs::{Component, ComponentMask, ComponentStorage, Entity, EntityId, World};
pub use memory::{ObjectPool, PoolStats};
