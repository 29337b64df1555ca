//! # Entity Component System
//!
//! A zero-allocation ECS: the external state store the movement core
//! queries and iterates.
//!
//! ## Design Philosophy
//!
//! - All storage is pre-allocated at world creation
//! - Components are stored in dense arrays indexed by entity index
//! - Entity IDs are simple indices with generation counters
//! - Component membership is a 64-bit mask per entity slot

mod component;
mod entity;
mod storage;
mod world;

pub use component::{Component, ComponentMask};
pub use entity::{Entity, EntityId};
pub use storage::ComponentStorage;
pub use world::World;
