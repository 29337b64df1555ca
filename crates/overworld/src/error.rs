//! # Movement Error Types
//!
//! Contract violations and capacity limits of the movement API. Blocked
//! moves and failed path searches are outcomes, not errors, and never
//! appear here.

use overworld_core::EntityId;
use thiserror::Error;

/// Errors returned by the movement core's external interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MovementError {
    /// The id is null, stale or refers to a despawned entity.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// The entity exists but lacks a component the operation needs.
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        /// The entity that was addressed.
        entity: EntityId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// No tile data has been loaded for this map.
    #[error("unknown map: {0}")]
    UnknownMap(i32),

    /// The tile lies outside the bounds of its map.
    #[error("tile ({x}, {y}) is out of range for map {map_id}")]
    TileOutOfRange {
        /// Map that was addressed.
        map_id: i32,
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
    },

    /// The entity store has no free slots.
    #[error("entity capacity exhausted: {capacity}")]
    CapacityExhausted {
        /// Configured entity capacity.
        capacity: usize,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for movement operations.
pub type MovementResult<T> = Result<T, MovementError>;
