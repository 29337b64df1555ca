//! # Movement Configuration
//!
//! Tunables for the movement core, loaded once at startup from TOML.
//!
//! ```toml
//! tile_size_px = 16.0
//! default_tiles_per_second = 4.0
//! parallel_threshold = 32
//! path_node_cap = 500
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`MovementConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse movement config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the core cannot run with.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Configuration for the movement core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Maximum number of entities (movers and static markers).
    pub entity_capacity: usize,
    /// Pixel size of one tile, used for interpolated pixel offsets.
    pub tile_size_px: f32,
    /// Speed given to actors spawned without an explicit speed.
    pub default_tiles_per_second: f32,
    /// Movers needed before the planning phase runs on the worker pool.
    pub parallel_threshold: usize,
    /// Maximum A* node expansions per search.
    pub path_node_cap: usize,
    /// Instances retained per event kind.
    pub event_pool_capacity: usize,
    /// Maximum pending path requests.
    pub path_request_capacity: usize,
    /// Automatic re-plans after a route waypoint becomes blocked.
    pub max_replans: u8,
    /// Tiles travelled past a ledge tile when jumping it.
    pub ledge_jump_tiles: i32,
    /// Block moves between tiles of different non-zero elevation.
    pub elevation_blocking: bool,
    /// Ticks slower than this many microseconds are logged.
    pub slow_tick_warn_us: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 4096,
            tile_size_px: 16.0,
            default_tiles_per_second: 4.0,
            parallel_threshold: 32,
            path_node_cap: 500,
            event_pool_capacity: 32,
            path_request_capacity: 256,
            max_replans: 1,
            ledge_jump_tiles: 2,
            elevation_blocking: false,
            slow_tick_warn_us: 4_000,
        }
    }
}

impl MovementConfig {
    /// Parses and validates a TOML document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "entity_capacity",
                reason: "must be greater than zero",
            });
        }
        if !(self.tile_size_px.is_finite() && self.tile_size_px > 0.0) {
            return Err(ConfigError::Invalid {
                field: "tile_size_px",
                reason: "must be a positive number",
            });
        }
        if !(self.default_tiles_per_second.is_finite() && self.default_tiles_per_second > 0.0) {
            return Err(ConfigError::Invalid {
                field: "default_tiles_per_second",
                reason: "must be a positive number",
            });
        }
        if self.path_node_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "path_node_cap",
                reason: "must be greater than zero",
            });
        }
        if self.event_pool_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_pool_capacity",
                reason: "must be greater than zero",
            });
        }
        if self.ledge_jump_tiles < 1 {
            return Err(ConfigError::Invalid {
                field: "ledge_jump_tiles",
                reason: "must be at least one tile",
            });
        }
        Ok(())
    }

    /// Sets the entity capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Sets the default movement speed in tiles per second.
    #[must_use]
    pub fn with_default_speed(mut self, tiles_per_second: f32) -> Self {
        self.default_tiles_per_second = tiles_per_second;
        self
    }

    /// Sets the mover count at which planning goes parallel.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets the A* expansion cap.
    #[must_use]
    pub fn with_path_node_cap(mut self, cap: usize) -> Self {
        self.path_node_cap = cap;
        self
    }

    /// Enables or disables the elevation rule.
    #[must_use]
    pub fn with_elevation_blocking(mut self, enabled: bool) -> Self {
        self.elevation_blocking = enabled;
        self
    }

    /// Sets the number of automatic re-plans per path request.
    #[must_use]
    pub fn with_max_replans(mut self, replans: u8) -> Self {
        self.max_replans = replans;
        self
    }
}
