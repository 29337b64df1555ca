//! # Memory Management
//!
//! Pre-allocated object pools for zero-allocation gameplay.
//!
//! ## Design Philosophy
//!
//! Instances are allocated once at startup and recycled. During gameplay:
//! - No heap allocations while the pool has free instances
//! - Exhaustion degrades to a one-off allocation, never a stall

mod pool;

pub use pool::{ObjectPool, PoolStats};
