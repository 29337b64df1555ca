//! # Capability Traits
//!
//! The movement core has two kinds of moving parts and each implements only
//! the trait matching what it actually does:
//!
//! - [`TickDriven`]: advanced once per frame by the simulation driver
//!   (the movement engine).
//! - [`Callable`]: answers queries on demand and is never scheduled
//!   (collision, pathfinding).

/// A part that advances once per simulation tick.
pub trait TickDriven {
    /// Borrowed simulation state the tick operates on.
    type Context<'a>;
    /// Summary produced by one tick.
    type Output;

    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Advances by `dt` seconds.
    fn tick(&mut self, ctx: Self::Context<'_>, dt: f32) -> Self::Output;
}

/// A stateless query service.
pub trait Callable {
    /// Query input.
    type Request<'a>;
    /// Query answer.
    type Response;

    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Answers one query. Must not depend on being called on a schedule.
    fn call(&self, request: Self::Request<'_>) -> Self::Response;
}
