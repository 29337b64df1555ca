//! # Movement Events
//!
//! Pooled, synchronous event delivery for movement lifecycle notifications.

mod bus;
mod kinds;

pub use bus::{Channel, Event, EventBus, EventHeader, NotificationEvent, Rented, SubscriptionId};
pub use kinds::{MoveBlocked, MoveCompleted, MoveStarted};
