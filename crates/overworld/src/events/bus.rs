//! # Event Bus
//!
//! Synchronous, priority-ordered publish/subscribe with pooled instances.
//!
//! ## Two entry points
//!
//! ```text
//! cancellable    rent -> configure -> publish -> read outcome -> drop (return)
//! notification   notify(|e| configure)      (rent, publish, return inside)
//! ```
//!
//! `notify` only accepts [`NotificationEvent`] kinds. A callback that runs
//! before dispatch cannot observe what handlers wrote, so cancellable kinds
//! never get the callback form.
//!
//! Dispatch copies the handler list into a reusable snapshot buffer before
//! running any handler. Handlers may subscribe or unsubscribe while a
//! dispatch is in progress; the change applies to the next dispatch.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use overworld_core::{ObjectPool, PoolStats};
use parking_lot::{Mutex, RwLock};

use super::kinds::{MoveBlocked, MoveCompleted, MoveStarted};

/// Fields shared by every event kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventHeader {
    /// Bus-unique id, assigned at rent time.
    pub event_id: u64,
    /// Simulation tick at rent time.
    pub timestamp: u64,
    configured: bool,
}

impl EventHeader {
    /// Whether the publisher filled in the payload.
    #[inline]
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.configured
    }

    /// Marks the payload as filled in.
    #[inline]
    pub fn mark_configured(&mut self) {
        self.configured = true;
    }
}

/// A pooled event kind with its own channel on the [`EventBus`].
pub trait Event: Default + Send + Sync + 'static {
    /// Kind name, used in logs.
    const NAME: &'static str;

    /// Shared header.
    fn header(&self) -> &EventHeader;

    /// Shared header, mutable.
    fn header_mut(&mut self) -> &mut EventHeader;

    /// The channel carrying this kind.
    #[doc(hidden)]
    fn channel(bus: &EventBus) -> &Channel<Self>;
}

/// Marker for kinds with no outcome fields, eligible for [`EventBus::notify`].
pub trait NotificationEvent: Event {}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

struct Subscriber<E> {
    id: SubscriptionId,
    priority: i32,
    handler: Handler<E>,
}

/// Handlers and instance pool for one event kind.
#[doc(hidden)]
pub struct Channel<E> {
    subscribers: RwLock<Vec<Subscriber<E>>>,
    snapshot: Mutex<Vec<Handler<E>>>,
    pool: ObjectPool<E>,
}

impl<E: Event> Channel<E> {
    fn new(pool_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            snapshot: Mutex::new(Vec::new()),
            pool: ObjectPool::new(pool_capacity),
        }
    }

    fn add(&self, id: SubscriptionId, priority: i32, handler: Handler<E>) {
        let mut subscribers = self.subscribers.write();
        // equal priorities keep subscription order
        let at = subscribers
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(subscribers.len());
        subscribers.insert(at, Subscriber { id, priority, handler });
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    fn dispatch(&self, event: &mut E) {
        let mut nested = Vec::new();
        let mut guard = self.snapshot.try_lock();
        // a handler re-publishing this kind finds the snapshot busy
        let handlers: &mut Vec<Handler<E>> = match guard.as_mut() {
            Some(buffer) => &mut **buffer,
            None => &mut nested,
        };

        handlers.clear();
        {
            let subscribers = self.subscribers.read();
            if subscribers.is_empty() {
                return;
            }
            handlers.extend(subscribers.iter().map(|s| Arc::clone(&s.handler)));
        }

        for handler in handlers.iter() {
            handler(event);
        }
        handlers.clear();
    }
}

/// Pooled event instance. Returned to its pool when dropped, including
/// during unwinding from a panicking handler.
pub struct Rented<'b, E: Event> {
    item: Option<Box<E>>,
    pool: &'b ObjectPool<E>,
}

impl<E: Event> Deref for Rented<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        // only `Drop` takes the item
        self.item.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl<E: Event> DerefMut for Rented<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.item.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<E: Event> Drop for Rented<'_, E> {
    fn drop(&mut self) {
        if let Some(mut item) = self.item.take() {
            debug_assert!(
                item.header().is_configured() || std::thread::panicking(),
                "{} returned to its pool without being configured",
                E::NAME
            );
            *item = E::default();
            self.pool.release(item);
        }
    }
}

/// Typed, synchronous event bus for movement events.
pub struct EventBus {
    move_started: Channel<MoveStarted>,
    move_completed: Channel<MoveCompleted>,
    move_blocked: Channel<MoveBlocked>,
    next_subscription: AtomicU64,
    next_event: AtomicU64,
    tick: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}

impl EventBus {
    /// Creates a bus retaining `pool_capacity` instances per kind.
    ///
    /// # Panics
    ///
    /// Panics if `pool_capacity` is zero.
    #[must_use]
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            move_started: Channel::new(pool_capacity),
            move_completed: Channel::new(pool_capacity),
            move_blocked: Channel::new(pool_capacity),
            next_subscription: AtomicU64::new(1),
            next_event: AtomicU64::new(1),
            tick: AtomicU64::new(0),
        }
    }

    pub(crate) fn move_started(&self) -> &Channel<MoveStarted> {
        &self.move_started
    }

    pub(crate) fn move_completed(&self) -> &Channel<MoveCompleted> {
        &self.move_completed
    }

    pub(crate) fn move_blocked(&self) -> &Channel<MoveBlocked> {
        &self.move_blocked
    }

    /// Registers a handler. Higher priorities run first.
    pub fn subscribe<E, F>(&self, priority: i32, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        E::channel(self).add(id, priority, Arc::new(handler));
        tracing::trace!(kind = E::NAME, priority, ?id, "handler subscribed");
        id
    }

    /// Removes a handler from whichever channel holds it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.move_started.remove(id) || self.move_completed.remove(id) || self.move_blocked.remove(id)
    }

    /// Number of handlers registered for `E`.
    #[must_use]
    pub fn subscriber_count<E: Event>(&self) -> usize {
        E::channel(self).len()
    }

    /// Takes an instance of `E` from its pool, stamped with a fresh id and
    /// the current tick.
    pub fn rent<E: Event>(&self) -> Rented<'_, E> {
        let channel = E::channel(self);
        if channel.pool.available() == 0 {
            tracing::debug!(kind = E::NAME, "event pool exhausted, allocating");
        }
        let mut item = channel.pool.acquire();

        let header = item.header_mut();
        header.event_id = self.next_event.fetch_add(1, Ordering::Relaxed);
        header.timestamp = self.tick.load(Ordering::Relaxed);
        header.configured = false;

        Rented {
            item: Some(item),
            pool: &channel.pool,
        }
    }

    /// Runs every handler for `E` on `event`, in priority order, on the
    /// calling thread. Outcome fields may be read once this returns.
    pub fn publish<E: Event>(&self, event: &mut E) {
        debug_assert!(
            event.header().is_configured(),
            "{} published without being configured",
            E::NAME
        );
        E::channel(self).dispatch(event);
    }

    /// Rents, configures via `configure`, publishes and returns an instance.
    pub fn notify<E, F>(&self, configure: F)
    where
        E: NotificationEvent,
        F: FnOnce(&mut E),
    {
        let mut event = self.rent::<E>();
        configure(&mut event);
        event.header_mut().mark_configured();
        self.publish(&mut *event);
    }

    /// Pool counters for `E`.
    #[must_use]
    pub fn pool_stats<E: Event>(&self) -> PoolStats {
        E::channel(self).pool.stats()
    }

    /// Sets the tick stamped on newly rented events.
    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::Relaxed);
    }

    /// Current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("move_started", &self.move_started.len())
            .field("move_completed", &self.move_completed.len())
            .field("move_blocked", &self.move_blocked.len())
            .field("tick", &self.tick())
            .finish()
    }
}
