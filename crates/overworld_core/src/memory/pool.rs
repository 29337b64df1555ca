//! # Object Pool
//!
//! Bounded recycling pool for boxed instances that are rented and returned
//! many times per tick.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A bounded pool of pre-allocated `Box<T>` instances.
///
/// `acquire` never fails: when the free list is empty a new instance is
/// allocated and counted as an overflow. `release` keeps at most
/// `capacity` instances; surplus instances are dropped.
///
/// The pool does not reset instances. Callers restore a clean state before
/// releasing.
///
/// # Example
///
/// ```rust,ignore
/// let pool: ObjectPool<Scratch> = ObjectPool::new(32);
///
/// let mut item = pool.acquire();   // O(1), no allocation while warm
/// item.fill();
/// item.clear();
/// pool.release(item);              // O(1), no deallocation
/// ```
pub struct ObjectPool<T> {
    free: Mutex<Vec<Box<T>>>,
    capacity: usize,
    acquired: AtomicU64,
    released: AtomicU64,
    overflow_allocations: AtomicU64,
}

/// Counters describing pool usage since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total instances handed out.
    pub acquired: u64,
    /// Total instances handed back.
    pub released: u64,
    /// Instances allocated because the pool was empty.
    pub overflow_allocations: u64,
    /// Instances currently sitting in the free list.
    pub retained: usize,
}

impl<T: Default> ObjectPool<T> {
    /// Creates a pool holding `capacity` pre-allocated instances.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let mut free = Vec::with_capacity(capacity);
        free.extend((0..capacity).map(|_| Box::<T>::default()));

        Self {
            free: Mutex::new(free),
            capacity,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            overflow_allocations: AtomicU64::new(0),
        }
    }

    /// Takes an instance from the pool, allocating one if the pool is empty.
    pub fn acquire(&self) -> Box<T> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        if let Some(item) = self.free.lock().pop() {
            return item;
        }
        self.overflow_allocations.fetch_add(1, Ordering::Relaxed);
        Box::default()
    }
}

impl<T> ObjectPool<T> {
    /// Returns an instance. Returns `false` if the pool was already full and
    /// the instance was dropped instead of retained.
    pub fn release(&self, item: Box<T>) -> bool {
        self.released.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(item);
            true
        } else {
            false
        }
    }

    /// Maximum number of retained instances.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of instances currently available without allocating.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Snapshot of the usage counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            overflow_allocations: self.overflow_allocations.load(Ordering::Relaxed),
            retained: self.available(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_acquire_release() {
        let pool: ObjectPool<u32> = ObjectPool::new(4);
        assert_eq!(pool.available(), 4);

        let mut item = pool.acquire();
        *item = 42;
        assert_eq!(pool.available(), 3);

        assert!(pool.release(item));
        assert_eq!(pool.available(), 4);

        let stats = pool.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.overflow_allocations, 0);
    }

    #[test]
    fn test_pool_exhaustion_allocates() {
        let pool: ObjectPool<u8> = ObjectPool::new(2);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        assert_eq!(pool.stats().overflow_allocations, 1);

        assert!(pool.release(a));
        assert!(pool.release(b));
        // Pool is back at capacity, the overflow instance is dropped.
        assert!(!pool.release(c));
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_pool_reuses_instances() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(1);

        let mut item = pool.acquire();
        item.reserve(64);
        let ptr = item.as_ptr();
        item.clear();
        pool.release(item);

        let again = pool.acquire();
        assert_eq!(again.as_ptr(), ptr);
        assert!(again.capacity() >= 64);
    }
}
