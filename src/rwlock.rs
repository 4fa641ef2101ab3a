//! Bounded reader-writer lock
//!
//! This module provides [`BoundedRwLock`], a reader-writer lock that admits at most
//! `capacity` concurrent readers or a single writer. Admission is decided by a
//! `parking_lot` mutex and condition variable; the protected value itself lives in a
//! `parking_lot::RwLock` that never contends, because the gate already guarantees
//! exclusivity.
//!
//! # Semantics
//!
//! - `read()` blocks while the reader count is at capacity, then joins the readers.
//! - Releasing the last reader wakes every waiter, and so does releasing a reader
//!   while the count was at capacity.
//! - `write()` takes the gate mutex, waits for the reader count to reach zero and
//!   keeps the mutex until the guard drops. No reader can be admitted meanwhile.
//!
//! The lock is not fair: a continuous stream of readers can starve a
//! writer indefinitely.
//!
//! # Examples
//!
//! ```
//! use feed_dispatch::BoundedRwLock;
//!
//! let lock = BoundedRwLock::with_capacity(5, 2);
//!
//! {
//!     let r1 = lock.read();
//!     let r2 = lock.read();
//!     assert_eq!(*r1 + *r2, 10);
//!     assert_eq!(lock.active_readers(), 2);
//! }
//!
//! {
//!     let mut w = lock.write();
//!     *w += 1;
//! }
//! assert_eq!(*lock.read(), 6);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reader capacity used by [`BoundedRwLock::new`].
pub const DEFAULT_READER_CAPACITY: usize = 32;

#[derive(Debug)]
struct GateState {
    readers: usize,
}

/// A reader-writer lock with a cap on concurrent readers.
pub struct BoundedRwLock<T> {
    gate: Mutex<GateState>,
    released: Condvar,
    capacity: usize,
    data: RwLock<T>,
}

impl<T> BoundedRwLock<T> {
    /// Creates a lock admitting up to [`DEFAULT_READER_CAPACITY`] readers.
    pub fn new(value: T) -> Self {
        Self::with_capacity(value, DEFAULT_READER_CAPACITY)
    }

    /// Creates a lock admitting up to `capacity` readers. A capacity of zero is
    /// raised to one so readers can always make progress.
    pub fn with_capacity(value: T, capacity: usize) -> Self {
        Self {
            gate: Mutex::new(GateState { readers: 0 }),
            released: Condvar::new(),
            capacity: capacity.max(1),
            data: RwLock::new(value),
        }
    }

    /// Maximum number of concurrent readers.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of readers currently holding the lock.
    ///
    /// Blocks while a writer holds the lock.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.gate.lock().readers
    }

    /// Acquires shared access, blocking while the reader count is at capacity or a
    /// writer is active.
    pub fn read(&self) -> BoundedReadGuard<'_, T> {
        {
            let mut gate = self.gate.lock();
            while gate.readers >= self.capacity {
                self.released.wait(&mut gate);
            }
            gate.readers += 1;
        }
        let ticket = ReadTicket { lock: self };
        BoundedReadGuard {
            data: self.data.read(),
            _ticket: ticket,
        }
    }

    /// Acquires exclusive access, blocking until every reader has left.
    ///
    /// The gate mutex stays locked for the lifetime of the returned guard.
    pub fn write(&self) -> BoundedWriteGuard<'_, T> {
        let mut gate = self.gate.lock();
        while gate.readers > 0 {
            self.released.wait(&mut gate);
        }
        BoundedWriteGuard {
            data: self.data.write(),
            _gate: gate,
        }
    }

    /// Returns a mutable reference without locking; the borrow checker proves
    /// exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn release_reader(&self) {
        let mut gate = self.gate.lock();
        gate.readers -= 1;
        // Readers parked at capacity need a wake as soon as a slot frees up; writers
        // only care about the drop to zero.
        if gate.readers == 0 || gate.readers + 1 == self.capacity {
            self.released.notify_all();
        }
    }
}

impl<T: Default> Default for BoundedRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for BoundedRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRwLock")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Decrements the reader count when dropped.
struct ReadTicket<'a, T> {
    lock: &'a BoundedRwLock<T>,
}

impl<T> Drop for ReadTicket<'_, T> {
    fn drop(&mut self) {
        self.lock.release_reader();
    }
}

/// Shared access to the value behind a [`BoundedRwLock`].
pub struct BoundedReadGuard<'a, T> {
    // Field order matters: the data guard is released before the reader leaves.
    data: RwLockReadGuard<'a, T>,
    _ticket: ReadTicket<'a, T>,
}

impl<T> Deref for BoundedReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// Exclusive access to the value behind a [`BoundedRwLock`].
pub struct BoundedWriteGuard<'a, T> {
    data: RwLockWriteGuard<'a, T>,
    _gate: MutexGuard<'a, GateState>,
}

impl<T> Deref for BoundedWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for BoundedWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
