//! Counting semaphore
//!
//! [`Semaphore`] hands out a fixed number of permits. `down` blocks until a permit
//! is free and takes it; `up` returns one and wakes a single waiter. Built from the
//! same `parking_lot` mutex and condition variable pair as [`crate::BoundedRwLock`].
//!
//! Permits are not tied to guards: any thread may call `up`, and calling it more
//! often than `down` raises the permit count above its initial value.
//!
//! ```
//! use feed_dispatch::Semaphore;
//!
//! let sem = Semaphore::new(1);
//! sem.down();
//! assert!(!sem.try_down());
//! sem.up();
//! assert_eq!(sem.available(), 1);
//! ```

use parking_lot::{Condvar, Mutex};

/// A counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    freed: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            freed: Condvar::new(),
        }
    }

    /// Takes a permit, blocking until one is available.
    pub fn down(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.freed.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes a permit if one is available right now.
    pub fn try_down(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns a permit and wakes one waiter.
    pub fn up(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.freed.notify_one();
    }

    /// Permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}
