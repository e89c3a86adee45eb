//! Counting semaphore on top of `parking_lot`.
//!
//! The count lives behind its own small mutex, separate from whatever the
//! permits stand for. Acquire blocks on a condition variable until the count
//! is positive; release bumps the count, drops the mutex and then notifies.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A counting semaphore with blocking, non-blocking and timed acquire.
///
/// # Examples
///
/// ```rust
/// use waitq::sync::Semaphore;
/// use std::time::Duration;
///
/// let sem = Semaphore::new(1);
/// assert!(sem.try_acquire());
/// assert!(!sem.try_acquire_for(Duration::from_millis(1)));
/// sem.release(1);
/// assert_eq!(sem.available(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Semaphore {
    permits: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// The largest number of permits the semaphore will count.
    pub const MAX_PERMITS: usize = isize::MAX as usize;

    /// Create a semaphore holding `permits` permits (clamped to
    /// [`MAX_PERMITS`](Self::MAX_PERMITS)).
    pub const fn new(permits: usize) -> Self {
        let permits = if permits > Self::MAX_PERMITS {
            Self::MAX_PERMITS
        } else {
            permits
        };
        Self {
            permits: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    /// Number of permits currently available. Advisory.
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    /// Take one permit, blocking until one is available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.cond.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Take one permit if one is available right now.
    ///
    /// Returns `true` if a permit was taken.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Take up to `max` permits without blocking. Returns how many were taken.
    pub fn try_acquire_up_to(&self, max: usize) -> usize {
        let mut permits = self.permits.lock();
        let taken = (*permits).min(max);
        *permits -= taken;
        taken
    }

    /// Take one permit, waiting at most `timeout`.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.try_acquire_until(deadline),
            None => {
                self.acquire();
                true
            }
        }
    }

    /// Take one permit, waiting until `deadline` at the latest.
    ///
    /// A permit that shows up while the waiter is being timed out still
    /// counts: the count is checked once more after the deadline passes.
    pub fn try_acquire_until(&self, deadline: Instant) -> bool {
        let mut permits = self.permits.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            if self.cond.wait_until(&mut permits, deadline).timed_out() {
                if *permits > 0 {
                    *permits -= 1;
                    return true;
                }
                return false;
            }
        }
    }

    /// Return `n` permits and wake up to `n` waiters.
    ///
    /// The count saturates at [`MAX_PERMITS`](Self::MAX_PERMITS).
    pub fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        {
            let mut permits = self.permits.lock();
            *permits = permits.saturating_add(n).min(Self::MAX_PERMITS);
        }
        if n == 1 {
            self.cond.notify_one();
        } else {
            self.cond.notify_all();
        }
    }

    /// Overwrite the count with `permits` and return the old count.
    ///
    /// Does not wake anybody; follow up with [`notify_all`](Self::notify_all)
    /// once any locks the caller holds are released.
    pub fn reset(&self, permits: usize) -> usize {
        let mut current = self.permits.lock();
        core::mem::replace(&mut *current, permits.min(Self::MAX_PERMITS))
    }

    /// Wake every thread blocked in an acquire so it re-reads the count.
    pub fn notify_all(&self) -> usize {
        self.cond.notify_all()
    }
}
