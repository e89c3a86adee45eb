//! Condition variable for `RwLock` write guards.
//!
//! `parking_lot::Condvar` only cooperates with `parking_lot::Mutex`. The queue
//! keeps its storage behind a reader-writer lock so that `len` and `is_empty`
//! can share it, so waiting needs a condition variable that can release and
//! reacquire a write guard.
//!
//! ## Protocol
//!
//! ```text
//! Waiter                                  Notifier
//! ------                                  --------
//! write-lock storage, see predicate false
//! lock `gate`
//! unlock storage                          write-lock storage, change state
//! park on `cond`, releasing `gate`        unlock storage
//!                                         lock + unlock `gate`
//!                                         notify `cond`
//! unlock `gate`
//! write-lock storage, re-check predicate
//! ```
//!
//! The waiter takes `gate` before letting go of the storage lock and only
//! releases it by parking. A notifier has to pass through `gate` first, so it
//! cannot slip its notification into the window between "predicate is false"
//! and "thread is parked".
//!
//! The waiter drops `gate` before relocking storage. Holding it while waiting
//! for the storage lock would deadlock against another waiter that holds
//! storage and is trying to take `gate`.

use parking_lot::{Condvar, Mutex, RwLockWriteGuard};
use std::time::Instant;

/// A condition variable usable with a [`parking_lot::RwLockWriteGuard`].
///
/// Like every condition variable this one can wake spuriously; callers must
/// re-check their predicate after each wait returns.
#[derive(Debug, Default)]
pub struct CondvarAny {
    gate: Mutex<()>,
    cond: Condvar,
}

impl CondvarAny {
    /// Create a condition variable with no waiters
    pub const fn new() -> Self {
        Self {
            gate: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Release `guard`, block until notified, then reacquire `guard`.
    pub fn wait<T: ?Sized>(&self, guard: &mut RwLockWriteGuard<'_, T>) {
        let mut gate = self.gate.lock();
        RwLockWriteGuard::unlocked(guard, move || {
            self.cond.wait(&mut gate);
            drop(gate);
        });
    }

    /// Like [`wait`](Self::wait), but gives up at `deadline`.
    ///
    /// Returns `true` if the deadline passed without a notification. The
    /// guard is reacquired in both cases.
    pub fn wait_until<T: ?Sized>(
        &self,
        guard: &mut RwLockWriteGuard<'_, T>,
        deadline: Instant,
    ) -> bool {
        let mut gate = self.gate.lock();
        RwLockWriteGuard::unlocked(guard, move || {
            let timed_out = self.cond.wait_until(&mut gate, deadline).timed_out();
            drop(gate);
            timed_out
        })
    }

    /// Wake one waiter, if any.
    ///
    /// Call this after releasing the storage lock, otherwise the woken thread
    /// immediately blocks again on that lock.
    pub fn notify_one(&self) -> bool {
        drop(self.gate.lock());
        self.cond.notify_one()
    }

    /// Wake every waiter. Returns how many were woken.
    pub fn notify_all(&self) -> usize {
        drop(self.gate.lock());
        self.cond.notify_all()
    }
}
