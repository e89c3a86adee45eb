//! Wake strategies for [`MpmcQueue`](super::MpmcQueue).
//!
//! A gate decides how consumers wait for elements and how producers wake
//! them. Both gates keep every storage mutation under the queue's write lock;
//! they differ in what a consumer waits on.
//!
//! | Gate | Consumer waits on | Producer signals | After `swap` |
//! |------|-------------------|------------------|--------------|
//! | [`CondvarGate`] | predicate "storage non-empty", under the lock | `notify_one` | `notify_all` |
//! | [`SemaphoreGate`] | a permit per stored element, before the lock | `release(1)` | permits reset to the new length, `notify_all` |

use super::storage::Storage;
use crate::sync::{CondvarAny, Semaphore};
use crate::trace::debug;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::time::Instant;

/// Outcome of a pop that may have blocked.
#[derive(Debug)]
pub struct Claim<T> {
    /// What the pop produced
    pub value: T,
    /// Whether the caller had to block at least once
    pub blocked: bool,
}

/// A wake strategy: how consumers wait and how producers wake them.
///
/// Every method receiving `storage` takes the write lock itself, exactly when
/// its protocol needs it. [`resync`](Gate::resync) is the only method called
/// with storage locks already held.
pub trait Gate: Default + Send + Sync {
    /// Check whether `additional` more elements may be stored on top of
    /// `len`. Called under the write lock, before enqueuing.
    fn admit(&self, len: usize, additional: usize) -> Result<()> {
        let _ = (len, additional);
        Ok(())
    }

    /// `count` elements were enqueued and the write lock released.
    fn signal(&self, count: usize);

    /// Remove the front element if one can be claimed without blocking.
    fn try_claim<S: Storage>(&self, storage: &RwLock<S>) -> Option<S::Item>;

    /// Remove the front element, blocking as long as it takes.
    fn claim<S: Storage>(&self, storage: &RwLock<S>) -> Claim<S::Item>;

    /// Remove the front element, blocking until `deadline` at the latest.
    fn claim_until<S: Storage>(
        &self,
        storage: &RwLock<S>,
        deadline: Instant,
    ) -> Claim<Option<S::Item>>;

    /// Remove every element that can be claimed without blocking.
    fn drain<S: Storage>(&self, storage: &RwLock<S>) -> Vec<S::Item>;

    /// The storage guarded by this gate was replaced wholesale and now holds
    /// `len` elements. Called with the write lock held.
    fn resync(&self, len: usize);

    /// Wake every blocked consumer so it re-evaluates. Called after the
    /// write lock is released.
    fn wake_all(&self);
}

/// Condition-variable gate: consumers sleep under the lock until the storage
/// is non-empty.
///
/// The predicate, not the wake-up, is authoritative: a woken consumer
/// re-checks the storage and goes back to sleep if another consumer got there
/// first.
#[derive(Debug, Default)]
pub struct CondvarGate {
    cond: CondvarAny,
}

impl Gate for CondvarGate {
    fn signal(&self, count: usize) {
        for _ in 0..count {
            if !self.cond.notify_one() {
                break;
            }
        }
    }

    fn try_claim<S: Storage>(&self, storage: &RwLock<S>) -> Option<S::Item> {
        storage.write().pop_front()
    }

    fn claim<S: Storage>(&self, storage: &RwLock<S>) -> Claim<S::Item> {
        let mut guard = storage.write();
        let mut blocked = false;
        loop {
            if let Some(value) = guard.pop_front() {
                return Claim { value, blocked };
            }
            blocked = true;
            self.cond.wait(&mut guard);
        }
    }

    fn claim_until<S: Storage>(
        &self,
        storage: &RwLock<S>,
        deadline: Instant,
    ) -> Claim<Option<S::Item>> {
        let mut guard = storage.write();
        let mut blocked = false;
        loop {
            if let Some(value) = guard.pop_front() {
                return Claim {
                    value: Some(value),
                    blocked,
                };
            }
            blocked = true;
            if self.cond.wait_until(&mut guard, deadline) {
                // One last look: an element may have landed as we timed out.
                return Claim {
                    value: guard.pop_front(),
                    blocked,
                };
            }
        }
    }

    fn drain<S: Storage>(&self, storage: &RwLock<S>) -> Vec<S::Item> {
        let mut guard = storage.write();
        let mut drained = Vec::with_capacity(guard.len());
        while let Some(value) = guard.pop_front() {
            drained.push(value);
        }
        drained
    }

    fn resync(&self, _len: usize) {}

    fn wake_all(&self) {
        self.cond.notify_all();
    }
}

/// Counting-permit gate: one permit per element not yet claimed.
///
/// A consumer first takes a permit, outside the storage lock, and only then
/// locks the storage to remove an element. Between the two steps the element
/// is spoken for but still stored; the lock keeps that window harmless.
///
/// Permits can only ever exceed the stored elements, never fall short of
/// them: producers release after enqueuing, and [`resync`](Gate::resync)
/// resets the count to the stored length while the storage is locked. A
/// consumer holding a surplus permit finds the storage empty, gives the
/// permit up and goes back to waiting.
#[derive(Debug, Default)]
pub struct SemaphoreGate {
    permits: Semaphore,
}

impl SemaphoreGate {
    /// Permits currently available to claim. Advisory.
    pub fn available(&self) -> usize {
        self.permits.available()
    }

    fn take<S: Storage>(storage: &RwLock<S>) -> Option<S::Item> {
        let value = storage.write().pop_front();
        if value.is_none() {
            debug!("permit claimed on empty storage, forfeiting it");
        }
        value
    }
}

impl Gate for SemaphoreGate {
    fn admit(&self, len: usize, additional: usize) -> Result<()> {
        match len.checked_add(additional) {
            Some(total) if total <= Semaphore::MAX_PERMITS => Ok(()),
            _ => Err(Error::PermitOverflow),
        }
    }

    fn signal(&self, count: usize) {
        self.permits.release(count);
    }

    fn try_claim<S: Storage>(&self, storage: &RwLock<S>) -> Option<S::Item> {
        // No permit, no element: never touch the lock on this path.
        if !self.permits.try_acquire() {
            return None;
        }
        Self::take(storage)
    }

    fn claim<S: Storage>(&self, storage: &RwLock<S>) -> Claim<S::Item> {
        let mut blocked = false;
        loop {
            if !self.permits.try_acquire() {
                blocked = true;
                self.permits.acquire();
            }
            if let Some(value) = Self::take(storage) {
                return Claim { value, blocked };
            }
        }
    }

    fn claim_until<S: Storage>(
        &self,
        storage: &RwLock<S>,
        deadline: Instant,
    ) -> Claim<Option<S::Item>> {
        let mut blocked = false;
        loop {
            if !self.permits.try_acquire() {
                blocked = true;
                if !self.permits.try_acquire_until(deadline) {
                    return Claim {
                        value: None,
                        blocked,
                    };
                }
            }
            if let Some(value) = Self::take(storage) {
                return Claim {
                    value: Some(value),
                    blocked,
                };
            }
        }
    }

    fn drain<S: Storage>(&self, storage: &RwLock<S>) -> Vec<S::Item> {
        let claimed = self.permits.try_acquire_up_to(usize::MAX);
        if claimed == 0 {
            return Vec::new();
        }
        let mut guard = storage.write();
        let mut drained = Vec::with_capacity(claimed.min(guard.len()));
        while drained.len() < claimed {
            match guard.pop_front() {
                Some(value) => drained.push(value),
                None => break,
            }
        }
        drained
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn resync(&self, len: usize) {
        let previous = self.permits.reset(len);
        debug!(previous, len, "permit count reset after swap");
    }

    fn wake_all(&self) {
        self.permits.notify_all();
    }
}
