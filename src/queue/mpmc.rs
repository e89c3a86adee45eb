//! Multi-Producer, Multi-Consumer (MPMC) blocking queue
//!
//! This module implements an unbounded FIFO queue that consumers can block on.
//! Storage sits behind one reader-writer lock; how consumers wait is decided by
//! the queue's [`Gate`]:
//!
//! 1. [`CondvarGate`] - consumers wait under the lock on the predicate
//!    "storage is non-empty"
//! 2. [`SemaphoreGate`] - consumers claim a permit first, then lock and dequeue
//!
//! ## Locking Model
//!
//! ```text
//! Producer (push)                    Consumer (pop_wait)
//! ---------------                    -------------------
//! write-lock storage                 gate: wait until an element is claimable
//! push_back                          write-lock storage
//! unlock                             pop_front
//! gate: signal one                   unlock
//! ```
//!
//! - Every mutation of the storage happens under the write lock
//! - `len` and `is_empty` take the lock in shared mode and are advisory only
//! - Producers signal *after* unlocking, so a woken consumer does not run
//!   straight into the lock the producer still holds
//! - `swap` locks both queues in address order, then wakes every waiter on
//!   both queues once the locks are dropped
//!
//! ## Guarantees
//!
//! - **FIFO**: elements pushed in program order by one thread come out in
//!   that order
//! - **Exactly once**: every accepted element is returned by exactly one
//!   successful pop, or dropped with the queue
//! - **No fairness**: which blocked consumer wakes first is unspecified
//!
//! ## Example
//!
//! ```rust
//! use waitq::queue::{MpmcQueue, SemaphoreQueue};
//! use std::time::Duration;
//!
//! let condvar: MpmcQueue<&str> = MpmcQueue::new();
//! condvar.push("hello")?;
//! assert_eq!(condvar.try_pop(), Some("hello"));
//!
//! let semaphore: SemaphoreQueue<u32> = SemaphoreQueue::new();
//! assert_eq!(semaphore.pop_wait_for(Duration::from_millis(5)), None);
//!
//! # Ok::<(), waitq::Error>(())
//! ```

use super::gate::{Claim, CondvarGate, Gate, SemaphoreGate};
use super::storage::Storage;
use crate::metrics::{AtomicMetrics, MetricsCollector, QueueMetrics};
use crate::trace::{trace, warn};
use crate::util::CachePadded;
use crate::Result;
use core::fmt;
use core::marker::PhantomData;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A multi-producer, multi-consumer unbounded FIFO queue with blocking pops
///
/// `G` picks the wake strategy ([`CondvarGate`] by default) and `S` the
/// storage ([`VecDeque<T>`] by default). All operations take `&self`; share
/// the queue between threads with [`std::sync::Arc`].
///
/// # Operations
///
/// | Operation | Blocks? |
/// |-----------|---------|
/// | [`push`](Self::push), [`emplace`](Self::emplace), [`push_batch`](Self::push_batch) | lock only |
/// | [`try_pop`](Self::try_pop), [`drain`](Self::drain) | lock only |
/// | [`pop_wait`](Self::pop_wait) | until an element arrives |
/// | [`pop_wait_for`](Self::pop_wait_for), [`pop_wait_until`](Self::pop_wait_until) | until an element arrives or time runs out |
/// | [`len`](Self::len), [`is_empty`](Self::is_empty) | shared lock only |
/// | [`swap`](Self::swap) | both locks, briefly |
///
/// # Examples
///
/// ```rust
/// use waitq::queue::MpmcQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue: Arc<MpmcQueue<u64>> = Arc::new(MpmcQueue::new());
///
/// // Producer thread
/// let producer = thread::spawn({
///     let queue = Arc::clone(&queue);
///     move || {
///         for i in 0..100 {
///             queue.push(i).unwrap();
///         }
///     }
/// });
///
/// // Consumer thread
/// let consumer = thread::spawn({
///     let queue = Arc::clone(&queue);
///     move || (0..100).map(|_| queue.pop_wait()).sum::<u64>()
/// });
///
/// producer.join().unwrap();
/// assert_eq!(consumer.join().unwrap(), 4950);
/// ```
pub struct MpmcQueue<T, G = CondvarGate, S = VecDeque<T>> {
    // Lock and gate live on separate cache lines: producers hammer the lock,
    // parked consumers sit on the gate.
    storage: CachePadded<RwLock<S>>,
    gate: CachePadded<G>,
    metrics: AtomicMetrics,
    _marker: PhantomData<T>,
}

/// Queue using the condition-variable gate
pub type CondvarQueue<T, S = VecDeque<T>> = MpmcQueue<T, CondvarGate, S>;

/// Queue using the counting-permit gate
pub type SemaphoreQueue<T, S = VecDeque<T>> = MpmcQueue<T, SemaphoreGate, S>;

// SAFETY: every access to stored elements goes through the write lock, which
// hands them to one thread at a time, so `T: Send` suffices. Shared guards only
// call `Storage::len` / `Storage::is_empty`, which the `Storage` safety
// contract forbids from reading elements.
unsafe impl<T: Send, G: Gate, S: Storage<Item = T>> Sync for MpmcQueue<T, G, S> {}

impl<T, G: Gate, S: Storage<Item = T>> MpmcQueue<T, G, S> {
    /// Create an empty queue
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// assert!(queue.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            storage: CachePadded::new(RwLock::new(S::default())),
            gate: CachePadded::new(G::default()),
            metrics: AtomicMetrics::default(),
            _marker: PhantomData,
        }
    }

    /// Create an empty queue with room for `capacity` elements up front
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`](crate::Error::AllocationFailed)
    /// if the storage cannot reserve that much.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut storage = S::default();
        storage.reserve(capacity)?;

        Ok(Self {
            storage: CachePadded::new(RwLock::new(storage)),
            gate: CachePadded::new(G::default()),
            metrics: AtomicMetrics::default(),
            _marker: PhantomData,
        })
    }

    /// Push an element to the back of the queue and wake one waiting consumer
    ///
    /// Never waits for consumers; the only delay is contention on the lock.
    ///
    /// # Errors
    ///
    /// * [`Error::AllocationFailed`](crate::Error::AllocationFailed) if the
    ///   storage cannot grow
    /// * [`Error::PermitOverflow`](crate::Error::PermitOverflow) if the
    ///   semaphore gate cannot count another element
    ///
    /// In both cases the element is dropped and the queue is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// queue.push(42)?;
    /// assert_eq!(queue.len(), 1);
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn push(&self, value: T) -> Result<()> {
        {
            let mut storage = self.storage.write();
            self.gate.admit(storage.len(), 1)?;
            storage.push_back(value).map_err(|e| {
                warn!(error = %e, len = storage.len(), "push rejected");
                e
            })?;
        }
        self.gate.signal(1);
        self.metrics.record_push(1);
        Ok(())
    }

    /// Build an element under the lock and push it
    ///
    /// `make` runs while the write lock is held, so keep it short. The lock
    /// is not reentrant: `make` must not call any method of this queue, or
    /// the thread deadlocks. Returns
    /// the element's position counted from the front at the moment it was
    /// inserted; like [`len`](Self::len), that position is stale as soon as
    /// the lock is dropped.
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push). On error the queue is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<String> = MpmcQueue::new();
    /// assert_eq!(queue.emplace(|| "first".to_string())?, 0);
    /// assert_eq!(queue.emplace(|| "second".to_string())?, 1);
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn emplace<F>(&self, make: F) -> Result<usize>
    where
        F: FnOnce() -> T,
    {
        let position = {
            let mut storage = self.storage.write();
            let position = storage.len();
            self.gate.admit(position, 1)?;
            storage.reserve(1)?;
            storage.push_back(make())?;
            position
        };
        self.gate.signal(1);
        self.metrics.record_push(1);
        Ok(position)
    }

    /// Push every element of `values` under a single lock acquisition
    ///
    /// One consumer is signalled per element after the lock is dropped.
    /// Returns how many elements were pushed.
    ///
    /// # Errors
    ///
    /// Stops at the first element that cannot be stored and returns the
    /// error. Elements pushed before the failure stay in the queue and are
    /// signalled; the rest of `values` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// assert_eq!(queue.push_batch(vec![1, 2, 3, 4, 5])?, 5);
    /// assert_eq!(queue.len(), 5);
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn push_batch<I>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
    {
        // Declared before the write guard so it drops after it, on unwind too.
        let mut batch = PendingSignal {
            queue: self,
            pushed: 0,
        };
        let result = {
            let mut storage = self.storage.write();
            Self::push_all(&self.gate, &mut storage, values.into_iter(), &mut batch.pushed)
        };

        let pushed = batch.pushed;
        drop(batch);
        result.map(|()| pushed)
    }

    fn push_all<I>(gate: &G, storage: &mut S, values: I, pushed: &mut usize) -> Result<()>
    where
        I: Iterator<Item = T>,
    {
        let (lower, _) = values.size_hint();
        gate.admit(storage.len(), lower)?;
        storage.reserve(lower)?;

        for value in values {
            gate.admit(storage.len(), 1)?;
            storage.push_back(value)?;
            *pushed += 1;
        }
        Ok(())
    }

    /// Pop the front element if one is available right now
    ///
    /// Never waits for producers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// assert_eq!(queue.try_pop(), None);
    /// queue.push(7)?;
    /// assert_eq!(queue.try_pop(), Some(7));
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn try_pop(&self) -> Option<T> {
        let value = self.gate.try_claim(&*self.storage);
        match value {
            Some(_) => self.metrics.record_pop(1),
            None => self.metrics.record_empty_pop(),
        }
        value
    }

    /// Pop the front element, blocking until there is one
    ///
    /// There is no cancellation. A blocked call returns only once an element
    /// is available to it; use [`pop_wait_for`](Self::pop_wait_for) to bound
    /// the wait.
    pub fn pop_wait(&self) -> T {
        let started = self.wait_clock();
        let Claim { value, blocked } = self.gate.claim(&*self.storage);
        self.record_claim(started, blocked, true);
        value
    }

    /// Pop the front element, blocking for at most `timeout`
    ///
    /// Returns `None` if nothing could be popped in time. The bound is
    /// best-effort: the thread may oversleep by scheduler granularity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    /// use std::time::Duration;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// assert_eq!(queue.pop_wait_for(Duration::from_millis(10)), None);
    /// ```
    pub fn pop_wait_for(&self, timeout: Duration) -> Option<T> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.pop_wait_until(deadline),
            None => Some(self.pop_wait()),
        }
    }

    /// Pop the front element, blocking until `deadline` at the latest
    ///
    /// A deadline in the past still takes an element that is already there.
    /// A `None` result does not tell whether the queue stayed empty or
    /// another consumer took the element first.
    pub fn pop_wait_until(&self, deadline: Instant) -> Option<T> {
        let started = self.wait_clock();
        let Claim { value, blocked } = self.gate.claim_until(&*self.storage, deadline);
        self.record_claim(started, blocked, value.is_some());
        if value.is_none() {
            trace!("timed pop gave up");
        }
        value
    }

    /// Pop every element that is available right now, in FIFO order
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let queue: MpmcQueue<i32> = MpmcQueue::new();
    /// queue.push_batch(1..=3)?;
    /// assert_eq!(queue.drain(), vec![1, 2, 3]);
    /// assert!(queue.is_empty());
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn drain(&self) -> Vec<T> {
        let drained = self.gate.drain(&*self.storage);
        self.metrics.record_pop(drained.len() as u64);
        drained
    }

    /// Number of stored elements
    ///
    /// Advisory: other threads may change the answer before the caller sees
    /// it. Do not use it to predict whether a pop will succeed.
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Whether the queue is empty
    ///
    /// Advisory, see [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }

    /// Exchange the contents of `self` and `other` atomically
    ///
    /// No concurrent push or pop on either queue observes a half-swapped
    /// state. Both locks are taken in address order, so two threads swapping
    /// the same pair in opposite directions cannot deadlock. Afterwards every
    /// consumer blocked on either queue is woken to re-check. Swapping a
    /// queue with itself does nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use waitq::queue::MpmcQueue;
    ///
    /// let a: MpmcQueue<i32> = MpmcQueue::new();
    /// let b: MpmcQueue<i32> = MpmcQueue::new();
    /// a.push_batch([1, 2, 3])?;
    /// b.push_batch([4, 5])?;
    ///
    /// a.swap(&b);
    /// assert_eq!(a.drain(), vec![4, 5]);
    /// assert_eq!(b.drain(), vec![1, 2, 3]);
    /// # Ok::<(), waitq::Error>(())
    /// ```
    pub fn swap(&self, other: &Self) {
        if core::ptr::eq(self, other) {
            return;
        }

        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };

        {
            let mut first_storage = first.storage.write();
            let mut second_storage = second.storage.write();
            core::mem::swap(&mut *first_storage, &mut *second_storage);

            trace!(
                first_len = first_storage.len(),
                second_len = second_storage.len(),
                "swapped queue contents"
            );

            first.gate.resync(first_storage.len());
            second.gate.resync(second_storage.len());
        }

        self.gate.wake_all();
        other.gate.wake_all();
    }

    #[cfg(test)]
    pub(crate) fn gate(&self) -> &G {
        &self.gate
    }

    #[inline]
    fn wait_clock(&self) -> Option<Instant> {
        self.metrics.is_enabled().then(Instant::now)
    }

    fn record_claim(&self, started: Option<Instant>, blocked: bool, delivered: bool) {
        if delivered {
            self.metrics.record_pop(1);
        } else {
            self.metrics.record_timeout();
        }
        if blocked {
            if let Some(started) = started {
                self.metrics.record_wait(started.elapsed());
            }
        }
    }
}

impl<T, S: Storage<Item = T>> MpmcQueue<T, SemaphoreGate, S> {
    /// Permits currently available to consumers
    ///
    /// Advisory, like [`len`](Self::len). It reads below `len` while a
    /// consumer sits between claiming a permit and dequeuing, and above it
    /// when a [`swap`](Self::swap) left surplus permits behind.
    pub fn available_permits(&self) -> usize {
        self.gate.available()
    }
}

/// Signals the elements a batch stored, once dropped.
///
/// Elements that made it into storage are signalled even if the caller's
/// iterator panics halfway through the batch.
struct PendingSignal<'a, T, G: Gate, S: Storage<Item = T>> {
    queue: &'a MpmcQueue<T, G, S>,
    pushed: usize,
}

impl<T, G: Gate, S: Storage<Item = T>> Drop for PendingSignal<'_, T, G, S> {
    fn drop(&mut self) {
        self.queue.gate.signal(self.pushed);
        self.queue.metrics.record_push(self.pushed as u64);
    }
}

/// Swap the contents of two queues; same as [`MpmcQueue::swap`].
pub fn swap<T, G: Gate, S: Storage<Item = T>>(a: &MpmcQueue<T, G, S>, b: &MpmcQueue<T, G, S>) {
    a.swap(b);
}

impl<T, G: Gate, S: Storage<Item = T>> Default for MpmcQueue<T, G, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G: Gate, S: Storage<Item = T>> fmt::Debug for MpmcQueue<T, G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcQueue")
            .field("gate", &core::any::type_name::<G>())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T, G: Gate, S: Storage<Item = T>> MetricsCollector for MpmcQueue<T, G, S> {
    fn metrics(&self) -> QueueMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics.set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics.is_enabled()
    }
}
