//! # waitq
//!
//! Blocking multi-producer, multi-consumer FIFO queues for native threads.
//!
//! ## Features
//!
//! - **Unbounded FIFO storage** behind a single reader-writer lock
//! - **Blocking, non-blocking and timed pops**: `try_pop`, `pop_wait`,
//!   `pop_wait_for`, `pop_wait_until`
//! - **Two interchangeable wake strategies**: a condition variable gate and a
//!   counting semaphore gate, selected by a type parameter
//! - **Atomic swap** of the contents of two queues, deadlock free
//!
//! ## Quick Start
//!
//! ```rust
//! use waitq::MpmcQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue: Arc<MpmcQueue<i32>> = Arc::new(MpmcQueue::new());
//!
//! let consumer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || queue.pop_wait())
//! };
//!
//! queue.push(42)?;
//! assert_eq!(consumer.join().unwrap(), 42);
//! # Ok::<(), waitq::Error>(())
//! ```
//!
//! ## Choosing a Gate
//!
//! - [`CondvarGate`](queue::CondvarGate) (default): consumers wait on the
//!   predicate "storage is non-empty" and re-check it after every wake.
//! - [`SemaphoreGate`](queue::SemaphoreGate): consumers first claim a permit
//!   from a counter of available items, then take the lock to dequeue.
//!
//! Both gates expose the same API and pass the same test suite.
//!
//! ## Thread Safety
//!
//! Producers never wait for consumers; they only contend briefly on the
//! storage lock. `len` and `is_empty` take the lock in shared mode and are
//! advisory: the answer may be stale by the time it is returned.
//!
//! Share a queue between threads with [`std::sync::Arc`]. The queue cannot be
//! moved or dropped while a thread is blocked in it, since that thread holds a
//! borrow.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod metrics;
pub mod queue;
pub mod sync;
pub mod trace;

pub use crate::queue::{CondvarQueue, MpmcQueue, SemaphoreQueue};

/// Common utilities and helper types
pub mod util {
    use core::ops::{Deref, DerefMut};

    /// Cache line size for alignment purposes
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Keeps a value on its own cache line.
    ///
    /// The queue puts its storage lock and its wake gate on separate lines so
    /// producers hammering the lock don't bounce the line waiters park on.
    #[repr(align(64))]
    #[derive(Default)]
    pub struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        /// Create a new cache-padded value
        #[inline]
        pub const fn new(value: T) -> Self {
            Self { value }
        }

        /// Get the inner value
        #[inline]
        pub fn into_inner(self) -> T {
            self.value
        }
    }

    impl<T> Deref for CachePadded<T> {
        type Target = T;

        #[inline]
        fn deref(&self) -> &T {
            &self.value
        }
    }

    impl<T> DerefMut for CachePadded<T> {
        #[inline]
        fn deref_mut(&mut self) -> &mut T {
            &mut self.value
        }
    }

    impl<T: core::fmt::Debug> core::fmt::Debug for CachePadded<T> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Debug::fmt(&self.value, f)
        }
    }
}

/// Error types for queue operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The storage could not grow to hold another element
    AllocationFailed,
    /// The semaphore gate cannot count any more outstanding elements
    PermitOverflow,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::AllocationFailed => write!(f, "Queue storage allocation failed"),
            Error::PermitOverflow => write!(f, "Too many outstanding elements for the permit count"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::AllocationFailed
    }
}

/// Result type for queue operations
pub type Result<T> = core::result::Result<T, Error>;
