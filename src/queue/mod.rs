//! Queue implementations
//!
//! This module provides the blocking MPMC queue and its building blocks.
//!
//! ## Available Queues
//!
//! - [`MpmcQueue`]: the queue, generic over its wake [`Gate`] and [`Storage`]
//! - [`CondvarQueue`]: `MpmcQueue` with the condition-variable gate (default)
//! - [`SemaphoreQueue`]: `MpmcQueue` with the counting-permit gate
//!
//! ## Choosing a Gate
//!
//! | Gate | Wait mechanism | Strengths | Limits |
//! |------|----------------|-----------|--------|
//! | [`CondvarGate`] | predicate wait under the lock | any predicate, no count limit | woken consumers re-check under the lock |
//! | [`SemaphoreGate`] | permit, then lock | O(1) claimable count, waiters off the lock | at most `Semaphore::MAX_PERMITS` stored elements |
//!
//! Both gates give the same guarantees: FIFO per producer, every element
//! delivered exactly once, producers never wait for consumers.
//!
//! ## Examples
//!
//! ```rust
//! use waitq::queue::{CondvarQueue, SemaphoreQueue};
//! use std::time::Duration;
//!
//! let condvar: CondvarQueue<i32> = CondvarQueue::new();
//! condvar.push(42)?;
//! assert_eq!(condvar.pop_wait(), 42);
//!
//! let semaphore: SemaphoreQueue<&str> = SemaphoreQueue::new();
//! semaphore.push("hello")?;
//! assert_eq!(semaphore.pop_wait_for(Duration::from_millis(10)), Some("hello"));
//!
//! # Ok::<(), waitq::Error>(())
//! ```
pub mod gate;
pub mod mpmc;
pub mod storage;

pub use gate::{Claim, CondvarGate, Gate, SemaphoreGate};
pub use mpmc::{swap, CondvarQueue, MpmcQueue, SemaphoreQueue};
pub use storage::Storage;


#[cfg(test)]
mod proptests;
