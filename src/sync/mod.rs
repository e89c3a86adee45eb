//! Blocking primitives the queue gates are built from.
//!
//! - [`CondvarAny`]: a condition variable that waits on a `parking_lot`
//!   reader-writer lock held in write mode
//! - [`Semaphore`]: a counting semaphore with blocking, non-blocking and timed
//!   acquire

pub mod condvar_any;
pub mod semaphore;

pub use condvar_any::CondvarAny;
pub use semaphore::Semaphore;
