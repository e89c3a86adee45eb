//! Element storage behind the queue lock.
//!
//! Storage is a plain FIFO sequence with no synchronization of its own; the
//! queue only touches it while holding its lock.

use crate::{Error, Result};
use std::collections::{LinkedList, VecDeque};

/// An ordered, unbounded FIFO sequence.
///
/// # Safety
///
/// [`len`](Storage::len) and [`is_empty`](Storage::is_empty) run under the
/// queue's *shared* lock, possibly on several threads at once. Implementations
/// must answer them from bookkeeping alone and never read stored elements.
/// The queue relies on this to be `Sync` when the element type is only `Send`.
pub unsafe trait Storage: Default + Send {
    /// Element type
    type Item;

    /// Append `item` at the back.
    ///
    /// Must report allocation failure as [`Error::AllocationFailed`] instead
    /// of aborting when the underlying collection supports fallible growth.
    fn push_back(&mut self, item: Self::Item) -> Result<()>;

    /// Remove the front element
    fn pop_front(&mut self) -> Option<Self::Item>;

    /// Number of stored elements
    fn len(&self) -> usize;

    /// Whether nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make room for `additional` more elements, if the storage can.
    fn reserve(&mut self, additional: usize) -> Result<()> {
        let _ = additional;
        Ok(())
    }
}

// SAFETY: `VecDeque::len` and `is_empty` read the ring buffer's length only.
unsafe impl<T: Send> Storage for VecDeque<T> {
    type Item = T;

    #[inline]
    fn push_back(&mut self, item: T) -> Result<()> {
        if self.len() == self.capacity() {
            self.try_reserve(1).map_err(Error::from)?;
        }
        VecDeque::push_back(self, item);
        Ok(())
    }

    #[inline]
    fn pop_front(&mut self) -> Option<T> {
        VecDeque::pop_front(self)
    }

    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        VecDeque::is_empty(self)
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.try_reserve(additional).map_err(Error::from)
    }
}

// SAFETY: `LinkedList` keeps its length in a field next to the head and tail
// pointers.
unsafe impl<T: Send> Storage for LinkedList<T> {
    type Item = T;

    // `LinkedList` has no fallible node allocation; running out of memory
    // aborts instead of reaching this error path.
    #[inline]
    fn push_back(&mut self, item: T) -> Result<()> {
        LinkedList::push_back(self, item);
        Ok(())
    }

    #[inline]
    fn pop_front(&mut self) -> Option<T> {
        LinkedList::pop_front(self)
    }

    #[inline]
    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        LinkedList::is_empty(self)
    }
}
