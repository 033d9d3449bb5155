//! Growable, contiguous element storage backing the heap.
//!
//! Two policies are provided: the standard [`Vec`] and the hand-rolled [`RawBuffer`], which owns
//! its allocation directly and grows by doubling. The queue is generic over either.

mod raw;

use std::alloc::Layout;

use crate::{QueueError, Result};

pub use raw::RawBuffer;

/// An owned, contiguous, resizable sequence supporting append and remove-last.
///
/// Capacities passed to [`reserve`](Storage::reserve) and [`try_reserve`](Storage::try_reserve) are
/// totals, not increments. Storage never shrinks.
pub trait Storage<T> {
    fn with_capacity(capacity: usize) -> Self
    where
        Self: Sized;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Grows the storage to hold at least `capacity` elements.
    ///
    /// # Panics
    /// Panics on capacity overflow and aborts if the allocator refuses the request.
    fn reserve(&mut self, capacity: usize);

    /// Fallible counterpart of [`reserve`](Storage::reserve); the storage is unchanged on error.
    fn try_reserve(&mut self, capacity: usize) -> Result<()>;

    /// Appends `value` after the last element, growing if the storage is full.
    fn push(&mut self, value: T);

    /// Removes and returns the last element, `None` if empty.
    fn pop(&mut self) -> Option<T>;

    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];
}

impl<T> Storage<T> for Vec<T> {
    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn reserve(&mut self, capacity: usize) {
        if capacity > Vec::capacity(self) {
            Vec::reserve_exact(self, capacity - Vec::len(self));
        }
    }

    fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= Vec::capacity(self) {
            return Ok(());
        }
        Layout::array::<T>(capacity).map_err(|_| QueueError::CapacityOverflow)?;
        Vec::try_reserve_exact(self, capacity - Vec::len(self)).map_err(|_| {
            QueueError::AllocationFailed {
                requested: capacity,
            }
        })
    }

    fn push(&mut self, value: T) {
        Vec::push(self, value);
    }

    fn pop(&mut self) -> Option<T> {
        Vec::pop(self)
    }

    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}
