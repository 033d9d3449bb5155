use std::{
    alloc::{self, Layout},
    fmt,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    slice,
};

use super::Storage;
use crate::{QueueError, Result};

/// A hand-rolled growable array.
///
/// Capacity starts at zero, becomes one on the first append and doubles from there. Growing
/// allocates a fresh buffer, moves the live elements over and releases the old buffer. Zero-sized
/// element types never allocate.
pub struct RawBuffer<T> {
    ptr: NonNull<T>,
    cap: usize,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: `RawBuffer` uniquely owns its elements, like `Vec`.
unsafe impl<T: Send> Send for RawBuffer<T> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

impl<T> RawBuffer<T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Layout of the live allocation. Only meaningful while `cap > 0` and `T` is not zero-sized.
    fn current_layout(&self) -> Layout {
        // SAFETY: the same size and alignment were validated by `Layout::array` when the buffer
        // was allocated.
        unsafe {
            Layout::from_size_align_unchecked(mem::size_of::<T>() * self.cap, mem::align_of::<T>())
        }
    }

    fn grow_to(&mut self, capacity: usize, layout: Layout) -> Result<()> {
        debug_assert!(!Self::IS_ZST && capacity > self.cap);

        // SAFETY: `layout` has a non-zero size, `T` is not zero-sized and `capacity > 0`.
        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        let Some(new_ptr) = NonNull::new(raw) else {
            return Err(QueueError::AllocationFailed {
                requested: capacity,
            });
        };

        if self.cap > 0 {
            // SAFETY: the old buffer holds `len` initialized elements, the new one has room for
            // at least as many, and the two allocations are distinct. After the bitwise move the
            // old slots are treated as uninitialized and released without dropping.
            unsafe {
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
                alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.current_layout());
            }
        }

        self.ptr = new_ptr;
        self.cap = capacity;
        Ok(())
    }
}

impl<T> Storage<T> for RawBuffer<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::new();
        buffer.reserve(capacity);
        buffer
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.cap
    }

    fn reserve(&mut self, capacity: usize) {
        if capacity <= self.cap {
            return;
        }
        let Ok(layout) = Layout::array::<T>(capacity) else {
            panic!("capacity overflow");
        };
        if self.grow_to(capacity, layout).is_err() {
            alloc::handle_alloc_error(layout);
        }
    }

    fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.cap {
            return Ok(());
        }
        let layout = Layout::array::<T>(capacity).map_err(|_| QueueError::CapacityOverflow)?;
        self.grow_to(capacity, layout)
    }

    fn push(&mut self, value: T) {
        if self.len == self.cap {
            if Self::IS_ZST {
                panic!("capacity overflow");
            }
            let next = if self.cap == 0 { 1 } else { self.cap.saturating_mul(2) };
            self.reserve(next);
        }

        // SAFETY: `len < cap`, so the slot is inside the allocation and currently unused.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and is no longer counted by
        // `len`, so ownership moves out exactly once.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; `ptr` is non-null and aligned even when
        // dangling.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: drops exactly the `len` initialized elements, then frees the allocation that
        // `grow_to` made with the same layout.
        unsafe {
            ptr::drop_in_place(self.as_mut_slice());
            if !Self::IS_ZST && self.cap > 0 {
                alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.current_layout());
            }
        }
    }
}

impl<T> Default for RawBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
