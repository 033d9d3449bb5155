//! Binary-heap repair routines over an array-embedded heap.
//!
//! Children of index `i` live at `2i + 1` and `2i + 2`, the parent at `(i - 1) / 2`. A slice is a
//! heap when no child precedes its parent under the comparator. None of these functions lock or
//! allocate; the caller owns the slice for the duration of the call.

use crate::Comparator;

#[inline]
fn parent(index: usize) -> usize {
    (index - 1) / 2
}

/// Moves the element at `index` towards the root until its parent no longer comes after it.
///
/// Used after appending a new element to the last slot.
pub fn percolate_up<T, C: Comparator<T> + ?Sized>(heap: &mut [T], mut index: usize, cmp: &C) {
    while index > 0 {
        let parent = parent(index);
        if !cmp.precedes(&heap[index], &heap[parent]) {
            break;
        }
        heap.swap(index, parent);
        index = parent;
    }
}

/// Moves the element at `index` towards the leaves, swapping it with whichever child would be the
/// valid parent, until neither child precedes it.
///
/// Used after the last element has been moved into the root slot.
pub fn percolate_down<T, C: Comparator<T> + ?Sized>(heap: &mut [T], mut index: usize, cmp: &C) {
    let n = heap.len();

    while 2 * index + 1 < n {
        let left = 2 * index + 1;
        let right = left + 1;

        let mut winner = index;
        if cmp.precedes(&heap[left], &heap[winner]) {
            winner = left;
        }
        if right < n && cmp.precedes(&heap[right], &heap[winner]) {
            winner = right;
        }

        if winner == index {
            break;
        }
        heap.swap(index, winner);
        index = winner;
    }
}

/// Checks the heap property for every non-root element.
pub fn is_heap<T, C: Comparator<T> + ?Sized>(heap: &[T], cmp: &C) -> bool {
    (1..heap.len()).all(|i| !cmp.precedes(&heap[i], &heap[parent(i)]))
}
