//! A thread-safe, heap-ordered blocking queue for handing work items between threads by
//! priority instead of arrival order.
//!
//! The queue is assembled from three layers: a growable [`Storage`] policy, the binary-heap
//! repair routines in [`heap`], and the lock/condition-variable protocol of [`PriorityQueue`].

mod comparator;
mod error;
pub mod heap;
mod queue;
mod storage;
#[cfg(test)]
mod test;

// region:    --- Exports
pub use comparator::{Ascending, Comparator, Descending};
pub use error::{QueueError, Result};
pub use queue::{MaxQueue, MinQueue, PriorityQueue};
pub use storage::{RawBuffer, Storage};
// endregion: --- Exports
