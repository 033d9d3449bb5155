use std::{
    fmt,
    marker::PhantomData,
    sync::{
        Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use tracing::{debug, trace};

use crate::{Ascending, Comparator, Descending, QueueError, Result, Storage, heap};

/// Smallest element first.
pub type MinQueue<T, S = Vec<T>> = PriorityQueue<T, Ascending, S>;
/// Largest element first.
pub type MaxQueue<T, S = Vec<T>> = PriorityQueue<T, Descending, S>;

#[derive(Debug)]
struct State<S> {
    heap: S,
    shut_down: bool,
}

/// A blocking priority queue for handing items between threads.
///
/// Elements leave in comparator order, never in arrival order, and elements the comparator
/// considers equal leave in no particular order. One mutex guards the heap and the shutdown flag;
/// waiting threads release it while parked.
///
/// The queue is not `Clone`. Share it between threads through an [`Arc`](std::sync::Arc) and make
/// sure every thread blocked inside it has returned (typically: [`shutdown`](Self::shutdown),
/// then join) before dropping the last handle.
pub struct PriorityQueue<T, C = Ascending, S = Vec<T>> {
    state: Mutex<State<S>>,
    /// Signalled when an element arrives or the queue shuts down.
    readable: Condvar,
    /// Signalled when the queue runs empty or shuts down.
    drained: Condvar,
    comparator: C,

    // -- Mirrors of the guarded state for the lock-free observers.
    len: AtomicUsize,
    shut_down: AtomicBool,

    _marker: PhantomData<Mutex<T>>,
}

impl<T, C, S> PriorityQueue<T, C, S>
where
    C: Comparator<T> + Default,
    S: Storage<T>,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a queue whose storage can hold `capacity` elements before it needs to grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, C::default())
    }
}

impl<T, C, S> PriorityQueue<T, C, S>
where
    C: Comparator<T>,
    S: Storage<T>,
{
    pub fn with_comparator(comparator: C) -> Self {
        Self::with_capacity_and_comparator(0, comparator)
    }

    pub fn with_capacity_and_comparator(capacity: usize, comparator: C) -> Self {
        Self {
            state: Mutex::new(State {
                heap: S::with_capacity(capacity),
                shut_down: false,
            }),
            readable: Condvar::new(),
            drained: Condvar::new(),
            comparator,
            len: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    // region:    --- Non-blocking operations

    /// Inserts `item` and wakes one thread waiting for data. Never blocks on other waiters.
    ///
    /// Items pushed after [`shutdown`](Self::shutdown) are still accepted and can be popped.
    ///
    /// # Panics
    /// Storage growth panics on capacity overflow and aborts if the allocator refuses.
    pub fn push(&self, item: T) {
        let mut state = self.lock();
        self.insert(&mut state, item);
    }

    /// Removes and returns the element that comes first in heap order.
    ///
    /// # Error
    /// Returns [`QueueError::Empty`] if there is nothing to remove. Callers that expect to wait
    /// for data should use [`wait_for_nonempty_pop`](Self::wait_for_nonempty_pop).
    pub fn pop(&self) -> Result<T> {
        let mut state = self.lock();
        self.take_root(&mut state).ok_or_else(|| Self::misuse("pop"))
    }

    /// Returns a copy of the element that would be popped next, leaving it in place.
    ///
    /// # Error
    /// Returns [`QueueError::Empty`] if the queue holds no elements.
    pub fn top(&self) -> Result<T>
    where
        T: Clone,
    {
        self.top_with(T::clone)
    }

    /// Runs `f` on the element that would be popped next while the lock is held.
    ///
    /// Keep `f` short: every other operation on the queue waits for it.
    pub fn top_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let state = self.lock();
        state
            .heap
            .as_slice()
            .first()
            .map(f)
            .ok_or_else(|| Self::misuse("top"))
    }

    /// Removes up to `n` elements in heap order without blocking.
    pub fn drain(&self, n: usize) -> Vec<T> {
        let mut state = self.lock();

        let mut items = Vec::with_capacity(n.min(state.heap.len()));
        for _ in 0..n {
            let Some(item) = self.take_root(&mut state) else {
                break;
            };
            items.push(item);
        }
        items
    }

    /// Makes room for at least `additional` more elements without aborting on failure.
    pub fn try_reserve(&self, additional: usize) -> Result<()> {
        let mut state = self.lock();
        let wanted = state
            .heap
            .len()
            .checked_add(additional)
            .ok_or(QueueError::CapacityOverflow)?;
        state.heap.try_reserve(wanted)
    }

    // endregion: --- Non-blocking operations

    // region:    --- Blocking operations

    /// Blocks until an element is available, then removes and returns it.
    ///
    /// Returns `None` once the queue is shut down and empty. Elements still queued at shutdown are
    /// handed out first, so consumers can loop on this until `None` to drain the queue.
    pub fn wait_for_nonempty_pop(&self) -> Option<T> {
        let mut state = self.wait_readable();
        self.take_root(&mut state)
    }

    /// Blocks until an element is available and returns a copy of it without removing it.
    ///
    /// Returns `None` once the queue is shut down and empty.
    pub fn wait_for_nonempty_peek(&self) -> Option<T>
    where
        T: Clone,
    {
        let state = self.wait_readable();
        let top = state.heap.as_slice().first().cloned();
        if top.is_some() {
            // The element is still there: pass the wake-up on to a thread that may consume it.
            self.readable.notify_one();
        }
        top
    }

    /// Blocks until the queue is empty, then inserts `item`.
    ///
    /// Producers use this to keep at most one item in flight. The bound is a convention between
    /// cooperating callers, plain [`push`](Self::push) still bypasses it. If the queue shuts down
    /// before it drains, `item` is dropped without notice.
    pub fn wait_for_empty_push(&self, item: T) {
        let mut state = self
            .drained
            .wait_while(self.lock(), |state| {
                !state.heap.is_empty() && !state.shut_down
            })
            .unwrap_or_else(PoisonError::into_inner);

        if state.shut_down {
            trace!("queue is shut down, discarding item");
            return;
        }
        self.insert(&mut state, item);
    }

    // endregion: --- Blocking operations

    /// Moves the queue into its terminal shut-down state and wakes every waiting thread.
    ///
    /// Blocked pops and peeks return `None` once the queue is empty, blocked empty-pushes discard
    /// their item. Calling this again has no effect.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            self.shut_down.store(true, Ordering::Release);
            debug!(remaining = state.heap.len(), "priority queue shut down");
        }

        // Notify after unlock.
        self.readable.notify_all();
        self.drained.notify_all();
    }

    // region:    --- Observers

    /// Best-effort snapshot: may be stale by the time the caller acts on it.
    pub fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Best-effort snapshot: may be stale by the time the caller acts on it.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Best-effort snapshot: may be stale by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().heap.capacity()
    }

    // endregion: --- Observers

    /// A comparator that panics while the lock is held poisons the mutex. The heap is still
    /// memory-safe at that point, so the guard is recovered instead of propagating the panic.
    fn lock(&self) -> MutexGuard<'_, State<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_readable(&self) -> MutexGuard<'_, State<S>> {
        self.readable
            .wait_while(self.lock(), |state| {
                state.heap.is_empty() && !state.shut_down
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, state: &mut State<S>, item: T) {
        state.heap.push(item);
        // Published before the comparator runs: a panicking comparator must not leave it stale.
        self.len.store(state.heap.len(), Ordering::Release);

        let last = state.heap.len() - 1;
        heap::percolate_up(state.heap.as_mut_slice(), last, &self.comparator);
        self.readable.notify_one();
    }

    /// Swaps the root into the last slot, repairs the heap in front of it and only then removes
    /// it, so the element stays in storage if the comparator panics.
    fn take_root(&self, state: &mut State<S>) -> Option<T> {
        let n = state.heap.len();
        if n == 0 {
            return None;
        }

        let slice = state.heap.as_mut_slice();
        slice.swap(0, n - 1);
        heap::percolate_down(&mut slice[..n - 1], 0, &self.comparator);

        let root = state.heap.pop()?;
        self.len.store(state.heap.len(), Ordering::Release);
        if state.heap.is_empty() {
            self.drained.notify_one();
        }
        Some(root)
    }

    fn misuse(op: &'static str) -> QueueError {
        debug!(op, "non-blocking read on empty queue");
        QueueError::Empty { op }
    }
}

impl<T, C, S> Default for PriorityQueue<T, C, S>
where
    C: Comparator<T> + Default,
    S: Storage<T>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, S> fmt::Debug for PriorityQueue<T, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::{MaxQueue, MinQueue, PriorityQueue};
    use crate::{QueueError, RawBuffer, heap};

    #[test]
    fn ascending_pops_smallest_first() {
        let queue: MinQueue<i32> = PriorityQueue::new();
        queue.push(5);
        queue.push(3);
        queue.push(8);

        assert_eq!(queue.pop(), Ok(3));
        assert_eq!(queue.pop(), Ok(5));
        assert_eq!(queue.pop(), Ok(8));
    }

    #[test]
    fn descending_pops_largest_first() {
        let queue: MaxQueue<i32, RawBuffer<i32>> = PriorityQueue::new();
        queue.push(5);
        queue.push(3);
        queue.push(8);

        assert_eq!(queue.pop(), Ok(8));
        assert_eq!(queue.pop(), Ok(5));
        assert_eq!(queue.pop(), Ok(3));
    }

    #[test]
    fn round_trip_leaves_queue_empty() {
        let queue: MinQueue<String> = PriorityQueue::new();
        queue.push("only".to_string());
        assert_eq!(queue.pop().as_deref(), Ok("only"));
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pop_and_top_on_empty_are_misuse() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        assert_eq!(queue.pop(), Err(QueueError::Empty { op: "pop" }));
        assert_eq!(queue.top(), Err(QueueError::Empty { op: "top" }));
    }

    #[test]
    fn top_does_not_remove() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        queue.push(4);
        queue.push(2);
        assert_eq!(queue.top(), Ok(2));
        assert_eq!(queue.top_with(|v| *v * 10), Ok(20));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn custom_comparator_orders_by_key() {
        let queue = PriorityQueue::<(u32, &str), _, Vec<_>>::with_comparator(
            |a: &(u32, &str), b: &(u32, &str)| a.0 > b.0,
        );
        queue.push((1, "low"));
        queue.push((9, "urgent"));
        queue.push((4, "normal"));

        let order: Vec<_> = queue.drain(10).into_iter().map(|(_, name)| name).collect();
        assert_eq!(order, vec!["urgent", "normal", "low"]);
    }

    #[test]
    fn drain_stops_at_available_items() {
        let queue: MinQueue<u32> = PriorityQueue::with_capacity(16);
        for i in (0..6).rev() {
            queue.push(i);
        }
        assert_eq!(queue.drain(4), vec![0, 1, 2, 3]);
        assert_eq!(queue.drain(4), vec![4, 5]);
        assert!(queue.drain(4).is_empty());
    }

    #[test]
    fn with_capacity_preallocates() {
        let queue: MinQueue<u64, RawBuffer<u64>> = PriorityQueue::with_capacity(32);
        assert_eq!(queue.capacity(), 32);
        assert_eq!(queue.try_reserve(8), Ok(()));
        assert_eq!(queue.capacity(), 32);
        assert_eq!(
            queue.try_reserve(usize::MAX),
            Err(QueueError::CapacityOverflow)
        );
    }

    #[test]
    fn heap_invariant_holds_after_mixed_operations() {
        let queue: MinQueue<i64> = PriorityQueue::new();
        for i in 0..200i64 {
            queue.push((i * 7919) % 211);
            if i % 3 == 0 {
                queue.pop().unwrap();
            }
            let ok = {
                let state = queue.lock();
                heap::is_heap(state.heap.as_slice(), &queue.comparator)
            };
            assert!(ok);
        }
    }

    #[test]
    fn shutdown_is_idempotent_and_keeps_items() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        queue.push(1);
        queue.shutdown();
        queue.shutdown();

        assert!(queue.is_shutdown());
        assert_eq!(queue.wait_for_nonempty_peek(), Some(1));
        assert_eq!(queue.wait_for_nonempty_pop(), Some(1));
        assert_eq!(queue.wait_for_nonempty_pop(), None);
        assert_eq!(queue.wait_for_nonempty_peek(), None);
    }

    #[test]
    fn empty_push_after_shutdown_discards() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        queue.shutdown();
        queue.wait_for_empty_push(3);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_push_on_empty_queue_inserts_immediately() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        queue.wait_for_empty_push(3);
        assert_eq!(queue.pop(), Ok(3));
    }

    /// Every peeker waiting on the same item is released, not just the first one woken.
    #[test]
    fn peek_wakeup_is_passed_on() {
        let queue: Arc<MinQueue<u32>> = Arc::new(PriorityQueue::new());
        let peeked = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let peeked = Arc::clone(&peeked);
                thread::spawn(move || {
                    assert_eq!(queue.wait_for_nonempty_peek(), Some(42));
                    peeked.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        queue.push(42);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(peeked.load(Ordering::SeqCst), 4);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn panicking_comparator_does_not_wedge_queue() {
        let queue = Arc::new(PriorityQueue::<i32, _, Vec<i32>>::with_comparator(
            |a: &i32, b: &i32| {
                assert!(*a != -1 && *b != -1, "poisoned value");
                a < b
            },
        ));
        queue.push(1);

        let cloned = Arc::clone(&queue);
        let result = thread::spawn(move || cloned.push(-1)).join();
        assert!(result.is_err());

        // -- the half-finished insert stays in storage, the root is untouched
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.top(), Ok(1));
        assert_eq!(queue.drain(10), vec![1, -1]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn panicking_comparator_during_pop_keeps_every_element() {
        let armed = Arc::new(AtomicBool::new(false));
        let cmp_armed = Arc::clone(&armed);
        let queue = Arc::new(PriorityQueue::<i32, _, Vec<i32>>::with_comparator(
            move |a: &i32, b: &i32| {
                assert!(!cmp_armed.load(Ordering::SeqCst), "comparator armed");
                a < b
            },
        ));
        for value in [1, 2, 3, 7] {
            queue.push(value);
        }

        armed.store(true, Ordering::SeqCst);
        let cloned = Arc::clone(&queue);
        let result = thread::spawn(move || cloned.pop()).join();
        assert!(result.is_err());
        armed.store(false, Ordering::SeqCst);

        assert_eq!(queue.len(), 4);
        let mut drained = queue.drain(10);
        assert_eq!(queue.len(), 0);
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2, 3, 7]);
    }

    #[test]
    fn debug_shows_len_and_state() {
        let queue: MinQueue<u8> = PriorityQueue::new();
        queue.push(1);
        assert_eq!(
            format!("{queue:?}"),
            "PriorityQueue { len: 1, shut_down: false, .. }"
        );
    }
}
