
mod raw_buffer {
    use super::suite;
    use crate::{MinQueue, PriorityQueue, RawBuffer};

    struct RawTester;

    impl suite::Tester<RawBuffer<u64>> for RawTester {
        fn create_queue(&self) -> MinQueue<u64, RawBuffer<u64>> {
            PriorityQueue::new()
        }
    }

    #[test]
    fn concurrent_conservation() {
        suite::test_concurrent_conservation(RawTester);
    }

    #[test]
    fn shutdown_wakes_waiters() {
        suite::test_shutdown_wakes_waiters(RawTester);
    }

    #[test]
    fn shutdown_releases_blocked_peek() {
        suite::test_shutdown_releases_blocked_peek(RawTester);
    }

    #[test]
    fn single_slot_handoff() {
        suite::test_single_slot_handoff(RawTester);
    }

    #[test]
    fn shutdown_releases_empty_pusher() {
        suite::test_shutdown_releases_empty_pusher(RawTester);
    }

    #[test]
    fn concurrent_push_then_ordered_drain() {
        suite::test_concurrent_push_then_ordered_drain(RawTester);
    }
}

mod vec_storage {
    use super::suite;
    use crate::{MinQueue, PriorityQueue};

    struct VecTester;

    impl suite::Tester<Vec<u64>> for VecTester {
        fn create_queue(&self) -> MinQueue<u64> {
            PriorityQueue::with_capacity(1_024)
        }
    }

    #[test]
    fn concurrent_conservation() {
        suite::test_concurrent_conservation(VecTester);
    }

    #[test]
    fn shutdown_wakes_waiters() {
        suite::test_shutdown_wakes_waiters(VecTester);
    }

    #[test]
    fn shutdown_releases_blocked_peek() {
        suite::test_shutdown_releases_blocked_peek(VecTester);
    }

    #[test]
    fn single_slot_handoff() {
        suite::test_single_slot_handoff(VecTester);
    }

    #[test]
    fn shutdown_releases_empty_pusher() {
        suite::test_shutdown_releases_empty_pusher(VecTester);
    }

    #[test]
    fn concurrent_push_then_ordered_drain() {
        suite::test_concurrent_push_then_ordered_drain(VecTester);
    }
}
