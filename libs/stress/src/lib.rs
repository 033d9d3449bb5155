//! Multi-threaded stress harness for [`prio_queue::PriorityQueue`].
//!
//! Producers push prioritized [`Job`]s, consumers pop them until the queue shuts down, and the
//! results report whether every job was delivered exactly once.

mod job;
mod stress;

// region:    --- Exports
pub use job::Job;
pub use stress::{StressTestConfig, TestResults, run_stress_test};
// endregion: --- Exports
