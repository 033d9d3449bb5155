use std::{cmp::Ordering, time::Instant};

/// A unit of work moving through the queue under test.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub priority: u64,
    pub enqueued_at: Instant,
}

impl Job {
    pub fn new(id: u64, priority: u64) -> Self {
        Self {
            id,
            priority,
            enqueued_at: Instant::now(),
        }
    }

    /// Priority is determined using the following criteria:
    /// - A higher `priority` value ranks higher.
    /// - On equal priority, the lower id (submitted earlier by its producer) ranks higher.
    fn rank(&self, other: &Self) -> Ordering {
        if self.priority != other.priority {
            return self.priority.cmp(&other.priority);
        }
        other.id.cmp(&self.id)
    }
}

// region:    --- Implementation of ordering traits to support a max-queue of jobs

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

// endregion: --- Implementation of ordering traits
