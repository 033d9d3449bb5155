use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A non-blocking read or removal was attempted on a queue without elements.
    /// Callers expecting to wait for data should use the blocking variants instead.
    #[error("{op}() attempted on empty queue")]
    Empty { op: &'static str },

    #[error("capacity overflow")]
    CapacityOverflow,

    #[error("allocation of {requested} slots failed")]
    AllocationFailed { requested: usize },
}
