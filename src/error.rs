use crate::QueueLabel;
use thiserror::Error;

/// Errors produced when handing a job to a [Queue](crate::Queue).
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has been shut down and no longer accepts jobs.
    #[error("execution queue `{label}` is closed")]
    Closed { label: QueueLabel },
    /// The worker thread for a new queue could not be started.
    #[error("unable to spawn worker for execution queue `{label}`")]
    Spawn {
        label: QueueLabel,
        #[source]
        source: std::io::Error,
    },
}
