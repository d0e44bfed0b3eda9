use dm_core::{ProcessId, Tick};
use thiserror::Error;

use crate::{Cause, Ticket};

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("negative delay {delay} requested at {now} (process {pid:?})")]
    InvalidDelay {
        pid:   Option<ProcessId>,
        delay: i64,
        now:   Tick,
    },

    #[error("event queue exhausted at {now}")]
    QueueExhausted { now: Tick },

    #[error("resource {resource:?}: ticket {ticket} released at {now} is not held")]
    ResourceMisuse {
        resource: String,
        ticket:   Ticket,
        now:      Tick,
    },

    #[error("resource {resource:?} must have a positive capacity")]
    ZeroCapacity { resource: String },

    #[error("store {resource:?} is full (capacity {capacity})")]
    StoreFull {
        resource: String,
        capacity: usize,
    },

    #[error("{pid} is not alive")]
    UnknownProcess { pid: ProcessId },

    #[error("{pid} did not handle interrupt {cause:?}")]
    UnhandledInterrupt { pid: ProcessId, cause: Cause },

    #[error("{pid} failed: {source}")]
    Process {
        pid:    ProcessId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl KernelError {
    /// Wrap a model-level error raised inside a process body.
    pub fn process<E>(pid: ProcessId, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KernelError::Process { pid, source: Box::new(source) }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
