use crate::types::{TaskId, WorkerIndex};
use std::{collections::TryReserveError, io};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by job construction, graph mutation, planning and team
/// startup.
///
/// None of them leave partially built state behind: a failed `Job::new` or
/// `Team::new` releases what it allocated or spawned, and a rejected
/// `Job::add_successors` leaves the job untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Reserving memory for one of the job's or team's arrays failed.
    #[error("failed to allocate {what}")]
    AllocationFailure {
        /// Which array could not be allocated.
        what: &'static str,
        /// Underlying reservation error.
        #[source]
        source: TryReserveError,
    },
    /// The task id does not belong to the job.
    #[error("task {task} is out of range for a job of {task_count} tasks")]
    InvalidTask {
        /// Offending task id.
        task: TaskId,
        /// Number of tasks in the job.
        task_count: usize,
    },
    /// A successor id does not belong to the job.
    #[error("successor {successor} of task {task} is out of range for a job of {task_count} tasks")]
    InvalidSuccessor {
        /// Task whose successors were being registered.
        task: TaskId,
        /// Offending successor id.
        successor: TaskId,
        /// Number of tasks in the job.
        task_count: usize,
    },
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread {index}")]
    ThreadCreateFailure {
        /// Index of the worker that could not be spawned.
        index: WorkerIndex,
        /// Error returned by the thread builder.
        #[source]
        source: io::Error,
    },
    /// A worker thread terminated before the team finished starting up.
    #[error("worker thread {index} exited during startup")]
    WorkerExited {
        /// Index of the dead worker.
        index: WorkerIndex,
    },
}

impl Error {
    /// Whether the error was caused by a bad task or successor id.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidTask { .. } | Self::InvalidSuccessor { .. })
    }

    pub(crate) fn allocation(what: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| Self::AllocationFailure { what, source }
    }
}
