use core::ops::Range;

/// Identifier of a task: its index in the owning job's task arena.
pub type TaskId = usize;

/// Index of the thread executing a task, in `0..threads`.
///
/// Tasks run inline on the calling thread are reported as worker `0`.
pub type WorkerIndex = usize;

/// Half-open range of positions in a job's sorted task order making up one
/// wavefront.
pub(crate) type GroupRange = Range<usize>;

/// Memoized leveling state of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Travel {
    /// Not computed since the last successor registration.
    #[default]
    Unset,
    /// On the planner's traversal stack.
    Pending,
    /// Length of the longest successor chain starting at this task.
    Set(usize),
}

impl Travel {
    pub(crate) fn get(self) -> Option<usize> {
        match self {
            Self::Set(travel) => Some(travel),
            Self::Unset | Self::Pending => None,
        }
    }
}
