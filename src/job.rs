mod plan;

use crate::{
    error::{Error, Result},
    types::{GroupRange, TaskId, Travel, WorkerIndex},
};
use core::mem;
use derive_more::Debug;

/// A fixed-size graph of tasks plus its cached wavefront plan.
///
/// Tasks are identified by their index `0..task_count`. Each task may name
/// successors: tasks that must not start before it has completed. Executing
/// the job on a [`Team`](crate::team::Team) levels the graph into
/// wavefronts (see [`Job::plan`]) and invokes the callback exactly once per
/// task, as `callback(worker, task, &context)`.
///
/// The context is never inspected by the job; it is only handed to the
/// callback. Tasks of one wavefront may run concurrently, so the callback
/// must only touch state that is disjoint between mutually independent
/// tasks, or synchronize on its own.
#[must_use]
#[derive(Debug)]
pub struct Job<T, F> {
    tasks: Vec<TaskNode>,
    /// Task ids ordered by travel, descending, once planned.
    sorted: Vec<TaskId>,
    /// One range of `sorted` per wavefront, in execution order.
    groups: Vec<GroupRange>,
    planned: bool,
    /// Whether any travel value is memoized.
    leveled: bool,
    #[debug(skip)]
    context: T,
    #[debug(skip)]
    callback: F,
}

#[must_use]
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskNode {
    /// Ids of tasks that may only start after this one. Never contains the
    /// task itself.
    successors: Vec<TaskId>,
    travel: Travel,
}

impl<T, F> Job<T, F>
where
    F: Fn(WorkerIndex, TaskId, &T),
{
    /// Creates a job of `task_count` independent tasks.
    ///
    /// Until successors are registered the job consists of a single
    /// wavefront spanning every task.
    ///
    /// # Errors
    /// [`Error::AllocationFailure`] if the task arrays cannot be allocated.
    pub fn new(task_count: usize, context: T, callback: F) -> Result<Self> {
        let mut tasks = Vec::new();
        tasks
            .try_reserve_exact(task_count)
            .map_err(Error::allocation("task records"))?;
        tasks.resize_with(task_count, TaskNode::default);

        let mut sorted = Vec::new();
        sorted
            .try_reserve_exact(task_count)
            .map_err(Error::allocation("sorted task index"))?;
        sorted.extend(0..task_count);

        let mut groups = Vec::new();
        groups
            .try_reserve_exact(1)
            .map_err(Error::allocation("wavefront groups"))?;
        groups.push(0..task_count);

        Ok(Self {
            tasks,
            sorted,
            groups,
            planned: false,
            leveled: false,
            context,
            callback,
        })
    }

    pub(crate) fn run_positions(&self, worker: WorkerIndex, positions: GroupRange) {
        let Self {
            sorted,
            context,
            callback,
            ..
        } = self;
        for &task in &sorted[positions] {
            callback(worker, task, context);
        }
    }
}

impl<T, F> Job<T, F> {
    /// Replaces the successor list of `task`.
    ///
    /// A successor equal to `task` itself is dropped. Cycles are not
    /// detected here; see [`Job::plan`]. Any successful call invalidates the
    /// cached plan, which is rebuilt on the next execution.
    ///
    /// # Errors
    /// [`Error::InvalidTask`] or [`Error::InvalidSuccessor`] when an id is
    /// out of range. The job is left untouched in that case.
    pub fn add_successors(&mut self, task: TaskId, successors: &[TaskId]) -> Result<()> {
        let task_count = self.tasks.len();
        if task >= task_count {
            return Err(Error::InvalidTask { task, task_count });
        }
        if let Some(&successor) = successors.iter().find(|&&id| id >= task_count) {
            return Err(Error::InvalidSuccessor {
                task,
                successor,
                task_count,
            });
        }
        let mut links = Vec::new();
        links
            .try_reserve_exact(successors.len())
            .map_err(Error::allocation("successor list"))?;
        links.extend(successors.iter().copied().filter(|&id| id != task));

        self.tasks[task].successors = links;
        self.invalidate();
        Ok(())
    }

    /// Drops the cached plan together with every memoized travel value.
    fn invalidate(&mut self) {
        self.planned = false;
        if mem::take(&mut self.leveled) {
            for node in &mut self.tasks {
                node.travel = Travel::Unset;
            }
        }
    }

    /// Number of tasks, fixed at creation.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the cached plan is current.
    #[must_use]
    pub fn is_planned(&self) -> bool {
        self.planned
    }

    /// Number of wavefronts in the current plan.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Task ids of wavefront `index`, in execution order.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<&[TaskId]> {
        let range = self.groups.get(index)?.clone();
        Some(&self.sorted[range])
    }

    /// All wavefronts in execution order.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &[TaskId]> + '_ {
        self.groups.iter().map(|range| &self.sorted[range.clone()])
    }

    /// Registered successors of `task`.
    #[must_use]
    pub fn successors(&self, task: TaskId) -> Option<&[TaskId]> {
        self.tasks.get(task).map(|node| node.successors.as_slice())
    }

    /// Length of the longest successor chain starting at `task`, if planned.
    #[must_use]
    pub fn travel(&self, task: TaskId) -> Option<usize> {
        if !self.planned {
            return None;
        }
        self.tasks.get(task)?.travel.get()
    }

    /// Index of the wavefront `task` belongs to, if planned.
    #[must_use]
    pub fn group_of(&self, task: TaskId) -> Option<usize> {
        let travel = self.travel(task)?;
        self.groups.len().checked_sub(travel + 1)
    }

    /// Shared access to the user context.
    #[must_use]
    pub fn context(&self) -> &T {
        &self.context
    }

    /// Exclusive access to the user context between executions.
    #[must_use]
    pub fn context_mut(&mut self) -> &mut T {
        &mut self.context
    }

    /// Consumes the job, returning the user context.
    #[must_use]
    pub fn into_context(self) -> T {
        self.context
    }

    pub(crate) fn group_range(&self, index: usize) -> GroupRange {
        self.groups[index].clone()
    }
}
