use crate::{
    error::{Error, Result},
    job::{Job, TaskNode},
    types::{TaskId, Travel},
};
use core::cmp::Reverse;
use tracing::{debug, warn};

impl<T, F> Job<T, F> {
    /// Levels the task graph into wavefronts.
    ///
    /// Every task gets a travel: `0` without successors, otherwise one more
    /// than the largest travel among its successors. Tasks are then sorted by
    /// travel, descending, and each travel level becomes one wavefront, the
    /// highest level first. For every registered link `t -> s` the wavefront
    /// of `t` therefore precedes the wavefront of `s`.
    ///
    /// Executing an unplanned job plans it first, so calling this directly is
    /// only needed to inspect the plan.
    ///
    /// A successor link that closes a cycle is ignored for leveling and
    /// reported as a warning; the order of a cyclic graph is unspecified.
    ///
    /// # Errors
    /// [`Error::AllocationFailure`] if the wavefront array cannot be
    /// allocated. The previous plan is kept in that case.
    pub fn plan(&mut self) -> Result<()> {
        let max_travel = level(&mut self.tasks);
        self.leveled = true;
        let group_count = max_travel + 1;

        let mut groups = Vec::new();
        groups
            .try_reserve_exact(group_count)
            .map_err(Error::allocation("wavefront groups"))?;

        let Self { tasks, sorted, .. } = self;
        let travel_of = |task: TaskId| tasks[task].travel.get().unwrap_or(0);
        for (position, slot) in sorted.iter_mut().enumerate() {
            *slot = position;
        }
        sorted.sort_unstable_by_key(|&task| Reverse(travel_of(task)));

        let mut start = 0;
        for group in 0..group_count {
            let travel = group_count - group - 1;
            let len = sorted[start..]
                .iter()
                .take_while(|&&task| travel_of(task) == travel)
                .count();
            groups.push(start..start + len);
            start += len;
        }
        debug_assert_eq!(start, sorted.len(), "Job::plan: unassigned tasks");

        self.groups = groups;
        self.planned = true;
        debug!(
            tasks = self.tasks.len(),
            groups = group_count,
            "planned wavefronts"
        );
        Ok(())
    }
}

/// Computes the travel of every task not memoized yet and returns the
/// largest travel in the graph.
///
/// Depth-first with an explicit stack of `(task, next successor position)`
/// frames, so chain length is bounded by memory rather than by the call
/// stack.
fn level(tasks: &mut [TaskNode]) -> usize {
    let mut max_travel = 0;
    let mut stack: Vec<(TaskId, usize)> = Vec::new();
    for root in 0..tasks.len() {
        match tasks[root].travel {
            Travel::Set(travel) => {
                max_travel = max_travel.max(travel);
                continue;
            }
            Travel::Pending => unreachable!("level: pending task outside traversal"),
            Travel::Unset => {}
        }
        tasks[root].travel = Travel::Pending;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let task = frame.0;
            if let Some(&successor) = tasks[task].successors.get(frame.1) {
                frame.1 += 1;
                match tasks[successor].travel {
                    Travel::Unset => {
                        tasks[successor].travel = Travel::Pending;
                        stack.push((successor, 0));
                    }
                    Travel::Pending => {
                        warn!(task, successor, "successor link closes a cycle, ignoring it");
                    }
                    Travel::Set(_) => {}
                }
                continue;
            }
            // All successors are resolved, except links back into the stack.
            let travel = tasks[task]
                .successors
                .iter()
                .filter_map(|&successor| tasks[successor].travel.get())
                .map(|travel| travel + 1)
                .max()
                .unwrap_or(0);
            tasks[task].travel = Travel::Set(travel);
            max_travel = max_travel.max(travel);
            stack.pop();
        }
    }
    max_travel
}
