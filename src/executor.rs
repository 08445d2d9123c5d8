use crate::{
    error::Result,
    job::Job,
    team::{Team, Wavefront},
    types::{TaskId, WorkerIndex},
    utils::RangeChunk,
};
use std::time::Instant;
use tracing::trace;

impl Team {
    /// Executes every task of `job` exactly once, wavefront by wavefront.
    ///
    /// Plans the job first if its graph changed since the last execution.
    /// Each wavefront is complete before the next one starts:
    /// - a single-threaded team runs all of them on the calling thread, as
    ///   worker `0`;
    /// - otherwise wavefronts smaller than the team run on the calling
    ///   thread as worker `0`, and larger ones are split into one contiguous
    ///   chunk per worker and dispatched.
    ///
    /// # Errors
    /// Only planning can fail (see [`Job::plan`]); nothing runs in that case.
    ///
    /// # Panics
    /// Resumes a panic raised by the callback once the current wavefront has
    /// been drained. Tasks of later wavefronts are not run.
    pub fn execute<T, F>(&mut self, job: &mut Job<T, F>) -> Result<()>
    where
        T: Sync,
        F: Fn(WorkerIndex, TaskId, &T) + Sync,
    {
        let started = Instant::now();
        if !job.is_planned() {
            let planning = Instant::now();
            job.plan()?;
            self.stats.plan_time += planning.elapsed();
        }

        let job = &*job;
        let threads = self.threads();
        let Self { pool, stats, .. } = self;
        for group in 0..job.group_count() {
            let positions = job.group_range(group);
            match pool.as_ref() {
                Some(pool) if positions.len() >= threads => {
                    let section = Instant::now();
                    stats.master_wait_time += pool.run_group(job, group);
                    stats.parallel_time += section.elapsed();
                    stats.dispatched_groups += 1;
                }
                _ => {
                    trace!(group, tasks = positions.len(), "running wavefront inline");
                    job.run_positions(0, positions);
                    stats.inline_groups += 1;
                }
            }
        }

        stats.jobs += 1;
        stats.total_time += started.elapsed();
        Ok(())
    }
}

impl<T, F> Wavefront for Job<T, F>
where
    T: Sync,
    F: Fn(WorkerIndex, TaskId, &T) + Sync,
{
    fn run_share(&self, group: usize, worker: WorkerIndex, workers: usize) {
        let positions = self.group_range(group).chunk(worker, workers);
        if !positions.is_empty() {
            self.run_positions(worker, positions);
        }
    }
}
