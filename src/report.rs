use crate::sync::{AtomicU64, Ordering};
use core::{fmt, time::Duration};

/// Timing summary of a [`Team`](crate::team::Team).
///
/// Diagnostic only: values are wall-clock measurements and carry no
/// behavioral contract.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamReport {
    /// Worker count of the team (`1` when single-threaded).
    pub threads: usize,
    /// Completed `execute` calls.
    pub jobs: u64,
    /// Wavefronts run on the calling thread.
    pub inline_groups: u64,
    /// Wavefronts dispatched to the workers.
    pub dispatched_groups: u64,
    /// Time spent inside `execute`, planning included.
    pub total_time: Duration,
    /// Time spent leveling task graphs.
    pub plan_time: Duration,
    /// Time spent in dispatched wavefronts, from publication to the barrier.
    pub parallel_time: Duration,
    /// Mean time a worker spent running callbacks. Zero for single-threaded
    /// teams.
    pub avg_thread_busy_time: Duration,
    /// Time the calling thread spent blocked on the completion barrier.
    pub master_wait_time: Duration,
}

impl fmt::Display for TeamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            threads,
            jobs,
            inline_groups,
            dispatched_groups,
            total_time,
            plan_time,
            parallel_time,
            avg_thread_busy_time,
            master_wait_time,
        } = self;
        write!(
            f,
            "{threads} threads, {jobs} jobs, \
             {dispatched_groups} dispatched / {inline_groups} inline groups; \
             total {total_time:?}, plan {plan_time:?}, parallel {parallel_time:?}, \
             busy/thread {avg_thread_busy_time:?}, master wait {master_wait_time:?}"
        )
    }
}

/// Counters owned by the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MasterStats {
    pub(crate) jobs: u64,
    pub(crate) inline_groups: u64,
    pub(crate) dispatched_groups: u64,
    pub(crate) total_time: Duration,
    pub(crate) plan_time: Duration,
    pub(crate) parallel_time: Duration,
    pub(crate) master_wait_time: Duration,
}

impl MasterStats {
    pub(crate) fn report(&self, threads: usize, avg_thread_busy_time: Duration) -> TeamReport {
        let &Self {
            jobs,
            inline_groups,
            dispatched_groups,
            total_time,
            plan_time,
            parallel_time,
            master_wait_time,
        } = self;
        TeamReport {
            threads,
            jobs,
            inline_groups,
            dispatched_groups,
            total_time,
            plan_time,
            parallel_time,
            avg_thread_busy_time,
            master_wait_time,
        }
    }
}

/// Busy time of one worker, written only by that worker.
#[repr(align(128))]
pub(crate) struct BusyClock {
    nanos: AtomicU64,
}

impl BusyClock {
    pub(crate) fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    pub(crate) fn add(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}
