mod worker;

pub(crate) use self::worker::Wavefront;
use self::worker::JobRef;
use crate::{
    config::TeamConfig,
    error::{Error, Result},
    report::{BusyClock, MasterStats, TeamReport},
    sync::{Arc, Condvar, JoinHandle, Mutex, ThreadBuilder, is_alive, lock, wait},
    types::WorkerIndex,
};
use core::{any::Any, time::Duration};
use derive_more::Debug;
use std::{panic, time::Instant};
use tracing::{debug, trace, warn};

/// A fixed set of long-lived worker threads executing jobs wavefront by
/// wavefront.
///
/// A team of `0` or `1` threads spawns nothing and runs every job on the
/// calling thread. Larger teams keep their workers parked on a condition
/// variable between wavefronts; dropping the team wakes them up for
/// shutdown and joins them.
///
/// `execute` takes `&mut self`: one team runs at most one job at a time.
#[must_use]
#[derive(Debug)]
pub struct Team {
    threads: usize,
    pub(crate) pool: Option<Pool>,
    pub(crate) stats: MasterStats,
}

#[derive(Debug)]
pub(crate) struct Pool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

#[derive(Debug)]
struct Worker {
    index: WorkerIndex,
    #[debug(skip)]
    handle: Option<JoinHandle<()>>,
}

/// State shared between the calling thread and the workers.
#[derive(Debug)]
struct Shared {
    threads: usize,
    /// Master to worker: what to run next.
    #[debug(skip)]
    dispatch: Mutex<Dispatch>,
    #[debug(skip)]
    dispatched: Condvar,
    /// Worker to master: how many workers finished the current wavefront.
    #[debug(skip)]
    completion: Mutex<Completion>,
    #[debug(skip)]
    completed: Condvar,
    #[debug(skip)]
    busy: Vec<BusyClock>,
}

#[derive(Default)]
struct Dispatch {
    /// Bumped for every publication; workers act on a change only, so
    /// spurious wakeups are harmless.
    epoch: u64,
    /// `None` together with a new epoch means shutdown.
    job: Option<JobRef>,
    group: usize,
}

#[derive(Default)]
struct Completion {
    done: usize,
    /// First panic caught on a worker during the current wavefront.
    panic: Option<Box<dyn Any + Send>>,
}

impl Team {
    /// Starts a team of `threads` workers with default settings.
    ///
    /// # Errors
    /// See [`Team::with_config`].
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(&TeamConfig::new(threads))
    }

    /// Starts a team as described by `config`.
    ///
    /// # Errors
    /// [`Error::ThreadCreateFailure`] if a worker cannot be spawned,
    /// [`Error::WorkerExited`] if one dies during startup, and
    /// [`Error::AllocationFailure`] if the worker table cannot be allocated.
    /// Workers spawned before the failure are stopped and joined.
    pub fn with_config(config: &TeamConfig) -> Result<Self> {
        let threads = config.threads();
        let pool = if threads > 1 {
            Some(Pool::spawn(threads, config.thread_name())?)
        } else {
            None
        };
        debug!(threads, parallel = pool.is_some(), "team started");
        Ok(Self {
            threads: threads.max(1),
            pool,
            stats: MasterStats::default(),
        })
    }

    /// Number of workers; `1` for a single-threaded team.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether wavefronts can be dispatched to worker threads.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Timing accumulated since the team was started.
    pub fn report(&self) -> TeamReport {
        let busy = self
            .pool
            .as_ref()
            .map_or(Duration::ZERO, |pool| pool.shared.average_busy());
        self.stats.report(self.threads, busy)
    }

    /// Stops and joins the workers, then reports the final timing.
    fn join(&mut self) -> TeamReport {
        let busy = self.pool.take().map_or(Duration::ZERO, |pool| {
            let shared = Arc::clone(&pool.shared);
            drop(pool);
            shared.average_busy()
        });
        self.stats.report(self.threads, busy)
    }
}

impl Drop for Team {
    fn drop(&mut self) {
        let report = self.join();
        debug!(%report, "team shut down");
    }
}

impl Pool {
    fn spawn(threads: usize, name: &str) -> Result<Self> {
        let mut busy = Vec::new();
        busy.try_reserve_exact(threads)
            .map_err(Error::allocation("worker busy clocks"))?;
        busy.extend((0..threads).map(|_| BusyClock::new()));
        let mut workers = Vec::new();
        workers
            .try_reserve_exact(threads)
            .map_err(Error::allocation("worker descriptors"))?;
        let shared = Arc::new(Shared {
            threads,
            dispatch: Mutex::new(Dispatch::default()),
            dispatched: Condvar::new(),
            completion: Mutex::new(Completion::default()),
            completed: Condvar::new(),
            busy,
        });
        // From here on, dropping `pool` on an early return stops and joins
        // whatever was spawned.
        let mut pool = Self { shared, workers };
        for index in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = ThreadBuilder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker::run(&shared, index))
                .map_err(|source| Error::ThreadCreateFailure { index, source })?;
            pool.workers.push(Worker {
                index,
                handle: Some(handle),
            });
        }
        if let Some(dead) = pool
            .workers
            .iter()
            .find(|worker| !worker.handle.as_ref().is_some_and(is_alive))
        {
            return Err(Error::WorkerExited { index: dead.index });
        }
        Ok(pool)
    }

    /// Runs wavefront `group` of `job` on every worker and blocks until all
    /// of them are done. Returns the time spent waiting on the barrier.
    ///
    /// A panic raised by the callback on any worker is resumed here, after
    /// the barrier.
    pub(crate) fn run_group(&self, job: &dyn Wavefront, group: usize) -> Duration {
        let Shared {
            threads,
            dispatch,
            dispatched,
            completion,
            completed,
            ..
        } = &*self.shared;

        lock(completion).done = 0;
        {
            let mut dispatch = lock(dispatch);
            // SAFETY: `job` outlives this call, and workers only dereference
            // the reference between this publication and their completion
            // report, which the loop below waits for.
            dispatch.job = Some(unsafe { JobRef::new(job) });
            dispatch.group = group;
            dispatch.epoch = dispatch.epoch.wrapping_add(1);
            dispatched.notify_all();
        }
        trace!(group, "wavefront dispatched");

        let waiting = Instant::now();
        let caught = {
            let mut completion = lock(completion);
            while completion.done < *threads {
                completion = wait(completed, completion);
            }
            completion.panic.take()
        };
        let waited = waiting.elapsed();
        // No reference to `job` may outlive this call.
        lock(dispatch).job = None;

        if let Some(payload) = caught {
            panic::resume_unwind(payload);
        }
        waited
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        {
            let mut dispatch = lock(&self.shared.dispatch);
            dispatch.job = None;
            dispatch.epoch = dispatch.epoch.wrapping_add(1);
            self.shared.dispatched.notify_all();
        }
        for worker in &mut self.workers {
            let Some(handle) = worker.handle.take() else {
                continue;
            };
            if handle.join().is_err() {
                warn!(worker = worker.index, "worker thread panicked");
            }
        }
    }
}

impl Shared {
    /// Records that one worker finished the current wavefront and wakes the
    /// master once all of them did.
    fn complete(&self, panic: Option<Box<dyn Any + Send>>) {
        let mut completion = lock(&self.completion);
        completion.done += 1;
        if completion.panic.is_none() {
            completion.panic = panic;
        }
        if completion.done == self.threads {
            self.completed.notify_one();
        }
    }

    fn average_busy(&self) -> Duration {
        let total: Duration = self.busy.iter().map(BusyClock::get).sum();
        u32::try_from(self.threads).map_or(Duration::ZERO, |threads| total / threads)
    }
}
