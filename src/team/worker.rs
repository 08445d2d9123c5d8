use crate::{
    sync::{lock, wait},
    team::Shared,
    types::WorkerIndex,
};
use core::{mem, ptr::NonNull};
use std::{
    panic::{self, AssertUnwindSafe},
    time::Instant,
};
use tracing::trace;

/// A job as seen by the workers: something that can run one worker's share
/// of a wavefront.
pub(crate) trait Wavefront: Sync {
    /// Runs the chunk of wavefront `group` owned by `worker` out of
    /// `workers`.
    fn run_share(&self, group: usize, worker: WorkerIndex, workers: usize);
}

/// Lifetime-erased reference to the job being executed.
#[derive(Clone, Copy)]
pub(super) struct JobRef(NonNull<dyn Wavefront>);

// SAFETY: `Wavefront: Sync`, so the referenced job may be used from any
// thread; `JobRef::new` puts the lifetime obligation on the publisher.
unsafe impl Send for JobRef {}

impl JobRef {
    /// # Safety
    ///
    /// `job` must stay alive and unmoved for as long as any worker may
    /// dereference the returned reference, i.e. until every worker reported
    /// completion of the wavefront it was published for.
    pub(super) unsafe fn new<'a>(job: &'a (dyn Wavefront + 'a)) -> Self {
        let ptr = NonNull::from(job);
        // SAFETY: Only the trait object lifetime bound changes; layout is
        // identical. Validity is the caller's obligation.
        Self(unsafe { mem::transmute::<NonNull<dyn Wavefront + 'a>, NonNull<dyn Wavefront>>(ptr) })
    }

    /// # Safety
    ///
    /// Must only be called while the publisher of this reference is blocked
    /// on the completion barrier.
    unsafe fn get(&self) -> &dyn Wavefront {
        // SAFETY: Forwarded to the caller.
        unsafe { self.0.as_ref() }
    }
}

/// Worker thread body: idle on the dispatch condition variable, run the
/// published share, report completion, repeat until shutdown.
pub(super) fn run(shared: &Shared, index: WorkerIndex) {
    trace!(worker = index, "worker started");
    let mut seen = 0;
    loop {
        let (job, group) = {
            let mut dispatch = lock(&shared.dispatch);
            while dispatch.epoch == seen {
                dispatch = wait(&shared.dispatched, dispatch);
            }
            seen = dispatch.epoch;
            let Some(job) = dispatch.job else {
                break;
            };
            (job, dispatch.group)
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            // SAFETY: The master published `job` for this epoch and is blocked
            // until this worker calls `complete` below.
            let job = unsafe { job.get() };
            job.run_share(group, index, shared.threads);
        }));
        shared.busy[index].add(started.elapsed());
        shared.complete(outcome.err());
    }
    trace!(worker = index, "worker exiting");
}
