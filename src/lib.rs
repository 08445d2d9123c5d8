//! Wavefront-leveled task graphs executed on a barrier-synchronized thread
//! team.
//!
//! This crate runs large numbers of small, mostly independent tasks (for
//! example "update grid cell N") on a fixed pool of worker threads. It:
//! - Levels a task graph into wavefronts: a task runs in an earlier wavefront
//!   than every task registered as its successor.
//! - Runs wavefronts in order, with a full barrier between them, splitting
//!   each large wavefront into one contiguous chunk per worker.
//! - Keeps workers parked between wavefronts and jobs, so dispatch costs one
//!   broadcast and one barrier per wavefront.
//!
//! Key modules:
//! - `job`: the task graph, successor registration and wavefront planning.
//! - `team`: the worker pool and its dispatch/completion handshake;
//!   `Team::execute` runs a job on it.
//! - `config`: team settings, including the `WAVEFRONT_THREADS` hint.
//! - `report`: timing collected by a team.
//!
//! Quick start:
//! 1. Create a `Job` with a task count, a context and a callback
//!    `(worker, task, &context)`.
//! 2. Register successors with `Job::add_successors`.
//! 3. Start a `Team` and call `Team::execute` as often as needed; the plan
//!    is cached until the graph changes.
//!
//! Tasks of one wavefront run concurrently. The callback must only touch
//! state that mutually independent tasks do not share, or synchronize on
//! its own.

/// Team settings and the environment thread hint.
pub mod config;
/// Error type shared by all fallible operations.
pub mod error;
mod executor;
/// Task graphs and their wavefront plans.
///
/// A `Job` owns a fixed number of tasks, their successor links and the
/// cached plan: tasks sorted by travel and grouped into wavefronts.
pub mod job;
/// Timing collected by a team.
pub mod report;
mod sync;
/// The long-lived worker pool.
///
/// Workers wait on a dispatch condition variable, run their chunk of the
/// published wavefront and report on a completion condition variable.
pub mod team;
/// Task and worker identifiers.
pub mod types;
mod utils;

pub use crate::{
    config::TeamConfig,
    error::{Error, Result},
    job::Job,
    report::TeamReport,
    team::Team,
    types::{TaskId, WorkerIndex},
};
