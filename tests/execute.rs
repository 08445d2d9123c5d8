#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
};
use wavefront::{Job, TaskId, Team, TeamConfig, WorkerIndex};

fn atomics<T: Default>(len: usize) -> Vec<T> {
    (0..len).map(|_| T::default()).collect()
}

/// Links cell `(row, col)` of a `side x side` grid to its south and east
/// neighbours, so wavefronts are the anti-diagonals.
fn link_grid<T, F>(job: &mut Job<T, F>, side: usize) {
    for row in 0..side {
        for col in 0..side {
            let mut successors = Vec::new();
            if row + 1 < side {
                successors.push((row + 1) * side + col);
            }
            if col + 1 < side {
                successors.push(row * side + col + 1);
            }
            job.add_successors(row * side + col, &successors).unwrap();
        }
    }
}

fn predecessors<T, F>(job: &Job<T, F>) -> Vec<Vec<TaskId>> {
    let mut predecessors = vec![Vec::new(); job.task_count()];
    for task in 0..job.task_count() {
        for &successor in job.successors(task).unwrap() {
            predecessors[successor].push(task);
        }
    }
    predecessors
}

#[test]
fn every_task_runs_exactly_once_for_any_team_size() {
    for threads in [0, 1, 2, 3, 4, 8] {
        let mut job = Job::new(
            1000,
            atomics::<AtomicUsize>(1000),
            |_, task, runs: &Vec<AtomicUsize>| {
                runs[task].fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap();
        for task in (0..990).step_by(10) {
            job.add_successors(task, &[task + 10]).unwrap();
        }
        let mut team = Team::new(threads).unwrap();
        team.execute(&mut job).unwrap();
        team.execute(&mut job).unwrap();
        assert!(
            job.context().iter().all(|runs| runs.load(Ordering::Relaxed) == 2),
            "threads={threads}"
        );
    }
}

#[test]
fn independent_tasks_split_evenly_between_workers() {
    let mut job = Job::new(
        10_000,
        atomics::<AtomicUsize>(10_000),
        |worker, task, owner: &Vec<AtomicUsize>| {
            owner[task].store(worker, Ordering::Relaxed);
        },
    )
    .unwrap();
    let mut team = Team::new(4).unwrap();
    team.execute(&mut job).unwrap();

    assert_eq!(job.group_count(), 1);
    let group = job.group(0).unwrap();
    let owner = job.context();
    for (position, &task) in group.iter().enumerate() {
        assert_eq!(owner[task].load(Ordering::Relaxed), position / 2500);
    }
    let report = team.report();
    assert_eq!(report.dispatched_groups, 1);
    assert_eq!(report.inline_groups, 0);
}

#[test]
fn wavefronts_are_separated_by_barriers() {
    let side = 48;
    let mut job = Job::new(
        side * side,
        (Vec::new(), Vec::new()),
        |_, task, (done, predecessors): &(Vec<AtomicBool>, Vec<Vec<TaskId>>)| {
            for &predecessor in &predecessors[task] {
                assert!(
                    done[predecessor].load(Ordering::Relaxed),
                    "{predecessor} must precede {task}"
                );
            }
            done[task].store(true, Ordering::Relaxed);
        },
    )
    .unwrap();
    link_grid(&mut job, side);
    let context = (atomics(side * side), predecessors(&job));
    *job.context_mut() = context;

    let mut team = Team::new(4).unwrap();
    team.execute(&mut job).unwrap();

    assert_eq!(job.group_count(), 2 * side - 1);
    for row in 0..side {
        for col in 0..side {
            assert_eq!(job.group_of(row * side + col), Some(row + col));
        }
    }
    assert!(job.context().0.iter().all(|done| done.load(Ordering::Relaxed)));
    assert!(team.report().dispatched_groups > 0);
}

#[test]
fn single_thread_runs_in_plan_order() {
    let mut job = Job::new(
        5,
        Mutex::new(Vec::new()),
        |worker, task, order: &Mutex<Vec<(WorkerIndex, TaskId)>>| {
            order.lock().unwrap().push((worker, task));
        },
    )
    .unwrap();
    job.add_successors(0, &[1, 2]).unwrap();
    job.add_successors(1, &[3]).unwrap();
    job.add_successors(2, &[3]).unwrap();
    job.add_successors(3, &[4]).unwrap();

    let mut team = Team::new(1).unwrap();
    team.execute(&mut job).unwrap();

    let expected: Vec<_> = job.groups().flatten().map(|&task| (0_usize, task)).collect();
    let order = job.context().lock().unwrap().clone();
    assert_eq!(order, expected);
    assert_eq!(order.first(), Some(&(0, 0)));
    assert_eq!(order.last(), Some(&(0, 4)));
}

#[test]
fn output_does_not_depend_on_team_size() {
    fn run(threads: usize) -> Vec<u64> {
        let side = 32;
        let mut job = Job::new(
            side * side,
            (Vec::new(), Vec::new()),
            |_, task, (values, predecessors): &(Vec<AtomicU64>, Vec<Vec<TaskId>>)| {
                let inflow: u64 = predecessors[task]
                    .iter()
                    .map(|&predecessor| values[predecessor].load(Ordering::Relaxed))
                    .sum();
                values[task].store(inflow % 1_000_003 + task as u64, Ordering::Relaxed);
            },
        )
        .unwrap();
        link_grid(&mut job, side);
        let context = (atomics(side * side), predecessors(&job));
        *job.context_mut() = context;
        Team::new(threads).unwrap().execute(&mut job).unwrap();
        job.into_context().0.into_iter().map(AtomicU64::into_inner).collect()
    }

    let serial = run(1);
    assert_eq!(run(2), serial);
    assert_eq!(run(4), serial);
    assert_eq!(run(7), serial);
}

#[test]
fn small_wavefronts_run_on_the_calling_thread() {
    let mut job = Job::new(
        5,
        Mutex::new(Vec::new()),
        |worker, _, seen: &Mutex<Vec<(WorkerIndex, ThreadId)>>| {
            seen.lock().unwrap().push((worker, thread::current().id()));
        },
    )
    .unwrap();
    job.add_successors(0, &[1, 2]).unwrap();
    job.add_successors(1, &[3]).unwrap();
    job.add_successors(2, &[3]).unwrap();
    job.add_successors(3, &[4]).unwrap();

    let mut team = Team::new(4).unwrap();
    team.execute(&mut job).unwrap();

    let me = thread::current().id();
    let seen = job.context().lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert!(seen.iter().all(|&(worker, thread)| worker == 0 && thread == me));
    let report = team.report();
    assert_eq!(report.inline_groups, 4);
    assert_eq!(report.dispatched_groups, 0);
}

#[test]
fn graph_changes_are_picked_up_by_the_next_execution() {
    let mut job = Job::new(8, atomics::<AtomicUsize>(8), |_, task, runs: &Vec<AtomicUsize>| {
        runs[task].fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    let mut team = Team::new(2).unwrap();
    team.execute(&mut job).unwrap();
    assert_eq!(job.group_count(), 1);

    job.add_successors(0, &[4]).unwrap();
    job.add_successors(4, &[7]).unwrap();
    team.execute(&mut job).unwrap();
    assert!(job.is_planned());
    assert_eq!(job.group_count(), 3);
    assert!(job.context().iter().all(|runs| runs.load(Ordering::Relaxed) == 2));
}

#[test]
fn worker_panic_is_resumed_after_the_barrier() {
    let mut team = Team::new(4).unwrap();
    let runs = atomics::<AtomicUsize>(100);
    let mut job = Job::new(100, &runs, |_, task, runs: &&Vec<AtomicUsize>| {
        runs[task].fetch_add(1, Ordering::Relaxed);
        assert_ne!(task, 42, "task 42 fails");
    })
    .unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| team.execute(&mut job)));
    assert!(outcome.is_err());
    // The failing worker abandons the rest of its chunk, the others finish
    // theirs before the panic surfaces. Nothing runs twice.
    assert_eq!(runs[42].load(Ordering::Relaxed), 1);
    assert!(runs.iter().all(|runs| runs.load(Ordering::Relaxed) <= 1));
    assert!(runs.iter().filter(|runs| runs.load(Ordering::Relaxed) == 1).count() >= 75);

    // The team is still usable.
    let mut next = Job::new(64, AtomicUsize::new(0), |_, _, total: &AtomicUsize| {
        total.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    team.execute(&mut next).unwrap();
    assert_eq!(next.context().load(Ordering::Relaxed), 64);
}

#[test]
fn team_is_reused_across_jobs() {
    let mut team = Team::with_config(&TeamConfig::new(3).with_thread_name("cells")).unwrap();
    for task_count in 0..40 {
        let mut job = Job::new(task_count, AtomicUsize::new(0), |_, _, total: &AtomicUsize| {
            total.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        team.execute(&mut job).unwrap();
        assert_eq!(job.context().load(Ordering::Relaxed), task_count);
    }
    let report = team.report();
    assert_eq!(report.threads, 3);
    assert_eq!(report.jobs, 40);
    assert_eq!(report.dispatched_groups + report.inline_groups, 40);
    assert!(report.total_time >= report.plan_time);
    assert!(report.parallel_time >= report.master_wait_time);
}

#[test]
fn empty_job_is_a_no_op() {
    let mut job = Job::new(0, (), |_, _, &()| unreachable!()).unwrap();
    let mut team = Team::new(4).unwrap();
    team.execute(&mut job).unwrap();
    assert_eq!(team.report().inline_groups, 1);
}
