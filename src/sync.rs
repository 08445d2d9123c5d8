#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        sync::{
            Arc, Condvar, Mutex, MutexGuard,
            atomic::{AtomicU64, Ordering},
        },
        thread::{Builder as ThreadBuilder, JoinHandle},
    };

    /// `loom` join handles cannot be polled, every modelled thread counts as
    /// alive until joined.
    pub(crate) fn is_alive<T>(_handle: &JoinHandle<T>) -> bool {
        true
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::{
        sync::{
            Arc, Condvar, Mutex, MutexGuard,
            atomic::{AtomicU64, Ordering},
        },
        thread::{Builder as ThreadBuilder, JoinHandle},
    };

    pub(crate) fn is_alive<T>(handle: &JoinHandle<T>) -> bool {
        !handle.is_finished()
    }
}

pub(crate) use imp::*;
use std::sync::PoisonError;

/// Locks `mutex`, ignoring poisoning.
///
/// Callback panics are caught before they can unwind through a held guard,
/// so a poisoned lock still protects consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn wait<'a, T>(condvar: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
