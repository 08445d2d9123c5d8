use std::env;

/// Environment variable consulted by [`thread_hint`].
pub const THREADS_ENV: &str = "WAVEFRONT_THREADS";

const DEFAULT_THREAD_NAME: &str = "wavefront";

/// Reads the desired worker count from [`THREADS_ENV`].
///
/// Returns `0` ("unset") when the variable is absent or not a non-negative
/// integer.
#[must_use]
pub fn thread_hint() -> usize {
    env::var(THREADS_ENV)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Settings used to start a [`Team`](crate::team::Team).
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamConfig {
    threads: usize,
    thread_name: String,
}

impl TeamConfig {
    /// A team of `threads` workers. `0` and `1` both mean single-threaded.
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Resolves the worker count from [`thread_hint`], falling back to
    /// `default` when the hint is unset.
    pub fn from_env(default: usize) -> Self {
        Self::new(Self::resolve(thread_hint(), default))
    }

    /// An explicit (non-zero) value wins over the default.
    #[must_use]
    pub fn resolve(explicit: usize, default: usize) -> usize {
        if explicit == 0 { default } else { explicit }
    }

    /// Prefix of worker thread names; workers are named `{prefix}-{index}`.
    pub fn with_thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Configured worker count.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Configured thread name prefix.
    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Default for TeamConfig {
    /// One worker per available CPU.
    fn default() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, usize::from))
    }
}
