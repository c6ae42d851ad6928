//! Batch worker pool with per-task failure isolation.
//!
//! Every batch operation builds its own bounded pool, submits one task per
//! independent unit of work and blocks until all of them resolved. A task that
//! returns an error or panics only loses its own result.

use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;


/// Why a single task produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("task {index} failed: {message}")]
    Error { index: usize, message: String },
    #[error("task {index} panicked: {message}")]
    Panicked { index: usize, message: String },
}

pub type TaskResult<R> = Result<R, TaskFailure>;

/// Completed/failed task counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn from_results<R>(results: &[TaskResult<R>]) -> Self {
        let failed = results.iter().filter(|r| r.is_err()).count();
        Self {
            completed: results.len() - failed,
            failed,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    pub fn merge(self, other: BatchReport) -> BatchReport {
        BatchReport {
            completed: self.completed + other.completed,
            failed: self.failed + other.failed,
        }
    }
}

/// A bounded rayon pool scoped to one batch.
pub struct WorkerPool {
    name: &'static str,
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Pool with one thread per available core.
    pub fn new(name: &'static str) -> Result<Self, rayon::ThreadPoolBuildError> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_threads(name, threads)
    }

    pub fn with_threads(
        name: &'static str,
        threads: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        assert!(threads > 0, "thread count must be > 0");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{name}-{i}"))
            .build()?;
        Ok(Self { name, pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f(index, item)` for every item and waits for all of them.
    ///
    /// Results keep the order of `items`.
    pub fn run<T, R, E, F>(&self, items: &[T], f: F) -> Vec<TaskResult<R>>
    where
        T: Sync,
        R: Send,
        E: Display,
        F: Fn(usize, &T) -> Result<R, E> + Sync,
    {
        let name = self.name;
        self.pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| isolate(name, index, || f(index, item)))
                .collect()
        })
    }

    /// Like [`WorkerPool::run`] but every task gets exclusive access to its item.
    pub fn run_mut<T, R, E, F>(&self, items: &mut [T], f: F) -> Vec<TaskResult<R>>
    where
        T: Send,
        R: Send,
        E: Display,
        F: Fn(usize, &mut T) -> Result<R, E> + Sync,
    {
        let name = self.name;
        self.pool.install(|| {
            items
                .par_iter_mut()
                .enumerate()
                .map(|(index, item)| isolate(name, index, || f(index, item)))
                .collect()
        })
    }
}

fn isolate<R, E, F>(pool: &str, index: usize, task: F) -> TaskResult<R>
where
    E: Display,
    F: FnOnce() -> Result<R, E>,
{
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::warn!(pool, task = index, error = %err, "task failed");
            Err(TaskFailure::Error {
                index,
                message: err.to_string(),
            })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(pool, task = index, %message, "task panicked");
            Err(TaskFailure::Panicked { index, message })
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
