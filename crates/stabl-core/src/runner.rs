//! Bounded-parallelism batch execution with per-task failure isolation.
//!
//! Tasks run on a dedicated rayon pool sized by `parallelism`; extra tasks wait
//! in the pool's queue. An `Err` or a panic inside a task becomes a
//! [`TaskFailure`] in the report and never aborts sibling tasks. Results come
//! back in submission order, so callers reduce them single-threaded after the
//! join.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StablError};

/// Why a single task contributed no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Submission index of the task.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(TaskFailure),
}

/// Outcomes of one batch, in submission order.
#[derive(Debug)]
pub struct BatchReport<T> {
    outcomes: Vec<TaskOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn outcomes(&self) -> &[TaskOutcome<T>] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Failed(_)))
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.len() - self.failure_count()
    }

    /// Non-empty batch in which every task failed.
    pub fn all_failed(&self) -> bool {
        !self.is_empty() && self.completed_count() == 0
    }

    /// Split into completed values (submission order) and failures.
    pub fn into_parts(self) -> (Vec<T>, Vec<TaskFailure>) {
        let mut completed = Vec::with_capacity(self.outcomes.len());
        let mut failures = Vec::new();
        for outcome in self.outcomes {
            match outcome {
                TaskOutcome::Completed(value) => completed.push(value),
                TaskOutcome::Failed(failure) => failures.push(failure),
            }
        }
        (completed, failures)
    }
}

pub struct TaskRunner {
    parallelism: usize,
    pool: ThreadPool,
}

impl TaskRunner {
    /// Cores × 10: subsample tasks are short and the pool only bounds them.
    pub fn default_parallelism() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            * 10
    }

    pub fn new(parallelism: usize) -> Result<Self> {
        if parallelism == 0 {
            return Err(StablError::invalid("parallelism", "must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("stabl-worker-{}", i))
            .build()
            .map_err(|e| StablError::config(format!("cannot build worker pool: {}", e)))?;
        Ok(Self { parallelism, pool })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run every task to completion or failure and report in submission order.
    pub fn run<T, F>(&self, tasks: Vec<F>) -> BatchReport<T>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        let total = tasks.len();
        debug!(total, parallelism = self.parallelism, "dispatching batch");

        let outcomes: Vec<TaskOutcome<T>> = self.pool.install(|| {
            tasks
                .into_par_iter()
                .enumerate()
                .map(|(index, task)| run_isolated(index, task))
                .collect()
        });

        let report = BatchReport { outcomes };
        if report.failure_count() > 0 {
            warn!(
                failed = report.failure_count(),
                total, "batch finished with failed tasks"
            );
        }
        report
    }
}

fn run_isolated<T, F>(index: usize, task: F) -> TaskOutcome<T>
where
    F: FnOnce() -> Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => TaskOutcome::Completed(value),
        Ok(Err(err)) => {
            warn!(task = index, error = %err, "task failed");
            TaskOutcome::Failed(TaskFailure {
                index,
                reason: err.to_string(),
            })
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "task panicked".to_string());
            warn!(task = index, %reason, "task panicked");
            TaskOutcome::Failed(TaskFailure {
                index,
                reason: format!("panic: {}", reason),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_preserves_submission_order() {
        let runner = TaskRunner::new(4).unwrap();
        let tasks: Vec<_> = (0..32usize)
            .map(|i| {
                move || {
                    // Later tasks finish first.
                    std::thread::sleep(Duration::from_millis((32 - i as u64) % 5));
                    Ok(i * 2)
                }
            })
            .collect();
        let (values, failures) = runner.run(tasks).into_parts();
        assert!(failures.is_empty());
        assert_eq!(values, (0..32).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_errors_and_panics_are_isolated() {
        let runner = TaskRunner::new(3).unwrap();
        let tasks: Vec<Box<dyn FnOnce() -> Result<usize> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| Err(StablError::search("stub", "forced"))),
            Box::new(|| panic!("exploded")),
            Box::new(|| Ok(4)),
        ];
        let report = runner.run(tasks);
        assert_eq!(report.len(), 4);
        assert_eq!(report.failure_count(), 2);
        assert!(matches!(report.outcomes()[3], TaskOutcome::Completed(4)));
        assert!(!report.all_failed());

        let (values, failures) = report.into_parts();
        assert_eq!(values, vec![1, 4]);
        assert_eq!(failures[0].index, 1);
        assert!(failures[0].reason.contains("forced"));
        assert_eq!(failures[1].index, 2);
        assert!(failures[1].reason.contains("exploded"));
    }

    #[test]
    fn test_parallelism_bounds_concurrency() {
        let runner = TaskRunner::new(2).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let active = &active;
                let peak = &peak;
                move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(3));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .collect();
        runner.run(tasks);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        assert!(TaskRunner::new(0).is_err());
        assert!(TaskRunner::default_parallelism() >= 10);
    }
}
