//! Fixed-size worker pool with fail-fast cancellation
//!
//! [`FanOut::run`] submits one task per item to a dedicated rayon pool in
//! FIFO order. The first task to fail sets a shared [`CancellationToken`];
//! every task that has not started yet sees the token and is skipped without
//! running. Tasks that are already running may poll the token themselves to
//! stop between units of work.
//!
//! Once every submitted task has finished or been skipped, the coordinator
//! reports the failure of the earliest submitted task that failed.

use crossbeam::channel;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vaultkeep_core::{ExError, ExErrorKind, Result};

/// Shared flag set exactly once, by the first failing task
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag; returns true only for the call that actually set it
    pub fn cancel(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Counts from a fan-out run that finished without failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutStats {
    pub submitted: usize,
    pub completed: usize,
    pub skipped: usize,
}

enum Outcome {
    Completed,
    Skipped,
    Failed(ExError),
}

/// Bounded worker pool executing one blocking task per item
#[derive(Debug, Clone)]
pub struct FanOut {
    workers: usize,
}

impl FanOut {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker per unit of available hardware parallelism
    pub fn with_available_parallelism() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` once per item, failing fast on the first error
    ///
    /// A panicking task counts as a failure.
    ///
    /// # Errors
    ///
    /// The error of the earliest submitted task that failed, or `Database`
    /// if the pool cannot be started or a task panics.
    pub fn run<T, F>(&self, items: &[T], task: F) -> Result<FanOutStats>
    where
        T: Sync,
        F: Fn(&T, &CancellationToken) -> Result<()> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|idx| format!("vaultkeep-fanout-{}", idx))
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Database)
                    .with_op("fan_out")
                    .with_message(format!("worker pool could not be started: {}", e))
            })?;

        let token = CancellationToken::new();
        let (tx, rx) = channel::unbounded::<(usize, Outcome)>();
        let task = &task;

        pool.in_place_scope_fifo(|scope| {
            for (index, item) in items.iter().enumerate() {
                let tx = tx.clone();
                let token = token.clone();
                scope.spawn_fifo(move |_| {
                    let outcome = run_one(item, &token, task);
                    // the receiver outlives the scope
                    let _ = tx.send((index, outcome));
                });
            }
        });
        drop(tx);

        let mut stats = FanOutStats {
            submitted: items.len(),
            ..FanOutStats::default()
        };
        let mut first_failure: Option<(usize, ExError)> = None;
        for (index, outcome) in rx.iter() {
            match outcome {
                Outcome::Completed => stats.completed += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Failed(err) => {
                    if first_failure.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_failure = Some((index, err));
                    }
                }
            }
        }

        if let Some((index, err)) = first_failure {
            tracing::debug!(
                component = module_path!(),
                failed_index = index,
                completed = stats.completed,
                skipped = stats.skipped,
                "fan-out cancelled"
            );
            return Err(err);
        }
        Ok(stats)
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

fn run_one<T, F>(item: &T, token: &CancellationToken, task: &F) -> Outcome
where
    F: Fn(&T, &CancellationToken) -> Result<()>,
{
    if token.is_cancelled() {
        return Outcome::Skipped;
    }
    let err = match catch_unwind(AssertUnwindSafe(|| task(item, token))) {
        Ok(Ok(())) => return Outcome::Completed,
        Ok(Err(err)) => err,
        Err(payload) => ExError::new(ExErrorKind::Database)
            .with_op("fan_out")
            .with_message(format!("worker task panicked: {}", panic_message(&*payload))),
    };
    token.cancel();
    Outcome::Failed(err)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
