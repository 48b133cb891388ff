// src/exec/pool.rs

//! Bounded worker pool backed by the Tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use crate::errors::{JobflowError, Result, TaskError};
use crate::exec::backend::{panic_message, Executor, OnDone, WorkUnit};

/// Named pool with its own concurrency bound.
///
/// Each submitted unit waits for a permit, then runs on Tokio's blocking
/// thread pool while holding it, so one pool's backlog never occupies another
/// pool's workers. The completion continuation runs on a runtime worker
/// thread right after the body returns.
///
/// Units the runtime drops before they report (because it shut down) fail
/// with an "executor shut down" error, so the continuation still runs once.
pub struct PoolExecutor {
    name: String,
    workers: usize,
    permits: Arc<Semaphore>,
    runtime: Handle,
    submitted: AtomicU64,
}

impl fmt::Debug for PoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolExecutor")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("available", &self.permits.available_permits())
            .field("submitted", &self.submitted())
            .finish_non_exhaustive()
    }
}

impl PoolExecutor {
    /// Create a pool running at most `workers` units at a time on `runtime`.
    ///
    /// `workers` is clamped to at least 1.
    pub fn new(name: impl Into<String>, workers: usize, runtime: Handle) -> Self {
        let workers = workers.max(1);
        Self {
            name: name.into(),
            workers,
            permits: Arc::new(Semaphore::new(workers)),
            runtime,
            submitted: AtomicU64::new(0),
        }
    }

    /// Create a pool on the runtime the caller is running in.
    pub fn on_current_runtime(name: impl Into<String>, workers: usize) -> Result<Self> {
        let name = name.into();
        let runtime = Handle::try_current().map_err(|e| {
            JobflowError::Other(anyhow::anyhow!(
                "executor '{name}' must be created inside a Tokio runtime: {e}"
            ))
        })?;
        Ok(Self::new(name, workers, runtime))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Total units submitted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Stop accepting work. Units waiting for a permit, and any submitted
    /// later, complete with a failure.
    pub fn close(&self) {
        debug!(executor = %self.name, "closing executor");
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

impl<R: Send + 'static> Executor<R> for PoolExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, work: WorkUnit<R>, on_done: OnDone<R>) {
        let seq = self.submitted.fetch_add(1, Ordering::Relaxed);
        let permits = Arc::clone(&self.permits);
        let name = self.name.clone();
        let report = Report::new(&self.name, seq, on_done);

        // A runtime that is shut down drops the future without polling it;
        // `report` then fails the unit from its destructor.
        self.runtime.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    trace!(executor = %name, seq, "unit started");
                    let joined = tokio::task::spawn_blocking(work).await;
                    drop(permit);
                    match joined {
                        Ok(outcome) => outcome,
                        Err(join_err) if join_err.is_panic() => {
                            Err(TaskError::Panicked(panic_message(join_err.into_panic())))
                        }
                        Err(join_err) => Err(TaskError::failed(format!(
                            "executor '{name}' aborted unit: {join_err}"
                        ))),
                    }
                }
                Err(_closed) => Err(TaskError::failed(format!("executor '{name}' is closed"))),
            };

            trace!(executor = %name, seq, ok = outcome.is_ok(), "unit finished");
            report.send(outcome);
        });
    }
}

/// Owns a unit's continuation until the unit reports.
///
/// Dropped unsent, it reports a shutdown failure instead.
struct Report<R> {
    executor: String,
    seq: u64,
    on_done: Option<OnDone<R>>,
}

impl<R> Report<R> {
    fn new(executor: &str, seq: u64, on_done: OnDone<R>) -> Self {
        Self {
            executor: executor.to_string(),
            seq,
            on_done: Some(on_done),
        }
    }

    fn send(mut self, outcome: std::result::Result<R, TaskError>) {
        if let Some(on_done) = self.on_done.take() {
            on_done(outcome);
        }
    }
}

impl<R> Drop for Report<R> {
    fn drop(&mut self) {
        if let Some(on_done) = self.on_done.take() {
            warn!(
                executor = %self.executor,
                seq = self.seq,
                "unit dropped before it finished; runtime shutting down"
            );
            on_done(Err(TaskError::failed(format!(
                "executor '{}' shut down",
                self.executor
            ))));
        }
    }
}
