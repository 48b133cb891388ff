// src/job/handle.rs

//! Per-run job state shared between the scheduler and executor threads.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::errors::{JobflowError, Result};
use crate::job::task::TaskId;
use crate::job::TaggedResult;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Continuation invoked once the job's in-flight work has drained.
pub(crate) type CompletionFn<R> = Box<dyn FnOnce(&JobHandle<R>) + Send + 'static>;

/// Lifecycle phase of a job.
///
/// `Active` until the in-flight count drops to zero (or an empty `fire()`
/// finalises an idle job); `Finished` afterwards, for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Active,
    Finished,
}

#[derive(Debug)]
struct Counters {
    in_flight: usize,
    phase: JobPhase,
}

struct JobInner<R: TaggedResult> {
    id: JobId,
    counters: Mutex<Counters>,
    cancelled: AtomicBool,
    next_task_id: AtomicU64,
    on_complete: Mutex<Option<CompletionFn<R>>>,
}

/// Shared handle to one job.
///
/// Cloning is cheap; all clones observe the same counters. Mutation of the
/// counters is reserved to the [`Scheduler`](crate::job::Scheduler) and the
/// task completion path.
pub struct JobHandle<R: TaggedResult> {
    inner: Arc<JobInner<R>>,
}

impl<R: TaggedResult> Clone for JobHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: TaggedResult> fmt::Debug for JobHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counters = self.counters();
        f.debug_struct("JobHandle")
            .field("id", &self.inner.id)
            .field("in_flight", &counters.in_flight)
            .field("phase", &counters.phase)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<R: TaggedResult> JobHandle<R> {
    pub(crate) fn new(on_complete: CompletionFn<R>) -> Self {
        let id = JobId::next();
        debug!(job = %id, "job created");
        Self {
            inner: Arc::new(JobInner {
                id,
                counters: Mutex::new(Counters {
                    in_flight: 0,
                    phase: JobPhase::Active,
                }),
                cancelled: AtomicBool::new(false),
                next_task_id: AtomicU64::new(1),
                on_complete: Mutex::new(Some(on_complete)),
            }),
        }
    }

    pub fn id(&self) -> JobId {
        self.inner.id
    }

    /// Number of tasks queued or running that have not yet finished.
    pub fn in_flight(&self) -> usize {
        self.counters().in_flight
    }

    /// `true` until the completion continuation has been triggered.
    pub fn is_active(&self) -> bool {
        self.counters().phase == JobPhase::Active
    }

    pub fn is_complete(&self) -> bool {
        !self.is_active()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Set the cancelled flag.
    ///
    /// Running tasks finish but their results are no longer routed; queuing
    /// new tasks fails. The completion continuation still fires once the
    /// in-flight count drains.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            info!(job = %self.inner.id, in_flight = self.in_flight(), "job cancelled");
        }
    }

    /// Whether two handles refer to the same job.
    pub fn same_job(&self, other: &JobHandle<R>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn next_task_id(&self) -> TaskId {
        TaskId::new(self.inner.next_task_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Count one more task as in flight. Called at enqueue time.
    pub(crate) fn reserve_task(&self) -> Result<usize> {
        let mut counters = self.counters();
        if counters.phase == JobPhase::Finished {
            return Err(JobflowError::JobInactive(self.inner.id));
        }
        if self.is_cancelled() {
            return Err(JobflowError::JobCancelled(self.inner.id));
        }
        counters.in_flight += 1;
        Ok(counters.in_flight)
    }

    /// Fail the way [`reserve_task`](Self::reserve_task) would, without
    /// reserving a slot.
    pub(crate) fn ensure_accepting(&self) -> Result<()> {
        self.ensure_active()?;
        if self.is_cancelled() {
            return Err(JobflowError::JobCancelled(self.inner.id));
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(JobflowError::JobInactive(self.inner.id))
        }
    }

    /// Release one in-flight slot; the last effect of every task.
    ///
    /// Fires the completion continuation if this brought the count to zero.
    pub(crate) fn release_task(&self) {
        let finished = {
            let mut counters = self.counters();
            debug_assert!(counters.in_flight > 0, "in-flight count underflow");
            counters.in_flight = counters.in_flight.saturating_sub(1);
            if counters.in_flight == 0 && counters.phase == JobPhase::Active {
                counters.phase = JobPhase::Finished;
                true
            } else {
                false
            }
        };

        if finished {
            self.complete();
        }
    }

    /// Finalise a job with nothing in flight (empty `fire()`).
    pub(crate) fn finish_if_idle(&self) -> bool {
        let finished = {
            let mut counters = self.counters();
            if counters.in_flight == 0 && counters.phase == JobPhase::Active {
                counters.phase = JobPhase::Finished;
                true
            } else {
                false
            }
        };

        if finished {
            self.complete();
        }
        finished
    }

    fn complete(&self) {
        let callback = self
            .inner
            .on_complete
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        info!(
            job = %self.inner.id,
            cancelled = self.is_cancelled(),
            "job drained; invoking completion"
        );

        if let Some(callback) = callback {
            callback(self);
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked: every critical
        // section is a plain integer update.
        self.inner
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
