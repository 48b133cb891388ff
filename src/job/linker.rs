// src/job/linker.rs

//! Result routing: maps each result kind to the handler that reacts to it.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use crate::errors::{JobflowError, Result, TaskError};
use crate::exec::panic_message;
use crate::job::handle::JobHandle;
use crate::job::scheduler::Scheduler;
use crate::job::task::TaskId;
use crate::job::TaggedResult;

type ResultHandler<R> = Box<dyn Fn(&mut Scheduler<R>, R) -> Result<()> + Send + Sync>;
type FailureHandler<R> =
    Box<dyn Fn(&mut Scheduler<R>, TaskFailure<<R as TaggedResult>::Kind>) -> Result<()> + Send + Sync>;

/// A task whose body failed or panicked.
#[derive(Debug, Clone)]
pub struct TaskFailure<K> {
    pub task_id: TaskId,
    pub task: String,
    /// Result kind the task would have produced, if its factory declared one.
    pub produces: Option<K>,
    pub error: TaskError,
}

/// Per-job mapping from result kind to handler.
///
/// Handlers run synchronously on the thread that completed the task and get a
/// [`Scheduler`] already bound to the task's job, so they can queue the next
/// wave. Register everything before the first task is queued; the linker is
/// shared immutably afterwards.
pub struct TaskLinker<R: TaggedResult> {
    handlers: HashMap<R::Kind, ResultHandler<R>>,
    on_failure: Option<FailureHandler<R>>,
}

impl<R: TaggedResult> fmt::Debug for TaskLinker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskLinker")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

impl<R: TaggedResult> Default for TaskLinker<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TaggedResult> TaskLinker<R> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            on_failure: None,
        }
    }

    /// Register the handler for one result kind.
    ///
    /// Registering the same kind twice is a configuration bug and fails.
    pub fn add_handler<F>(&mut self, kind: R::Kind, handler: F) -> Result<()>
    where
        F: Fn(&mut Scheduler<R>, R) -> Result<()> + Send + Sync + 'static,
    {
        if self.handlers.contains_key(&kind) {
            return Err(JobflowError::DuplicateHandler(format!("{kind:?}")));
        }
        self.handlers.insert(kind, Box::new(handler));
        Ok(())
    }

    /// Replace the default failure handling (log and carry on).
    pub fn on_failure<F>(&mut self, handler: F)
    where
        F: Fn(&mut Scheduler<R>, TaskFailure<R::Kind>) -> Result<()> + Send + Sync + 'static,
    {
        self.on_failure = Some(Box::new(handler));
    }

    pub fn has_handler(&self, kind: R::Kind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Deliver a task outcome to its handler.
    ///
    /// Never panics and never fails: the caller releases the task's in-flight
    /// slot right after this returns, whatever the handler did.
    pub(crate) fn route(
        &self,
        job: &JobHandle<R>,
        task_id: TaskId,
        task: &str,
        produces: Option<R::Kind>,
        outcome: std::result::Result<R, TaskError>,
    ) {
        let mut scheduler = Scheduler::existing_job(job);

        let routed = catch_unwind(AssertUnwindSafe(|| match outcome {
            Ok(result) => self.dispatch_result(&mut scheduler, result),
            Err(error) => self.dispatch_failure(
                &mut scheduler,
                TaskFailure {
                    task_id,
                    task: task.to_string(),
                    produces,
                    error,
                },
            ),
        }));

        match routed {
            Ok(Ok(())) => {}
            Ok(Err(JobflowError::JobCancelled(_))) => {
                debug!(
                    job = %job.id(),
                    task = %task,
                    "handler raced a cancellation; follow-up work not queued"
                );
            }
            Ok(Err(err)) => {
                error!(
                    job = %job.id(),
                    task = %task,
                    task_id = %task_id,
                    error = %err,
                    "result handler failed"
                );
            }
            Err(payload) => {
                error!(
                    job = %job.id(),
                    task = %task,
                    task_id = %task_id,
                    panic = %panic_message(payload),
                    "result handler panicked"
                );
            }
        }

        if scheduler.has_tasks() {
            warn!(
                job = %job.id(),
                task = %task,
                "handler left queued tasks unfired; dispatching them"
            );
            if let Err(err) = scheduler.fire() {
                error!(job = %job.id(), error = %err, "failed to dispatch leftover tasks");
            }
        }
    }

    fn dispatch_result(&self, scheduler: &mut Scheduler<R>, result: R) -> Result<()> {
        let kind = result.kind();
        debug_assert!(
            self.handlers.contains_key(&kind),
            "no handler registered for result kind {kind:?}"
        );
        match self.handlers.get(&kind) {
            Some(handler) => handler(scheduler, result),
            None => Err(JobflowError::UnregisteredResult(format!("{kind:?}"))),
        }
    }

    fn dispatch_failure(
        &self,
        scheduler: &mut Scheduler<R>,
        failure: TaskFailure<R::Kind>,
    ) -> Result<()> {
        match &self.on_failure {
            Some(handler) => handler(scheduler, failure),
            None => {
                warn!(
                    job = %scheduler.job().id(),
                    task = %failure.task,
                    task_id = %failure.task_id,
                    error = %failure.error,
                    "task failed"
                );
                Ok(())
            }
        }
    }
}
