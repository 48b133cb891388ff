// src/job/task.rs

//! Task bodies and the dispatch of a single task to its executor.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::TaskError;
use crate::exec::Executor;
use crate::job::handle::JobHandle;
use crate::job::linker::TaskLinker;
use crate::job::TaggedResult;

/// Identifier of a task, unique within its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        TaskId(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle of a task inside its job, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskState {
    /// Queued in a scheduler batch, counted as in flight, not yet submitted.
    Pending,
    /// Submitted to its executor.
    Dispatched,
    /// Result routed (or dropped) and in-flight slot released.
    Done,
}

/// Supplies the unit of work for one task.
///
/// `run` executes on an executor thread and must report failures as
/// [`TaskError`] rather than panicking; panics are still caught at the
/// executor boundary.
pub trait TaskFactory<R: TaggedResult>: Send + 'static {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Kind of result this task produces on success, if known up front.
    ///
    /// Failure handlers use it to tell which stage a failed task belonged to.
    fn produces(&self) -> Option<R::Kind> {
        None
    }

    fn run(self: Box<Self>) -> Result<R, TaskError>;
}

/// [`TaskFactory`] backed by a closure.
pub struct FnTask<R: TaggedResult, F> {
    name: String,
    produces: Option<R::Kind>,
    body: F,
}

/// Wrap a closure as a task body.
pub fn task_fn<R, F>(name: impl Into<String>, body: F) -> FnTask<R, F>
where
    R: TaggedResult,
    F: FnOnce() -> Result<R, TaskError> + Send + 'static,
{
    FnTask {
        name: name.into(),
        produces: None,
        body,
    }
}

impl<R: TaggedResult, F> FnTask<R, F> {
    pub fn producing(mut self, kind: R::Kind) -> Self {
        self.produces = Some(kind);
        self
    }
}

impl<R, F> TaskFactory<R> for FnTask<R, F>
where
    R: TaggedResult,
    F: FnOnce() -> Result<R, TaskError> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn produces(&self) -> Option<R::Kind> {
        self.produces
    }

    fn run(self: Box<Self>) -> Result<R, TaskError> {
        (self.body)()
    }
}

/// A task bound to an executor and a linker, waiting in a scheduler batch.
pub(crate) struct Task<R: TaggedResult> {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) produces: Option<R::Kind>,
    pub(crate) body: Box<dyn TaskFactory<R>>,
    pub(crate) executor: Arc<dyn Executor<R>>,
    pub(crate) linker: Arc<TaskLinker<R>>,
}

impl<R: TaggedResult> Task<R> {
    /// Submit the task to its executor.
    ///
    /// The executor's completion continuation routes the outcome through the
    /// linker and then releases the task's in-flight slot, in that order, so
    /// follow-up tasks queued by the handler are counted before this one is
    /// discounted.
    pub(crate) fn dispatch(self, job: &JobHandle<R>) {
        debug!(
            job = %job.id(),
            task = %self.name,
            task_id = %self.id,
            executor = self.executor.name(),
            state = ?TaskState::Dispatched,
            "dispatching task"
        );

        let Task {
            id,
            name,
            produces,
            body,
            executor,
            linker,
        } = self;

        let job = job.clone();
        let work = Box::new(move || body.run());
        let on_done = Box::new(move |outcome: Result<R, TaskError>| {
            if job.is_cancelled() {
                debug!(
                    job = %job.id(),
                    task = %name,
                    task_id = %id,
                    "job cancelled; dropping task outcome"
                );
            } else {
                linker.route(&job, id, &name, produces, outcome);
            }

            debug!(
                job = %job.id(),
                task = %name,
                task_id = %id,
                state = ?TaskState::Done,
                "task finished"
            );
            job.release_task();
        });

        executor.submit(work, on_done);
    }
}
