// src/job/scheduler.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::{JobflowError, Result};
use crate::exec::Executor;
use crate::job::handle::JobHandle;
use crate::job::linker::TaskLinker;
use crate::job::task::{Task, TaskFactory, TaskId, TaskState};
use crate::job::TaggedResult;

/// Mutation surface over one job.
///
/// A scheduler owns a *batch* of queued tasks. Queuing counts the task as in
/// flight immediately; [`fire`](Scheduler::fire) submits the whole batch to
/// the tasks' executors. Result handlers receive a scheduler rebound to their
/// job via [`existing_job`](Scheduler::existing_job), so the same code can seed
/// the first wave and react to later ones.
pub struct Scheduler<R: TaggedResult> {
    job: JobHandle<R>,
    batch: Vec<Task<R>>,
}

impl<R: TaggedResult> fmt::Debug for Scheduler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("job", &self.job)
            .field("batch", &self.batch.len())
            .finish()
    }
}

impl<R: TaggedResult> Scheduler<R> {
    /// Create a fresh job with nothing in flight.
    ///
    /// `on_complete` runs exactly once, when all work queued on the job has
    /// drained (or when an empty batch is fired on an idle job). It runs even
    /// for cancelled jobs; check [`JobHandle::is_cancelled`] before consuming
    /// output.
    pub fn new_job<F>(on_complete: F) -> Self
    where
        F: FnOnce(&JobHandle<R>) + Send + 'static,
    {
        Self {
            job: JobHandle::new(Box::new(on_complete)),
            batch: Vec::new(),
        }
    }

    /// Bind a new scheduler (with an empty batch) to an existing job.
    pub fn existing_job(job: &JobHandle<R>) -> Self {
        Self {
            job: job.clone(),
            batch: Vec::new(),
        }
    }

    pub fn job(&self) -> &JobHandle<R> {
        &self.job
    }

    /// Begin describing one task. Bind an executor with
    /// [`TaskBuilder::with`] and a linker with [`TaskBuilder::then`], then
    /// [`TaskBuilder::queue`] it.
    pub fn new_task<F>(&mut self, factory: F) -> TaskBuilder<'_, R>
    where
        F: TaskFactory<R>,
    {
        TaskBuilder {
            scheduler: self,
            factory: Box::new(factory),
            executor: None,
            linker: None,
        }
    }

    /// Whether the current batch holds at least one queued task.
    pub fn has_tasks(&self) -> bool {
        !self.batch.is_empty()
    }

    /// Dispatch every queued task to its executor and clear the batch.
    ///
    /// An empty batch on a job with nothing in flight finalises the job:
    /// the completion continuation runs synchronously before this returns.
    /// Dispatching onto a job that already completed is an error.
    pub fn fire(&mut self) -> Result<JobHandle<R>> {
        if self.batch.is_empty() {
            if self.job.finish_if_idle() {
                debug!(job = %self.job.id(), "empty batch fired on idle job; finalised");
            }
            return Ok(self.job.clone());
        }

        self.job.ensure_active()?;
        let batch = std::mem::take(&mut self.batch);

        if self.job.is_cancelled() {
            debug!(
                job = %self.job.id(),
                dropped = batch.len(),
                "job cancelled; releasing queued tasks without dispatching"
            );
            for _ in batch {
                self.job.release_task();
            }
            return Ok(self.job.clone());
        }

        debug!(job = %self.job.id(), tasks = batch.len(), "firing batch");
        for task in batch {
            task.dispatch(&self.job);
        }

        Ok(self.job.clone())
    }

    /// Cancel the underlying job. See [`JobHandle::cancel`].
    pub fn cancel(&self) {
        self.job.cancel();
    }

    fn enqueue(
        &mut self,
        factory: Box<dyn TaskFactory<R>>,
        executor: Arc<dyn Executor<R>>,
        linker: Arc<TaskLinker<R>>,
    ) -> Result<TaskId> {
        let in_flight = self.job.reserve_task()?;
        let id = self.job.next_task_id();
        let name = factory.name().to_string();

        debug!(
            job = %self.job.id(),
            task = %name,
            task_id = %id,
            executor = executor.name(),
            in_flight,
            state = ?TaskState::Pending,
            "task queued"
        );

        self.batch.push(Task {
            id,
            name,
            produces: factory.produces(),
            body: factory,
            executor,
            linker,
        });

        Ok(id)
    }
}

impl<R: TaggedResult> Drop for Scheduler<R> {
    fn drop(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        error!(
            job = %self.job.id(),
            unfired = self.batch.len(),
            "scheduler dropped with queued tasks that were never fired; releasing them"
        );
        for _ in self.batch.drain(..) {
            self.job.release_task();
        }
    }
}

/// Description of one task before it is queued.
pub struct TaskBuilder<'a, R: TaggedResult> {
    scheduler: &'a mut Scheduler<R>,
    factory: Box<dyn TaskFactory<R>>,
    executor: Option<Arc<dyn Executor<R>>>,
    linker: Option<Arc<TaskLinker<R>>>,
}

impl<'a, R: TaggedResult> TaskBuilder<'a, R> {
    /// Executor the task runs on.
    pub fn with(mut self, executor: Arc<dyn Executor<R>>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Linker that routes the task's result.
    pub fn then(mut self, linker: &Arc<TaskLinker<R>>) -> Self {
        self.linker = Some(Arc::clone(linker));
        self
    }

    /// Append the task to the scheduler's batch, counting it as in flight.
    ///
    /// Fails without queuing anything if the executor or linker is missing, if
    /// the job is cancelled or already complete, or if the task declares a
    /// result kind the linker has no handler for.
    pub fn queue(self) -> Result<TaskId> {
        let TaskBuilder {
            scheduler,
            factory,
            executor,
            linker,
        } = self;

        let executor = executor.ok_or_else(|| JobflowError::MissingExecutor {
            task: factory.name().to_string(),
        })?;
        let linker = linker.ok_or_else(|| JobflowError::MissingLinker {
            task: factory.name().to_string(),
        })?;

        if let Some(kind) = factory.produces() {
            if !linker.has_handler(kind) {
                scheduler.job.ensure_accepting()?;
                error!(
                    job = %scheduler.job.id(),
                    task = %factory.name(),
                    kind = ?kind,
                    "task produces a result kind with no registered handler"
                );
                return Err(JobflowError::UnregisteredResult(format!("{kind:?}")));
            }
        }

        scheduler.enqueue(factory, executor, linker)
    }
}
