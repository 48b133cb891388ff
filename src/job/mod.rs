// src/job/mod.rs

//! Job/Task scheduling engine.
//!
//! - [`handle`] holds the per-run [`JobHandle`]: in-flight count, cancelled
//!   flag and the completion continuation that fires exactly once.
//! - [`scheduler`] is the only mutation surface over a Job: it queues tasks
//!   (incrementing the in-flight count at enqueue time) and fires batches at
//!   their executors.
//! - [`task`] defines the [`TaskFactory`] contract for task bodies and the
//!   internal dispatch of a single task.
//! - [`linker`] routes each completed task's result to the handler registered
//!   for its kind, or to the failure handler.

pub mod handle;
pub mod linker;
pub mod scheduler;
pub mod task;

use std::fmt;
use std::hash::Hash;

pub use handle::{JobHandle, JobId};
pub use linker::{TaskFailure, TaskLinker};
pub use scheduler::{Scheduler, TaskBuilder};
pub use task::{task_fn, FnTask, TaskFactory, TaskId};

/// A closed set of results produced by the tasks of one pipeline, tagged with
/// an explicit kind discriminant used for routing.
pub trait TaggedResult: Send + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}
