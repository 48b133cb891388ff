// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The scheduler talks to an `Executor` instead of a concrete thread pool.
//! Production code uses [`PoolExecutor`](crate::exec::PoolExecutor); tests can
//! run work inline or hold it back and release it in any order.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::errors::TaskError;

/// Unit of work handed to an executor.
pub type WorkUnit<R> = Box<dyn FnOnce() -> Result<R, TaskError> + Send + 'static>;

/// Continuation receiving the unit's result or failure. Invoked exactly once.
pub type OnDone<R> = Box<dyn FnOnce(Result<R, TaskError>) + Send + 'static>;

/// Trait abstracting how task bodies are executed.
///
/// Implementations are shared across jobs and must be reentrant: `submit` may
/// be called from inside a continuation the executor itself is running.
pub trait Executor<R>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run `work` and eventually call `on_done` with its outcome.
    ///
    /// Must never swallow the continuation: failures and panics of `work` are
    /// reported as `Err(TaskError)`.
    fn submit(&self, work: WorkUnit<R>, on_done: OnDone<R>);
}

/// Executor that runs the work synchronously inside `submit`.
#[derive(Debug, Clone)]
pub struct InlineExecutor {
    name: String,
}

impl InlineExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for InlineExecutor {
    fn default() -> Self {
        Self::new("inline")
    }
}

impl<R: Send + 'static> Executor<R> for InlineExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, work: WorkUnit<R>, on_done: OnDone<R>) {
        let outcome = catch_unwind(AssertUnwindSafe(work))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
        on_done(outcome);
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
