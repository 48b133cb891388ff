#![allow(dead_code)]

pub use jobflow_test_utils::builders;
pub use jobflow_test_utils::executors;
pub use jobflow_test_utils::stubs;
pub use jobflow_test_utils::{init_tracing, wait_until, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jobflow::errors::TaskError;
use jobflow::exec::{Executor, InlineExecutor};
use jobflow::job::{task_fn, FnTask, JobHandle, Scheduler, TaggedResult};

/// Result kinds for engine-level tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Seed,
    Leaf,
    Orphan,
}

/// Minimal tagged result: a kind plus a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub step: Step,
    pub value: u64,
}

impl Msg {
    pub fn new(step: Step, value: u64) -> Self {
        Self { step, value }
    }
}

impl TaggedResult for Msg {
    type Kind = Step;

    fn kind(&self) -> Step {
        self.step
    }
}

/// Task producing `Msg { step, value }`.
pub fn emit(
    step: Step,
    value: u64,
) -> FnTask<Msg, impl FnOnce() -> Result<Msg, TaskError> + Send + 'static> {
    task_fn(format!("{step:?}-{value}"), move || Ok(Msg::new(step, value))).producing(step)
}

/// Task whose body fails.
pub fn failing(
    step: Step,
) -> FnTask<Msg, impl FnOnce() -> Result<Msg, TaskError> + Send + 'static> {
    task_fn(format!("{step:?}-failing"), || Err(TaskError::failed("boom"))).producing(step)
}

/// Task whose body panics.
pub fn panicking(
    step: Step,
) -> FnTask<Msg, impl FnOnce() -> Result<Msg, TaskError> + Send + 'static> {
    task_fn(format!("{step:?}-panicking"), || -> Result<Msg, TaskError> {
        panic!("task body exploded")
    })
    .producing(step)
}

pub fn inline() -> Arc<dyn Executor<Msg>> {
    Arc::new(InlineExecutor::new("inline"))
}

/// Completion probe: how many times the continuation ran, and whether the
/// job was cancelled when it did.
#[derive(Debug, Clone, Default)]
pub struct Completions {
    count: Arc<AtomicUsize>,
    cancelled: Arc<Mutex<Vec<bool>>>,
}

impl Completions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn cancelled_flags(&self) -> Vec<bool> {
        self.cancelled.lock().unwrap().clone()
    }

    /// A fresh job whose continuation records into this probe.
    pub fn new_job(&self) -> Scheduler<Msg> {
        let count = Arc::clone(&self.count);
        let cancelled = Arc::clone(&self.cancelled);
        Scheduler::new_job(move |job: &JobHandle<Msg>| {
            cancelled.lock().unwrap().push(job.is_cancelled());
            count.fetch_add(1, Ordering::SeqCst);
        })
    }
}
