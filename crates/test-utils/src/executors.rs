//! Executors for tests: one that holds work until the test releases it, and
//! one that runs inline while recording every outcome.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use jobflow::errors::TaskError;
use jobflow::exec::{panic_message, Executor, OnDone, WorkUnit};

fn run_unit<R>(work: WorkUnit<R>, on_done: OnDone<R>) {
    let outcome = catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
    on_done(outcome);
}

/// Holds submitted work until the test releases it, in any order.
///
/// Work runs on the releasing thread. Work submitted while releasing (by the
/// continuation of released work) is appended to the pending list.
pub struct ManualExecutor<R> {
    name: String,
    pending: Mutex<VecDeque<(WorkUnit<R>, OnDone<R>)>>,
    submitted: AtomicUsize,
}

impl<R: Send + 'static> ManualExecutor<R> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pending: Mutex::new(VecDeque::new()),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Total units ever submitted.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Run the pending unit at `index` (0 = oldest). Returns `false` if there
    /// is no such unit.
    pub fn release_at(&self, index: usize) -> bool {
        // Lock dropped before running: continuations may submit again.
        let unit = self.pending.lock().unwrap().remove(index);
        match unit {
            Some((work, on_done)) => {
                run_unit(work, on_done);
                true
            }
            None => false,
        }
    }

    pub fn release_oldest(&self) -> bool {
        self.release_at(0)
    }

    pub fn release_newest(&self) -> bool {
        let len = self.pending();
        len > 0 && self.release_at(len - 1)
    }

    /// Release units, newest first, until none is pending.
    pub fn release_all_newest_first(&self) -> usize {
        let mut released = 0;
        while self.release_newest() {
            released += 1;
        }
        released
    }

    /// Release units, oldest first, until none is pending.
    pub fn release_all(&self) -> usize {
        let mut released = 0;
        while self.release_oldest() {
            released += 1;
        }
        released
    }
}

impl<R: Send + 'static> Executor<R> for ManualExecutor<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, work: WorkUnit<R>, on_done: OnDone<R>) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().push_back((work, on_done));
    }
}

/// Runs work inline, like `InlineExecutor`, and records every outcome.
pub struct RecordingExecutor<R> {
    name: String,
    outcomes: Mutex<Vec<Result<R, TaskError>>>,
}

impl<R: Clone + Send + 'static> RecordingExecutor<R> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes in completion order.
    pub fn outcomes(&self) -> Vec<Result<R, TaskError>> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.is_err())
            .count()
    }
}

impl<R: Clone + Send + 'static> Executor<R> for RecordingExecutor<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, work: WorkUnit<R>, on_done: OnDone<R>) {
        let outcome = catch_unwind(AssertUnwindSafe(work))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
        self.outcomes.lock().unwrap().push(outcome.clone());
        on_done(outcome);
    }
}
