mod common;
use crate::common::executors::ManualExecutor;
use crate::common::{emit, failing, init_tracing, inline, panicking, Completions, Msg, Step};

use std::sync::{Arc, Mutex};

use jobflow::errors::{JobflowError, TaskError};
use jobflow::exec::Executor;
use jobflow::job::{Scheduler, TaskLinker};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn recording_linker(step: Step, seen: Arc<Mutex<Vec<u64>>>) -> Arc<TaskLinker<Msg>> {
    let mut linker = TaskLinker::<Msg>::new();
    linker
        .add_handler(step, move |_, msg| {
            seen.lock().unwrap().push(msg.value);
            Ok(())
        })
        .unwrap();
    Arc::new(linker)
}

#[test]
fn empty_fire_completes_synchronously() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let mut scheduler = completions.new_job();

    assert!(!scheduler.has_tasks());
    let job = scheduler.fire()?;

    assert_eq!(completions.count(), 1);
    assert!(job.is_complete());
    assert_eq!(job.in_flight(), 0);

    // A second empty fire on the finished job does nothing.
    scheduler.fire()?;
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn new_job_without_fire_never_completes() {
    init_tracing();
    let completions = Completions::new();
    let scheduler = completions.new_job();

    assert!(scheduler.job().is_active());
    drop(scheduler);
    assert_eq!(completions.count(), 0);
}

#[test]
fn queued_batch_is_counted_before_dispatch() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let manual = Arc::new(ManualExecutor::<Msg>::new("manual"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let linker = recording_linker(Step::Leaf, Arc::clone(&seen));

    let mut scheduler = completions.new_job();
    for i in 0..3 {
        scheduler
            .new_task(emit(Step::Leaf, i))
            .with(manual.clone())
            .then(&linker)
            .queue()?;
    }

    assert!(scheduler.has_tasks());
    assert_eq!(scheduler.job().in_flight(), 3);
    assert_eq!(manual.submitted(), 0);

    let job = scheduler.fire()?;
    assert!(!scheduler.has_tasks());
    assert_eq!(manual.pending(), 3);
    assert_eq!(job.in_flight(), 3);

    assert!(manual.release_at(1));
    assert!(manual.release_oldest());
    assert_eq!(job.in_flight(), 1);
    assert_eq!(completions.count(), 0);

    assert!(manual.release_oldest());
    assert_eq!(job.in_flight(), 0);
    assert_eq!(completions.count(), 1);
    assert!(job.is_complete());

    let mut values = seen.lock().unwrap().clone();
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn synchronous_completion_inside_submit_cannot_drain_early() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut linker = TaskLinker::<Msg>::new();
    {
        let observed = Arc::clone(&observed);
        let completions = completions.clone();
        linker.add_handler(Step::Leaf, move |scheduler, _| {
            observed
                .lock()
                .unwrap()
                .push((scheduler.job().in_flight(), completions.count()));
            Ok(())
        })?;
    }
    let linker = Arc::new(linker);

    let mut scheduler = completions.new_job();
    for i in 0..4 {
        scheduler
            .new_task(emit(Step::Leaf, i))
            .with(inline())
            .then(&linker)
            .queue()?;
    }
    scheduler.fire()?;

    // Each inline task still sees itself and every later sibling in flight.
    assert_eq!(
        *observed.lock().unwrap(),
        vec![(4, 0), (3, 0), (2, 0), (1, 0)]
    );
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn handler_fan_out_keeps_job_alive_until_leaves_finish() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let manual = Arc::new(ManualExecutor::<Msg>::new("manual"));
    let leaves = Arc::new(Mutex::new(Vec::new()));
    let leaf_linker = recording_linker(Step::Leaf, Arc::clone(&leaves));

    let mut seed_linker = TaskLinker::<Msg>::new();
    {
        let manual = Arc::clone(&manual);
        let leaf_linker = Arc::clone(&leaf_linker);
        seed_linker.add_handler(Step::Seed, move |scheduler, msg| {
            for i in 0..msg.value {
                scheduler
                    .new_task(emit(Step::Leaf, 100 + i))
                    .with(manual.clone())
                    .then(&leaf_linker)
                    .queue()?;
            }
            scheduler.fire()?;
            Ok(())
        })?;
    }
    let seed_linker = Arc::new(seed_linker);

    let mut scheduler = completions.new_job();
    scheduler
        .new_task(emit(Step::Seed, 3))
        .with(manual.clone())
        .then(&seed_linker)
        .queue()?;
    let job = scheduler.fire()?;

    assert!(manual.release_oldest());
    // Seed released; its three leaves were counted before it was.
    assert_eq!(job.in_flight(), 3);
    assert_eq!(manual.pending(), 3);
    assert_eq!(completions.count(), 0);

    assert_eq!(manual.release_all_newest_first(), 3);
    assert_eq!(completions.count(), 1);
    assert_eq!(leaves.lock().unwrap().len(), 3);
    Ok(())
}

#[test]
fn queue_requires_executor_and_linker() {
    init_tracing();
    let completions = Completions::new();
    let linker = Arc::new(TaskLinker::<Msg>::new());
    let mut scheduler = completions.new_job();

    let err = scheduler
        .new_task(emit(Step::Leaf, 1))
        .then(&linker)
        .queue()
        .unwrap_err();
    assert!(matches!(err, JobflowError::MissingExecutor { .. }));

    let err = scheduler
        .new_task(emit(Step::Leaf, 1))
        .with(inline())
        .queue()
        .unwrap_err();
    assert!(matches!(err, JobflowError::MissingLinker { .. }));

    assert!(!scheduler.has_tasks());
    assert_eq!(scheduler.job().in_flight(), 0);
}

#[test]
fn duplicate_handler_registration_fails() {
    let mut linker = TaskLinker::<Msg>::new();
    linker.add_handler(Step::Leaf, |_, _| Ok(())).unwrap();

    let err = linker.add_handler(Step::Leaf, |_, _| Ok(())).unwrap_err();
    assert!(matches!(err, JobflowError::DuplicateHandler(_)));
    assert!(linker.has_handler(Step::Leaf));
    assert!(!linker.has_handler(Step::Seed));
}

#[test]
fn queuing_on_finished_job_is_an_error() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let linker = Arc::new(TaskLinker::<Msg>::new());

    let mut scheduler = completions.new_job();
    let job = scheduler.fire()?;
    assert!(job.is_complete());

    let mut rebound = Scheduler::existing_job(&job);
    assert!(rebound.job().same_job(&job));
    let err = rebound
        .new_task(emit(Step::Leaf, 1))
        .with(inline())
        .then(&linker)
        .queue()
        .unwrap_err();
    assert!(matches!(err, JobflowError::JobInactive(id) if id == job.id()));
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn failures_reach_failure_handler_and_job_still_completes() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let failures = Arc::new(Mutex::new(Vec::new()));

    let mut linker = TaskLinker::<Msg>::new();
    linker.add_handler(Step::Leaf, |_, _| Ok(()))?;
    {
        let failures = Arc::clone(&failures);
        linker.on_failure(move |_, failure| {
            failures
                .lock()
                .unwrap()
                .push((failure.produces, failure.error.clone()));
            Ok(())
        });
    }
    let linker = Arc::new(linker);

    let mut scheduler = completions.new_job();
    scheduler
        .new_task(failing(Step::Leaf))
        .with(inline())
        .then(&linker)
        .queue()?;
    scheduler
        .new_task(panicking(Step::Leaf))
        .with(inline())
        .then(&linker)
        .queue()?;
    scheduler
        .new_task(emit(Step::Leaf, 7))
        .with(inline())
        .then(&linker)
        .queue()?;
    scheduler.fire()?;

    let failures = failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 2);
    assert_eq!(
        failures[0],
        (Some(Step::Leaf), TaskError::Failed("boom".to_string()))
    );
    assert_eq!(failures[1].0, Some(Step::Leaf));
    assert!(matches!(&failures[1].1, TaskError::Panicked(msg) if msg.contains("exploded")));
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn default_failure_handling_logs_and_drains() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let linker = recording_linker(Step::Leaf, Arc::new(Mutex::new(Vec::new())));

    let mut scheduler = completions.new_job();
    scheduler
        .new_task(failing(Step::Leaf))
        .with(inline())
        .then(&linker)
        .queue()?;
    let job = scheduler.fire()?;

    assert!(job.is_complete());
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn misbehaving_handlers_do_not_hang_the_job() -> TestResult {
    init_tracing();
    let completions = Completions::new();

    let mut linker = TaskLinker::<Msg>::new();
    linker.add_handler(Step::Seed, |_, _| -> jobflow::errors::Result<()> {
        panic!("handler exploded")
    })?;
    linker.add_handler(Step::Leaf, |_, _| {
        Err(JobflowError::ConfigError("handler refused".to_string()))
    })?;
    let linker = Arc::new(linker);

    let mut scheduler = completions.new_job();
    for step in [Step::Seed, Step::Leaf] {
        scheduler
            .new_task(emit(step, 0))
            .with(inline())
            .then(&linker)
            .queue()?;
    }
    let job = scheduler.fire()?;

    assert!(job.is_complete());
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn queuing_a_kind_without_handler_is_rejected() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let linker = Arc::new(TaskLinker::<Msg>::new());

    let mut scheduler = completions.new_job();
    let err = scheduler
        .new_task(emit(Step::Orphan, 1))
        .with(inline())
        .then(&linker)
        .queue()
        .unwrap_err();
    assert!(matches!(&err, JobflowError::UnregisteredResult(kind) if kind == "Orphan"));
    assert!(!scheduler.has_tasks());
    assert_eq!(scheduler.job().in_flight(), 0);
    assert_eq!(completions.count(), 0);

    let job = scheduler.fire()?;
    assert!(job.is_complete());
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn handler_that_forgets_to_fire_still_dispatches() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let leaves = Arc::new(Mutex::new(Vec::new()));
    let leaf_linker = recording_linker(Step::Leaf, Arc::clone(&leaves));

    let mut seed_linker = TaskLinker::<Msg>::new();
    {
        let leaf_linker = Arc::clone(&leaf_linker);
        seed_linker.add_handler(Step::Seed, move |scheduler, _| {
            scheduler
                .new_task(emit(Step::Leaf, 9))
                .with(inline())
                .then(&leaf_linker)
                .queue()?;
            Ok(())
        })?;
    }
    let seed_linker = Arc::new(seed_linker);

    let mut scheduler = completions.new_job();
    scheduler
        .new_task(emit(Step::Seed, 0))
        .with(inline())
        .then(&seed_linker)
        .queue()?;
    scheduler.fire()?;

    assert_eq!(*leaves.lock().unwrap(), vec![9]);
    assert_eq!(completions.count(), 1);
    Ok(())
}

#[test]
fn dropping_an_unfired_batch_releases_it() -> TestResult {
    init_tracing();
    let completions = Completions::new();
    let manual: Arc<dyn Executor<Msg>> = Arc::new(ManualExecutor::<Msg>::new("manual"));
    let linker = recording_linker(Step::Leaf, Arc::new(Mutex::new(Vec::new())));

    let job = {
        let mut scheduler = completions.new_job();
        scheduler
            .new_task(emit(Step::Leaf, 1))
            .with(Arc::clone(&manual))
            .then(&linker)
            .queue()?;
        scheduler.job().clone()
    };

    assert_eq!(job.in_flight(), 0);
    assert_eq!(completions.count(), 1);
    Ok(())
}
