//! Scheduling integration tests.
//!
//! Tests readiness, the one-worker-per-job rule and the concurrency ceiling
//! through the public scheduler API.

use stash::testing::{EventRecorder, SlowBackup};
use stash::{BackupJob, Event, JobWorker, RunState, Scheduler, SchedulerError, StartPolicy};
use std::sync::Arc;
use std::time::Duration;

const LOADED_AT: i64 = 1_700_000_000_000;

#[test]
fn test_delay_measured_from_completion() {
    let backup = Arc::new(SlowBackup::new(Duration::ZERO));
    let job = BackupJob::new("docs", Duration::from_millis(5000), backup)
        .with_start_policy_at(StartPolicy::Immediate, LOADED_AT);

    // First tick: due immediately and claimed by a worker.
    assert!(job.ready_at(LOADED_AT));
    assert!(job.state().try_begin());

    // One tick later it is busy, so not ready.
    assert!(!job.ready_at(LOADED_AT + 1000));

    // The run completes one second in; readiness is measured from there.
    job.state().finish(LOADED_AT + 1000);
    assert!(!job.ready_at(LOADED_AT + 5999));
    assert!(job.ready_at(LOADED_AT + 6000));
}

#[test]
fn test_after_delay_policy_skips_first_tick() {
    let backup = Arc::new(SlowBackup::new(Duration::ZERO));
    let job = BackupJob::new("docs", Duration::from_millis(5000), backup)
        .with_start_policy_at(StartPolicy::AfterDelay, LOADED_AT);

    assert!(!job.ready_at(LOADED_AT));
    assert!(!job.ready_at(LOADED_AT + 4999));
    assert!(job.ready_at(LOADED_AT + 5000));
}

#[test]
fn test_busy_job_is_never_ready() {
    let backup = Arc::new(SlowBackup::new(Duration::ZERO));
    let job = Arc::new(BackupJob::new("docs", Duration::ZERO, backup));

    let worker = JobWorker::claim(job.clone()).unwrap();
    assert_eq!(job.run_state(), RunState::Busy);
    assert!(!job.ready_at(i64::MAX));
    assert!(JobWorker::claim(job.clone()).is_none());

    let result = worker.run();
    assert!(result.success());
    assert_eq!(job.run_state(), RunState::Idle);
    assert!(job.ready());
}

#[tokio::test]
async fn test_one_worker_per_job_under_fast_ticks() {
    let backup = Arc::new(SlowBackup::new(Duration::from_millis(150)));
    let recorder = Arc::new(EventRecorder::new());

    let mut scheduler = Scheduler::new().with_tick_interval(Duration::from_millis(10));
    scheduler.event_bus().register(recorder.clone()).await;
    scheduler.register(BackupJob::new("busy", Duration::ZERO, backup.clone()));

    let (handle, task) = scheduler.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    // Ticks fired many times while the backup was running, but never
    // overlapped it.
    assert_eq!(backup.max_concurrent(), 1);
    assert!(backup.calls() >= 2, "calls = {}", backup.calls());
    assert_eq!(backup.calls(), backup.completed());
    assert_eq!(recorder.completed_runs("busy"), backup.calls());
}

#[tokio::test]
async fn test_job_waits_for_delay_between_runs() {
    let backup = Arc::new(SlowBackup::new(Duration::ZERO));

    let mut scheduler = Scheduler::new().with_tick_interval(Duration::from_millis(10));
    scheduler.register(BackupJob::new(
        "hourly",
        Duration::from_secs(3600),
        backup.clone(),
    ));

    let (handle, task) = scheduler.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert_eq!(backup.calls(), 1);
}

#[tokio::test]
async fn test_concurrency_ceiling_skips_extra_jobs() {
    let backup = Arc::new(SlowBackup::new(Duration::from_millis(100)));
    let recorder = Arc::new(EventRecorder::new());

    let mut scheduler = Scheduler::new().with_max_concurrent_jobs(1);
    scheduler.event_bus().register(recorder.clone()).await;
    scheduler.register(BackupJob::new("first", Duration::ZERO, backup.clone()));
    scheduler.register(BackupJob::new("second", Duration::ZERO, backup.clone()));

    assert_eq!(scheduler.tick().await, 1);
    assert_eq!(scheduler.drain(Duration::from_secs(5)).await, 0);

    let skipped: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::JobSkipped { job_id, .. } => Some(job_id.as_str().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["second"]);
    assert_eq!(backup.max_concurrent(), 1);
}

#[tokio::test]
async fn test_trigger_reports_busy_and_unknown_jobs() {
    let backup = Arc::new(SlowBackup::new(Duration::from_millis(200)));

    let mut scheduler = Scheduler::new().start_paused();
    scheduler.register(
        BackupJob::new("slow", Duration::from_secs(3600), backup.clone())
            .with_start_policy(StartPolicy::AfterDelay),
    );

    let (handle, task) = scheduler.start();

    handle.trigger("slow").await.unwrap();
    let again = handle.trigger("slow").await;
    assert!(matches!(again, Err(SchedulerError::JobBusy(_))));

    let missing = handle.trigger("nope").await;
    assert!(matches!(missing, Err(SchedulerError::JobNotFound(_))));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert_eq!(backup.completed(), 1);
}
