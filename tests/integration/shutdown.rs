//! Graceful shutdown integration tests.
//!
//! Tests that verify the scheduler waits for running backups before
//! exiting, and gives up after the shutdown timeout.

use stash::testing::{EventRecorder, SlowBackup};
use stash::{BackupJob, Event, Scheduler, SchedulerState};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_shutdown_waits_for_running_backup() {
    let backup = Arc::new(SlowBackup::new(Duration::from_millis(300)));
    let recorder = Arc::new(EventRecorder::new());

    let mut scheduler = Scheduler::new().with_tick_interval(Duration::from_millis(50));
    scheduler.event_bus().register(recorder.clone()).await;
    scheduler.register(BackupJob::new("slow", Duration::from_secs(3600), backup.clone()));

    let (handle, task) = scheduler.start();
    crate::common::wait_until("backup to start", Duration::from_secs(5), || {
        backup.calls() == 1
    })
    .await;
    assert_eq!(backup.completed(), 0);

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert_eq!(backup.completed(), 1);
    assert_eq!(recorder.completed_runs("slow"), 1);
    assert_eq!(handle.state().await, SchedulerState::Stopped);
}

#[tokio::test]
async fn test_shutdown_gives_up_after_timeout() {
    let backup = Arc::new(SlowBackup::new(Duration::from_millis(1500)));

    let mut scheduler = Scheduler::new()
        .with_tick_interval(Duration::from_millis(50))
        .with_shutdown_timeout(Duration::from_millis(100));
    scheduler.register(BackupJob::new("stuck", Duration::from_secs(3600), backup.clone()));

    let (handle, task) = scheduler.start();
    crate::common::wait_until("backup to start", Duration::from_secs(5), || {
        backup.calls() == 1
    })
    .await;

    let started = std::time::Instant::now();
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(backup.completed(), 0);
}

#[tokio::test]
async fn test_no_new_runs_after_pause() {
    let backup = Arc::new(SlowBackup::new(Duration::ZERO));
    let recorder = Arc::new(EventRecorder::new());

    let mut scheduler = Scheduler::new()
        .with_tick_interval(Duration::from_millis(10))
        .start_paused();
    scheduler.event_bus().register(recorder.clone()).await;
    scheduler.register(BackupJob::new("idle", Duration::ZERO, backup.clone()));

    let (handle, task) = scheduler.start();
    assert!(handle.is_paused().await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backup.calls(), 0);

    handle.resume().await.unwrap();
    crate::common::wait_until("a run after resume", Duration::from_secs(5), || {
        backup.completed() >= 1
    })
    .await;

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(
        recorder
            .events()
            .iter()
            .any(|e| matches!(e, Event::JobStarted { .. }))
    );
}
