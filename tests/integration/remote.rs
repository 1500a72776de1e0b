//! Remote shipping integration tests.
//!
//! Uses recording and failing shippers in place of a real SFTP server.

use crate::common::{fine_naming, list_files, write_file, zip_entries};
use stash::testing::{EventRecorder, FailingShipper, RecordingShipper};
use stash::{BackupJob, Credentials, JobWorker, RemoteBackup, RunState, Scheduler, Shipper};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    source: TempDir,
    stage: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let source = TempDir::new().unwrap();
        write_file(source.path(), "photos/one.jpg", "1");
        write_file(source.path(), "photos/two.jpg", "22");
        Self {
            source,
            stage: TempDir::new().unwrap(),
        }
    }

    fn job(&self, shipper: Arc<dyn Shipper>, keep_local: bool) -> BackupJob {
        let backup = RemoteBackup::new(
            [self.source.path().join("photos")],
            self.stage.path(),
            Credentials::new("backup.example.com", "me", "secret").with_port(2222),
            "/srv/backups",
            shipper,
        )
        .with_keep_local(keep_local);
        BackupJob::new("offsite", Duration::ZERO, Arc::new(backup))
            .with_naming(fine_naming("offsite-"))
    }

    fn run(&self, shipper: Arc<dyn Shipper>, keep_local: bool) -> Option<PathBuf> {
        let job = self.job(shipper, keep_local);
        JobWorker::claim(Arc::new(job)).unwrap().run().artifact
    }
}

#[test]
fn test_upload_then_keep_local_copy() {
    let fixture = Fixture::new();
    let shipper = Arc::new(RecordingShipper::new());

    let artifact = fixture.run(shipper.clone(), true).unwrap();

    let uploads = shipper.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].artifact, artifact);
    assert_eq!(uploads[0].host, "backup.example.com:2222");
    assert_eq!(uploads[0].remote_dir, "/srv/backups");
    assert!(uploads[0].size > 0);

    assert!(artifact.exists());
    let mut entries = zip_entries(&artifact);
    entries.sort();
    assert_eq!(entries, vec!["photos/one.jpg", "photos/two.jpg"]);
}

#[test]
fn test_upload_then_remove_local_copy() {
    let fixture = Fixture::new();
    let shipper = Arc::new(RecordingShipper::new());

    let artifact = fixture.run(shipper.clone(), false).unwrap();

    assert_eq!(shipper.uploads().len(), 1);
    assert!(!artifact.exists());
    assert!(list_files(fixture.stage.path()).is_empty());
}

#[test]
fn test_failed_upload_keeps_local_artifact() {
    let fixture = Fixture::new();
    let shipper = Arc::new(FailingShipper::new());

    // An upload failure is not a backup failure.
    let artifact = fixture.run(shipper.clone(), true).unwrap();

    assert_eq!(shipper.attempts(), 1);
    assert!(artifact.exists());
    assert_eq!(list_files(fixture.stage.path()), vec![artifact]);
}

#[test]
fn test_failed_upload_without_keep_local_still_cleans_up() {
    let fixture = Fixture::new();
    let shipper = Arc::new(FailingShipper::new());

    let artifact = fixture.run(shipper.clone(), false).unwrap();

    assert_eq!(shipper.attempts(), 1);
    assert!(!artifact.exists());
}

#[tokio::test]
async fn test_failed_upload_does_not_disturb_schedule() {
    let fixture = Fixture::new();
    let shipper = Arc::new(FailingShipper::new());
    let recorder = Arc::new(EventRecorder::new());

    let mut scheduler = Scheduler::new();
    scheduler.event_bus().register(recorder.clone()).await;
    scheduler.register(fixture.job(shipper.clone(), true));

    // Two rounds: the failed upload leaves the job idle and runnable.
    for round in 1..=2 {
        assert_eq!(scheduler.tick().await, 1);
        assert_eq!(scheduler.drain(Duration::from_secs(10)).await, 0);
        assert_eq!(shipper.attempts(), round);
    }

    let job = scheduler.jobs().next().unwrap();
    assert_eq!(job.run_state(), RunState::Idle);
    assert_eq!(recorder.completed_runs("offsite"), 2);

    let artifacts = recorder.artifacts();
    assert_eq!(artifacts.len(), 2);
    assert!(artifacts.iter().all(|a| a.exists()));
    assert_eq!(list_files(fixture.stage.path()).len(), 2);
}
