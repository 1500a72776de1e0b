//! Complete workflow integration tests.
//!
//! Tests the full pipeline from a YAML file to artifacts on disk.

use crate::common::{list_files, wait_until, write_file, zip_entries};
use stash::config::{ConfigError, JobConfigBuilder, YamlLoader, build_scheduler, load_scheduler};
use stash::testing::{EventRecorder, RecordingShipper};
use stash::{JobType, RunState, StartPolicy};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        write_file(root.path(), "docs/a/x.txt", "x");
        write_file(root.path(), "docs/a/b/y.txt", "y");
        write_file(root.path(), "notes.txt", "remember");
        Self { root }
    }

    fn path(&self, relative: &str) -> String {
        self.root.path().join(relative).display().to_string()
    }

    fn config(&self) -> String {
        format!(
            r#"
settings:
  tick_interval_ms: 20
  max_concurrent_jobs: 4
  shutdown_timeout_secs: 5
jobs:
  - name: docs
    type: files
    destination: {out}
    directory: {docs}
    delay: 3600000
    formatter:
      format: "%Y%m%d-%H%M%S%.6f"
      timezone: UTC
      prefix: "docs-"
  - name: notes
    type: FILE
    destination: {out}
    directory: {notes}
    delay: 3600000
    formatter:
      format: "notes-%Y%m%d-%H%M%S%.6f"
  - name: offsite
    type: sftp
    local_destination: {stage}
    keep_local: false
    directory:
      - {docs}
      - {notes}
    delay: 3600000
    server:
      address: backup.example.com
      user: me
      pass: secret
      destination: /srv/backups
"#,
            out = self.path("out"),
            stage = self.path("stage"),
            docs = self.path("docs/a"),
            notes = self.path("notes.txt"),
        )
    }

    fn write_config(&self) -> std::path::PathBuf {
        write_file(self.root.path(), "stash.yaml", &self.config())
    }
}

#[tokio::test]
async fn test_yaml_to_artifacts() {
    let workspace = Workspace::new();
    let config = YamlLoader::load_config(workspace.write_config()).unwrap();
    let shipper = Arc::new(RecordingShipper::new());
    let recorder = Arc::new(EventRecorder::new());

    let scheduler =
        build_scheduler(&config, JobConfigBuilder::new().with_shipper(shipper.clone())).unwrap();
    scheduler.event_bus().register(recorder.clone()).await;

    let kinds: Vec<_> = scheduler.jobs().map(|j| j.kind()).collect();
    assert_eq!(kinds, vec![JobType::Files, JobType::File, JobType::Sftp]);

    let (handle, task) = scheduler.start();
    wait_until("all three jobs to complete", Duration::from_secs(10), || {
        ["docs", "notes", "offsite"]
            .iter()
            .all(|job| recorder.completed_runs(job) == 1)
    })
    .await;

    let status = handle.jobs().await.unwrap();
    assert!(status.iter().all(|s| s.run_state == RunState::Idle));
    assert!(status.iter().all(|s| s.last_run > 0));

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    // One archive and one copy land in the shared output directory.
    let out = list_files(&workspace.root.path().join("out"));
    assert_eq!(out.len(), 2);
    let archive = out
        .iter()
        .find(|p| p.extension().is_some_and(|e| e == "zip"))
        .unwrap();
    let mut entries = zip_entries(archive);
    entries.sort();
    assert_eq!(entries, vec!["a/b/y.txt", "a/x.txt"]);
    let copy = out
        .iter()
        .find(|p| p.extension().is_none_or(|e| e != "zip"))
        .unwrap();
    assert_eq!(std::fs::read_to_string(copy).unwrap(), "remember");

    // The offsite archive was shipped, then removed from staging.
    let uploads = shipper.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].host, "backup.example.com:22");
    assert_eq!(uploads[0].remote_dir, "/srv/backups");
    assert!(list_files(&workspace.root.path().join("stage")).is_empty());
    assert_eq!(recorder.artifacts().len(), 3);
}

#[tokio::test]
async fn test_launch_after_delay_runs_nothing_on_first_tick() {
    let workspace = Workspace::new();
    let mut config = YamlLoader::parse_config(&workspace.config()).unwrap();
    config.settings.launch_immediately = false;
    assert_eq!(config.settings.start_policy(), StartPolicy::AfterDelay);

    let scheduler = build_scheduler(
        &config,
        JobConfigBuilder::new().with_shipper(Arc::new(RecordingShipper::new())),
    )
    .unwrap();

    assert_eq!(scheduler.tick().await, 0);
    assert!(list_files(&workspace.root.path().join("out")).is_empty());
}

#[test]
fn test_load_scheduler_from_file() {
    let workspace = Workspace::new();
    let scheduler = load_scheduler(workspace.write_config()).unwrap();

    assert_eq!(scheduler.tick_interval(), Duration::from_millis(20));
    let names: Vec<_> = scheduler
        .jobs()
        .map(|j| j.id().as_str().to_string())
        .collect();
    assert_eq!(names, vec!["docs", "notes", "offsite"]);
}

#[test]
fn test_invalid_job_rejects_whole_file() {
    let workspace = Workspace::new();
    let yaml = workspace.config().replace("type: sftp", "type: rsync");
    let path = write_file(workspace.root.path(), "bad.yaml", &yaml);

    let result = load_scheduler(path);
    assert!(matches!(result, Err(ConfigError::Job { job, .. }) if job == "offsite"));
}
