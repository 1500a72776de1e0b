//! Archive integration tests.
//!
//! Runs archive and copy jobs through a worker and checks what lands on disk.

use crate::common::{fine_naming, list_files, write_file, zip_entries, zip_entry};
use stash::{ArchiveBackup, BackupJob, CopyBackup, JobWorker};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn run_once(job: BackupJob) -> Option<std::path::PathBuf> {
    let worker = JobWorker::claim(Arc::new(job)).unwrap();
    worker.run().artifact
}

#[test]
fn test_archive_preserves_tree_under_source_name() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(source.path(), "a/x.txt", "x");
    write_file(source.path(), "a/b/y.txt", "y");

    let job = BackupJob::new(
        "tree",
        Duration::ZERO,
        Arc::new(ArchiveBackup::new([source.path().join("a")], out.path())),
    )
    .with_naming(fine_naming("tree-"));

    let artifact = run_once(job).unwrap();
    assert_eq!(artifact.extension().unwrap(), "zip");
    assert!(
        artifact
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("tree-")
    );

    let mut entries = zip_entries(&artifact);
    entries.sort();
    assert_eq!(entries, vec!["a/b/y.txt", "a/x.txt"]);
    assert_eq!(zip_entry(&artifact, "a/b/y.txt"), "y");
}

#[test]
fn test_archive_keeps_source_order() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let second = write_file(source.path(), "z.txt", "z");
    let first = write_file(source.path(), "m.txt", "m");

    let job = BackupJob::new(
        "ordered",
        Duration::ZERO,
        Arc::new(ArchiveBackup::new([second, first], out.path())),
    )
    .with_naming(fine_naming(""));

    let artifact = run_once(job).unwrap();
    assert_eq!(zip_entries(&artifact), vec!["z.txt", "m.txt"]);
}

#[test]
fn test_missing_source_is_skipped() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let present = write_file(source.path(), "here.txt", "present");
    let missing = source.path().join("gone");

    let job = BackupJob::new(
        "partial",
        Duration::ZERO,
        Arc::new(ArchiveBackup::new([missing, present], out.path())),
    )
    .with_naming(fine_naming(""));

    let artifact = run_once(job).unwrap();
    assert_eq!(zip_entries(&artifact), vec!["here.txt"]);
}

#[test]
fn test_zip_extension_appended_once() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write_file(source.path(), "f.txt", "f");

    let naming = fine_naming("")
        .with_time_format("backup.zip")
        .unwrap();
    let job = BackupJob::new(
        "named",
        Duration::ZERO,
        Arc::new(ArchiveBackup::new([file], out.path())),
    )
    .with_naming(naming);

    let artifact = run_once(job).unwrap();
    assert_eq!(artifact, out.path().join("backup.zip"));
}

#[test]
fn test_existing_artifact_is_not_overwritten() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write_file(source.path(), "f.txt", "new");
    write_file(out.path(), "fixed.zip", "old");

    let naming = fine_naming("").with_time_format("fixed").unwrap();
    let job = BackupJob::new(
        "collide",
        Duration::ZERO,
        Arc::new(ArchiveBackup::new([file], out.path())),
    )
    .with_naming(naming);

    assert!(run_once(job).is_none());
    assert_eq!(
        std::fs::read_to_string(out.path().join("fixed.zip")).unwrap(),
        "old"
    );
}

#[test]
fn test_copy_job_copies_one_file() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write_file(source.path(), "report.csv", "a,b\n1,2\n");

    let job = BackupJob::new(
        "copy",
        Duration::ZERO,
        Arc::new(CopyBackup::new(file, out.path().join("nested"))),
    )
    .with_naming(fine_naming("report-"));

    let artifact = run_once(job).unwrap();
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "a,b\n1,2\n");
    assert_eq!(list_files(&out.path().join("nested")), vec![artifact]);
}

#[test]
fn test_copy_of_missing_file_produces_nothing() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let job = BackupJob::new(
        "copy",
        Duration::ZERO,
        Arc::new(CopyBackup::new(source.path().join("missing"), out.path())),
    )
    .with_naming(fine_naming(""));

    assert!(run_once(job).is_none());
    assert!(list_files(out.path()).is_empty());
}
