//! Testing utilities for users of the stash library.
//!
//! This module provides helpers for testing backup scheduling without real
//! servers or long-running backups:
//!
//! - [`RecordingShipper`]: A shipper that records uploads instead of sending them
//! - [`FailingShipper`]: A shipper whose uploads always fail
//! - [`SlowBackup`]: A backup that sleeps and tracks how many runs overlap
//! - [`EventRecorder`]: An event handler that keeps every event it sees

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::job::JobType;
use crate::core::types::JobId;
use crate::events::{Event, EventHandler};
use crate::execution::{Backup, BackupError};
use crate::transfer::{Credentials, Shipper, TransferError};

/// One upload seen by a [`RecordingShipper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Local artifact that would have been sent.
    pub artifact: PathBuf,
    /// Size of the artifact at upload time.
    pub size: u64,
    /// `address:port` of the target.
    pub host: String,
    /// Remote directory.
    pub remote_dir: String,
}

/// A shipper that records every upload and always succeeds.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stash::testing::RecordingShipper;
///
/// let shipper = Arc::new(RecordingShipper::new());
/// // Pass `shipper.clone()` to a RemoteBackup, run it, then:
/// assert!(shipper.uploads().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingShipper {
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl RecordingShipper {
    /// Create a shipper with no recorded uploads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the uploads seen so far.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl Shipper for RecordingShipper {
    fn upload(
        &self,
        artifact: &Path,
        credentials: &Credentials,
        remote_dir: &str,
    ) -> Result<(), TransferError> {
        let size = std::fs::metadata(artifact)
            .map(|m| m.len())
            .map_err(|source| TransferError::LocalRead {
                path: artifact.to_path_buf(),
                source,
            })?;
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(RecordedUpload {
                artifact: artifact.to_path_buf(),
                size,
                host: credentials.host(),
                remote_dir: remote_dir.to_string(),
            });
        }
        Ok(())
    }
}

/// A shipper that refuses every connection.
#[derive(Debug, Default)]
pub struct FailingShipper {
    attempts: AtomicUsize,
}

impl FailingShipper {
    /// Create a failing shipper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads attempted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Shipper for FailingShipper {
    fn upload(
        &self,
        _artifact: &Path,
        credentials: &Credentials,
        _remote_dir: &str,
    ) -> Result<(), TransferError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransferError::Connect {
            host: credentials.host(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        })
    }
}

/// A backup that sleeps for a fixed time and writes nothing.
///
/// Tracks how many runs started, finished, and the highest number that
/// overlapped, so tests can check the one-worker-per-job rule.
#[derive(Debug)]
pub struct SlowBackup {
    duration: Duration,
    destination: PathBuf,
    calls: AtomicUsize,
    completed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl SlowBackup {
    /// Create a backup that takes `duration` per run.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            destination: PathBuf::from("slow-backup"),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Runs started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Runs finished.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of runs in progress at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Backup for SlowBackup {
    fn kind(&self) -> JobType {
        JobType::Files
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn perform(&self, _job: &JobId, target: &Path) -> Result<PathBuf, BackupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        std::thread::sleep(self.duration);

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(target.to_path_buf())
    }
}

/// An event handler that records every event.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<Event>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events in arrival order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of completed runs recorded for `job`.
    pub fn completed_runs(&self, job: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::JobCompleted { job_id, .. } if job_id.as_str() == job))
            .count()
    }

    /// Artifacts reported by completed runs, failed runs excluded.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::JobCompleted { artifact, .. } => artifact,
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    async fn handle(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
