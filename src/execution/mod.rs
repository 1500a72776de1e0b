//! Backup execution.
//!
//! This module provides the backup strategies a job can run and the worker
//! that owns a single execution of a job.

mod backup;
mod worker;

pub use backup::{ArchiveBackup, Backup, BackupError, CopyBackup, RemoteBackup};
pub use worker::{JobWorker, WorkerResult};
