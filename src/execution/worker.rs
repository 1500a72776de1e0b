//! Job worker: one execution of one job.
//!
//! A worker only exists for a job it has claimed (`Idle -> Busy`). The worker
//! is itself the release guard: dropping it returns the job to `Idle` with the
//! completion time recorded, whether the backup finished, panicked, or never
//! got to run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::job::BackupJob;
use crate::core::state::now_millis;
use crate::core::types::{JobId, RunId};

/// Result of one worker run.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    /// The job that ran.
    pub job_id: JobId,
    /// The run identifier.
    pub run_id: RunId,
    /// Artifact produced, if any.
    pub artifact: Option<PathBuf>,
    /// Wall time of the backup.
    pub duration: Duration,
}

impl WorkerResult {
    /// Whether an artifact was produced.
    pub fn success(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Owns exactly one execution of one job.
#[derive(Debug)]
pub struct JobWorker {
    job: Arc<BackupJob>,
    run_id: RunId,
}

impl JobWorker {
    /// Claim `job` for a new run.
    ///
    /// Returns `None` if another worker is already executing it.
    pub fn claim(job: Arc<BackupJob>) -> Option<Self> {
        if !job.state().try_begin() {
            return None;
        }
        Some(Self {
            job,
            run_id: RunId::new(),
        })
    }

    pub fn job_id(&self) -> &JobId {
        self.job.id()
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Run the backup. Blocks for as long as the backup takes.
    pub fn run(self) -> WorkerResult {
        let start = Instant::now();
        let artifact = self.job.backup();
        WorkerResult {
            job_id: self.job.id().clone(),
            run_id: self.run_id.clone(),
            artifact,
            duration: start.elapsed(),
        }
        // `self` drops here, releasing the job.
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        self.job.state().finish(now_millis());
    }
}
