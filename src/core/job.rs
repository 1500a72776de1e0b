//! Backup job definition.
//!
//! A job pairs an identity and a minimum delay with a backup strategy
//! (copy, archive, or archive and upload), a naming policy for its artifacts
//! and the readiness state the scheduler polls every tick.

use chrono::Utc;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use super::naming::NamingPolicy;
use super::state::{JobState, RunState, StartPolicy, now_millis};
use super::types::JobId;
use crate::execution::Backup;

/// Errors that can occur when defining jobs.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job type tag is not one of the known kinds.
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// The time zone name could not be resolved.
    #[error("invalid time zone: {0}")]
    InvalidTimeZone(String),

    /// The timestamp pattern contains an unknown specifier.
    #[error("invalid time format: '{0}'")]
    InvalidTimeFormat(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Kind of backup a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    /// Copy a single file verbatim.
    File,
    /// Archive one or more paths into a zip.
    Files,
    /// Archive, then upload the zip over SFTP.
    Sftp,
}

impl JobType {
    /// Get the configuration tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::File => "file",
            JobType::Files => "files",
            JobType::Sftp => "sftp",
        }
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(JobType::File),
            "files" => Ok(JobType::Files),
            "sftp" => Ok(JobType::Sftp),
            _ => Err(JobError::UnknownJobType(s.to_string())),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A periodically executed backup.
pub struct BackupJob {
    id: JobId,
    delay: Duration,
    naming: NamingPolicy,
    strategy: Arc<dyn Backup>,
    state: JobState,
}

impl BackupJob {
    /// Create a job that is due on the first tick.
    pub fn new(id: impl Into<JobId>, delay: Duration, strategy: Arc<dyn Backup>) -> Self {
        Self {
            id: id.into(),
            delay,
            naming: NamingPolicy::default(),
            strategy,
            state: JobState::new(StartPolicy::Immediate, now_millis()),
        }
    }

    /// Reset the readiness state for the given start policy, relative to now.
    pub fn with_start_policy(self, policy: StartPolicy) -> Self {
        self.with_start_policy_at(policy, now_millis())
    }

    /// Reset the readiness state for the given start policy and load time.
    pub fn with_start_policy_at(mut self, policy: StartPolicy, now_ms: i64) -> Self {
        self.state = JobState::new(policy, now_ms);
        self
    }

    /// Replace the naming policy.
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Mutable access to the naming policy, for overrides applied after
    /// construction.
    pub fn naming_mut(&mut self) -> &mut NamingPolicy {
        &mut self.naming
    }

    /// Get the job ID.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Get the kind of backup this job performs.
    pub fn kind(&self) -> JobType {
        self.strategy.kind()
    }

    /// Get the minimum delay between runs.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Get the naming policy.
    pub fn naming(&self) -> &NamingPolicy {
        &self.naming
    }

    /// Get the readiness state.
    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Get the current run state.
    pub fn run_state(&self) -> RunState {
        self.state.run_state()
    }

    /// Check whether the job is due now.
    pub fn ready(&self) -> bool {
        self.ready_at(now_millis())
    }

    /// Check whether the job is due at `now_ms` (epoch milliseconds).
    pub fn ready_at(&self, now_ms: i64) -> bool {
        self.state.ready_at(now_ms, self.delay)
    }

    /// Run the backup once and return the artifact path.
    ///
    /// Failures are logged here with the job name and never returned; `None`
    /// means no artifact was produced. This does not touch the readiness
    /// state, which is the worker's job.
    pub fn backup(&self) -> Option<PathBuf> {
        let target = self.naming.resolve(self.strategy.destination(), Utc::now());
        match self.strategy.perform(&self.id, &target) {
            Ok(artifact) => {
                info!(job = %self.id, artifact = %artifact.display(), "Backup written");
                Some(artifact)
            }
            Err(e) => {
                error!(
                    job = %self.id,
                    path = %target.display(),
                    error = %e,
                    "Backup failed"
                );
                None
            }
        }
    }
}

impl fmt::Debug for BackupJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupJob")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("delay", &self.delay)
            .field("naming", &self.naming)
            .field("destination", &self.strategy.destination())
            .field("state", &self.state)
            .finish()
    }
}
