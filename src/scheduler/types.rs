//! Scheduler type definitions.
//!
//! This module contains error types, state enums, and command types for the scheduler.

use std::time::Duration;

use crate::core::job::JobType;
use crate::core::state::RunState;
use crate::core::types::{JobId, RunId};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur in the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The job already has a worker in flight.
    #[error("job is already running: {0}")]
    JobBusy(String),

    /// The global concurrency ceiling is reached.
    #[error("max concurrent jobs exceeded (limit {0})")]
    MaxConcurrentJobsExceeded(usize),

    /// Channel error.
    #[error("channel error: {0}")]
    ChannelError(String),
}

/// State of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Scheduler is stopped.
    Stopped,
    /// Scheduler is running.
    Running,
    /// Scheduler is paused.
    Paused,
}

/// Point-in-time view of one scheduled job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: JobId,
    pub kind: JobType,
    pub delay: Duration,
    pub run_state: RunState,
    /// Completion time of the last run in epoch milliseconds; 0 if never run.
    pub last_run: i64,
}

/// Commands that can be sent to the scheduler.
pub(crate) enum SchedulerCommand {
    /// Trigger a job manually.
    Trigger {
        job_id: JobId,
        response: oneshot::Sender<Result<RunId, SchedulerError>>,
    },
    /// Report the state of every job.
    Status {
        response: oneshot::Sender<Vec<JobStatus>>,
    },
    /// Pause the scheduler.
    Pause { response: oneshot::Sender<()> },
    /// Resume the scheduler.
    Resume { response: oneshot::Sender<()> },
    /// Shutdown the scheduler.
    Shutdown { response: oneshot::Sender<()> },
}
