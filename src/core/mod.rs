//! Core domain types: job identity, readiness state and artifact naming.

pub mod job;
pub mod naming;
pub mod state;
pub mod types;

pub use job::{BackupJob, JobError, JobType};
pub use naming::{DEFAULT_TIME_FORMAT, DEFAULT_TIME_ZONE, NamingPolicy};
pub use state::{JobState, RunState, StartPolicy, now_millis};
pub use types::{JobId, RunId};
