//! Scheduler engine for backup jobs.
//!
//! This module provides the fixed-interval driver loop that scans the job
//! list every tick and dispatches each due job onto its own worker.

mod engine;
mod handle;
mod types;

pub use engine::{DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_TICK_INTERVAL, Scheduler};
pub use handle::SchedulerHandle;
pub use types::{JobStatus, SchedulerError, SchedulerState};
