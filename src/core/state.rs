//! Per-job readiness state.
//!
//! A job is either idle or busy. The scheduler claims an idle job before
//! dispatching it and the worker releases it when the run is over, stamping
//! the completion time. Both fields are independent atomics shared between the
//! driver and at most one worker; they are not guarded as a pair.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Whether a freshly loaded job is due right away or only after one delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartPolicy {
    /// Last run starts at the epoch, so the job is due on the first tick.
    #[default]
    Immediate,
    /// Last run starts at load time, so the first run happens after one delay.
    AfterDelay,
}

impl StartPolicy {
    /// Map the `launch_immediately` setting to a policy.
    pub fn from_launch_immediately(immediately: bool) -> Self {
        if immediately {
            StartPolicy::Immediate
        } else {
            StartPolicy::AfterDelay
        }
    }
}

/// Observable run state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not executing; eligible once the delay has elapsed.
    Idle,
    /// A worker is executing the job.
    Busy,
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Busy flag and last-run timestamp of one job.
#[derive(Debug)]
pub struct JobState {
    busy: AtomicBool,
    last_run: AtomicI64,
}

impl JobState {
    /// Create the initial idle state for the given start policy.
    pub fn new(policy: StartPolicy, now_ms: i64) -> Self {
        let last_run = match policy {
            StartPolicy::Immediate => 0,
            StartPolicy::AfterDelay => now_ms,
        };
        Self {
            busy: AtomicBool::new(false),
            last_run: AtomicI64::new(last_run),
        }
    }

    /// Get the current run state.
    pub fn run_state(&self) -> RunState {
        if self.is_busy() {
            RunState::Busy
        } else {
            RunState::Idle
        }
    }

    /// Check whether a worker currently owns the job.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Completion time of the last run, in epoch milliseconds.
    pub fn last_run(&self) -> i64 {
        self.last_run.load(Ordering::Acquire)
    }

    /// True iff idle and at least `delay` has passed since the last run.
    pub fn ready_at(&self, now_ms: i64, delay: Duration) -> bool {
        if self.is_busy() {
            return false;
        }
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.last_run()) >= delay_ms
    }

    /// Claim the job for a worker (`Idle -> Busy`).
    ///
    /// Returns false if another worker already holds it.
    pub fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the job (`Busy -> Idle`) and record when the run finished.
    pub fn finish(&self, completed_at_ms: i64) {
        self.last_run.store(completed_at_ms, Ordering::Release);
        self.busy.store(false, Ordering::Release);
    }
}
