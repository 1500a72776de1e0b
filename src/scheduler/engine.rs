//! Scheduler engine implementation.
//!
//! The scheduler is responsible for:
//! - Scanning every job once per tick and dispatching the due ones
//! - Keeping job execution off the tick path (one blocking worker per run)
//! - Manual job triggers
//! - Pause and resume functionality
//! - Joining in-flight workers on shutdown
//! - Event emission

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::job::BackupJob;
use crate::core::state::now_millis;
use crate::core::types::{JobId, RunId};
use crate::events::{Event, EventBus};
use crate::execution::JobWorker;

use super::handle::{COMMAND_CHANNEL_BUFFER, SchedulerHandle};
use super::types::{JobStatus, SchedulerCommand, SchedulerError, SchedulerState};

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Default time shutdown waits for in-flight jobs.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often shutdown re-checks in-flight jobs.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

type RunningJobs = Arc<RwLock<HashMap<RunId, (JobId, JoinHandle<()>)>>>;

/// Fixed-interval scheduler over an ordered set of backup jobs.
pub struct Scheduler {
    /// Registered jobs, in scan order.
    jobs: Vec<Arc<BackupJob>>,
    /// Event bus for emitting events.
    event_bus: Arc<EventBus>,
    /// Time between tick starts.
    tick_interval: Duration,
    /// Maximum concurrent jobs overall (None = unlimited).
    max_concurrent_jobs: Option<usize>,
    /// In-flight runs mapped to (JobId, Handle).
    running_jobs: RunningJobs,
    /// Graceful shutdown timeout.
    shutdown_timeout: Duration,
    /// State the driver loop starts in.
    initial_state: SchedulerState,
}

impl Scheduler {
    /// Create a scheduler with no jobs and default settings.
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            event_bus: Arc::new(EventBus::new()),
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_concurrent_jobs: None,
            running_jobs: Arc::new(RwLock::new(HashMap::new())),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            initial_state: SchedulerState::Running,
        }
    }

    /// Set the event bus.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Arc::new(event_bus);
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the maximum concurrent jobs.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = Some(max);
        self
    }

    /// Set the graceful shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Start the driver loop paused; only manual triggers run until resumed.
    pub fn start_paused(mut self) -> Self {
        self.initial_state = SchedulerState::Paused;
        self
    }

    /// Register a job. Jobs are scanned in registration order.
    pub fn register(&mut self, job: BackupJob) {
        self.jobs.push(Arc::new(job));
    }

    /// Get a registered job by ID.
    pub fn get_job(&self, id: &JobId) -> Option<&Arc<BackupJob>> {
        self.jobs.iter().find(|job| job.id() == id)
    }

    /// List all registered jobs.
    pub fn jobs(&self) -> impl Iterator<Item = &Arc<BackupJob>> {
        self.jobs.iter()
    }

    /// Get the event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Get the tick interval.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of runs currently in flight.
    pub async fn running_count(&self) -> usize {
        self.running_jobs.read().await.len()
    }

    /// Start the scheduler and return a handle for controlling it.
    pub fn start(self) -> (SchedulerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
        let state = Arc::new(RwLock::new(self.initial_state));

        let handle = SchedulerHandle {
            command_tx,
            state: Arc::clone(&state),
        };

        info!(
            jobs = self.jobs.len(),
            tick_interval = ?self.tick_interval,
            "Scheduler starting"
        );

        let scheduler_task = tokio::spawn(async move {
            self.run(command_rx, state).await;
        });

        (handle, scheduler_task)
    }

    /// Main scheduler loop.
    ///
    /// Each tick is scheduled one interval after the previous tick started.
    /// A tick that overruns its interval is followed immediately by the next;
    /// missed ticks are not replayed.
    async fn run(
        self,
        mut command_rx: mpsc::Receiver<SchedulerCommand>,
        state: Arc<RwLock<SchedulerState>>,
    ) {
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_tick) => {
                    let started = Instant::now();
                    if *state.read().await == SchedulerState::Running {
                        self.tick().await;
                    }
                    self.cleanup_finished_jobs().await;
                    next_tick = started + self.tick_interval;
                }

                Some(command) = command_rx.recv() => {
                    match command {
                        SchedulerCommand::Trigger { job_id, response } => {
                            let result = self.trigger_job(&job_id).await;
                            let _ = response.send(result);
                        }
                        SchedulerCommand::Status { response } => {
                            let _ = response.send(self.status());
                        }
                        SchedulerCommand::Pause { response } => {
                            *state.write().await = SchedulerState::Paused;
                            info!("Scheduler paused");
                            let _ = response.send(());
                        }
                        SchedulerCommand::Resume { response } => {
                            *state.write().await = SchedulerState::Running;
                            info!("Scheduler resumed");
                            let _ = response.send(());
                        }
                        SchedulerCommand::Shutdown { response } => {
                            *state.write().await = SchedulerState::Stopped;
                            self.await_running_jobs().await;
                            let _ = response.send(());
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Scan every job once and dispatch those that are due.
    ///
    /// Never waits for a backup to finish. Returns the number of workers
    /// dispatched.
    pub async fn tick(&self) -> usize {
        let now = now_millis();
        let mut dispatched = 0;

        for job in &self.jobs {
            if !job.ready_at(now) {
                continue;
            }

            if let Some(max) = self.max_concurrent_jobs {
                let running = self.running_count().await;
                if running >= max {
                    debug!(job = %job.id(), running, max, "Concurrency limit reached, skipping");
                    self.event_bus
                        .emit(Event::job_skipped(
                            job.id().clone(),
                            format!("concurrency limit of {} reached", max),
                        ))
                        .await;
                    continue;
                }
            }

            if self.dispatch(job).await.is_some() {
                dispatched += 1;
            }
        }

        dispatched
    }

    /// Run a job now regardless of its delay.
    async fn trigger_job(&self, job_id: &JobId) -> Result<RunId, SchedulerError> {
        let job = self
            .get_job(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;

        if let Some(max) = self.max_concurrent_jobs
            && self.running_count().await >= max
        {
            return Err(SchedulerError::MaxConcurrentJobsExceeded(max));
        }

        self.dispatch(job)
            .await
            .ok_or_else(|| SchedulerError::JobBusy(job_id.to_string()))
    }

    /// Claim `job` and hand it to a blocking worker.
    ///
    /// Returns `None` if the job is already running.
    async fn dispatch(&self, job: &Arc<BackupJob>) -> Option<RunId> {
        let worker = JobWorker::claim(Arc::clone(job))?;
        let run_id = worker.run_id().clone();
        let job_id = job.id().clone();

        let event_bus = Arc::clone(&self.event_bus);
        let running_jobs = Arc::clone(&self.running_jobs);
        let task_job_id = job_id.clone();
        let task_run_id = run_id.clone();

        // Hold the lock across spawn and insert so the task cannot try to
        // remove itself before it is tracked.
        let mut running = self.running_jobs.write().await;
        let handle = tokio::spawn(async move {
            event_bus
                .emit(Event::job_started(task_job_id.clone(), task_run_id.clone()))
                .await;

            let start = std::time::Instant::now();
            let (artifact, duration) = match tokio::task::spawn_blocking(move || worker.run()).await
            {
                Ok(result) => (result.artifact, result.duration),
                Err(e) => {
                    error!(job = %task_job_id, run_id = %task_run_id, error = %e, "Worker panicked");
                    (None, start.elapsed())
                }
            };

            event_bus
                .emit(Event::job_completed(
                    task_job_id,
                    task_run_id.clone(),
                    artifact,
                    duration,
                ))
                .await;

            running_jobs.write().await.remove(&task_run_id);
        });
        running.insert(run_id.clone(), (job_id.clone(), handle));
        drop(running);

        debug!(job = %job_id, run_id = %run_id, "Job dispatched");
        Some(run_id)
    }

    fn status(&self) -> Vec<JobStatus> {
        self.jobs
            .iter()
            .map(|job| JobStatus {
                job_id: job.id().clone(),
                kind: job.kind(),
                delay: job.delay(),
                run_state: job.run_state(),
                last_run: job.state().last_run(),
            })
            .collect()
    }

    /// Clean up finished job handles.
    async fn cleanup_finished_jobs(&self) {
        let mut running = self.running_jobs.write().await;
        running.retain(|_, (_, handle)| !handle.is_finished());
    }

    /// Wait up to `timeout` for in-flight jobs to finish.
    ///
    /// Returns the number of jobs still running when the wait ended.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;

        loop {
            self.cleanup_finished_jobs().await;
            let remaining = self.running_count().await;

            if remaining == 0 || Instant::now() >= deadline {
                return remaining;
            }

            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Wait for all running jobs to complete with the shutdown timeout.
    async fn await_running_jobs(&self) {
        let running_count = self.running_count().await;

        if running_count == 0 {
            info!("No running jobs to wait for during shutdown");
            return;
        }

        info!(
            running = running_count,
            timeout = ?self.shutdown_timeout,
            "Graceful shutdown: waiting for running jobs"
        );

        let start = Instant::now();
        let remaining = self.drain(self.shutdown_timeout).await;

        if remaining == 0 {
            info!(elapsed = ?start.elapsed(), "All running jobs completed gracefully");
            return;
        }

        let running = self.running_jobs.read().await;
        for (run_id, (job_id, _)) in running.iter() {
            warn!(job = %job_id, run_id = %run_id, "Job still running at shutdown");
        }
        warn!(
            timeout = ?self.shutdown_timeout,
            remaining,
            "Graceful shutdown timeout exceeded"
        );
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
