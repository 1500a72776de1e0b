//! Lifecycle events and event handling.
//!
//! This module provides event emission for job lifecycle events, enabling
//! observability into what the scheduler dispatched, what it skipped and
//! what each run produced.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{JobId, RunId};

/// Lifecycle events emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum Event {
    /// A worker was dispatched for a job.
    JobStarted {
        job_id: JobId,
        run_id: RunId,
        timestamp: Instant,
    },

    /// A worker finished. `artifact` is `None` when the backup failed.
    JobCompleted {
        job_id: JobId,
        run_id: RunId,
        artifact: Option<PathBuf>,
        duration: Duration,
        timestamp: Instant,
    },

    /// A due job was not dispatched this tick.
    JobSkipped {
        job_id: JobId,
        reason: String,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::JobStarted { timestamp, .. } => *timestamp,
            Event::JobCompleted { timestamp, .. } => *timestamp,
            Event::JobSkipped { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job the event refers to.
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::JobStarted { job_id, .. } => job_id,
            Event::JobCompleted { job_id, .. } => job_id,
            Event::JobSkipped { job_id, .. } => job_id,
        }
    }

    /// Create a JobStarted event.
    pub fn job_started(job_id: JobId, run_id: RunId) -> Self {
        Event::JobStarted {
            job_id,
            run_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobCompleted event.
    pub fn job_completed(
        job_id: JobId,
        run_id: RunId,
        artifact: Option<PathBuf>,
        duration: Duration,
    ) -> Self {
        Event::JobCompleted {
            job_id,
            run_id,
            artifact,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobSkipped event.
    pub fn job_skipped(job_id: JobId, reason: impl Into<String>) -> Self {
        Event::JobSkipped {
            job_id,
            reason: reason.into(),
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
