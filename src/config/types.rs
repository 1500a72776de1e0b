//! Configuration type definitions.
//!
//! This module contains the type definitions for the YAML configuration file:
//! global settings plus the list of backup jobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::state::StartPolicy;
use crate::transfer::DEFAULT_PORT;

/// A whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StashConfig {
    /// Global settings.
    #[serde(default)]
    pub settings: GlobalConfig,
    /// Job definitions, in scan order.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Time between ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// Whether jobs are due on the first tick after startup.
    pub launch_immediately: bool,
    /// Maximum concurrent jobs (unset = unlimited).
    pub max_concurrent_jobs: Option<usize>,
    /// How long shutdown waits for running jobs, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            launch_immediately: true,
            max_concurrent_jobs: None,
            shutdown_timeout_secs: 30,
        }
    }
}

impl GlobalConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn start_policy(&self) -> StartPolicy {
        StartPolicy::from_launch_immediately(self.launch_immediately)
    }
}

/// One or more source paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    /// A single path.
    One(String),
    /// A list of paths.
    Many(Vec<String>),
}

impl Sources {
    /// Get the paths in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Sources::One(path) => vec![path.as_str()],
            Sources::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sources::One(_) => 1,
            Sources::Many(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Sources {
    fn default() -> Self {
        Sources::Many(Vec::new())
    }
}

/// Job configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name, unique within the file.
    pub name: String,
    /// Job type tag: `file`, `files` or `sftp` (case-insensitive).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Local directory artifacts are written to.
    pub destination: Option<String>,
    /// Source path or paths.
    #[serde(default)]
    pub directory: Sources,
    /// Minimum time between runs, in milliseconds.
    pub delay: u64,
    /// Artifact naming overrides.
    pub formatter: Option<FormatterConfig>,
    /// Local staging directory for `sftp` jobs.
    pub local_destination: Option<String>,
    /// Whether `sftp` jobs keep the local archive after uploading.
    #[serde(default = "default_true")]
    pub keep_local: bool,
    /// Remote server for `sftp` jobs.
    pub server: Option<ServerConfig>,
}

fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Local directory for artifacts: `local_destination` if set, else
    /// `destination`.
    pub fn local_path(&self) -> Option<&str> {
        self.local_destination
            .as_deref()
            .or(self.destination.as_deref())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}

/// Artifact naming overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// chrono strftime pattern.
    pub format: Option<String>,
    /// IANA time zone name.
    pub timezone: Option<String>,
    /// Text placed before the timestamp.
    pub prefix: Option<String>,
}

/// Remote server for `sftp` jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or IP address.
    pub address: String,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub pass: String,
    /// Remote directory to upload into.
    pub destination: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
