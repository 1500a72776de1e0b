//! Job builder from YAML configuration.
//!
//! This module converts JobConfig into runnable BackupJob instances and
//! assembles a scheduler from a whole configuration file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::job::{BackupJob, JobType};
use crate::core::state::StartPolicy;
use crate::execution::{ArchiveBackup, Backup, CopyBackup, RemoteBackup};
use crate::scheduler::Scheduler;
use crate::transfer::{Credentials, SftpShipper, Shipper};

use super::error::ConfigError;
use super::types::{GlobalConfig, JobConfig, StashConfig};
use super::yaml::YamlLoader;

/// Builder for creating BackupJobs from configuration.
pub struct JobConfigBuilder {
    shipper: Arc<dyn Shipper>,
    start_policy: StartPolicy,
}

impl JobConfigBuilder {
    /// Create a builder that ships over SFTP and starts jobs immediately.
    pub fn new() -> Self {
        Self {
            shipper: Arc::new(SftpShipper::new()),
            start_policy: StartPolicy::Immediate,
        }
    }

    /// Use a different shipper for `sftp` jobs.
    pub fn with_shipper(mut self, shipper: Arc<dyn Shipper>) -> Self {
        self.shipper = shipper;
        self
    }

    /// Set the start policy applied to every built job.
    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    /// Build a BackupJob from a JobConfig.
    pub fn build(&self, config: &JobConfig) -> Result<BackupJob, ConfigError> {
        YamlLoader::validate_job_config(config)?;

        let name = config.name.as_str();
        let kind: JobType = config
            .job_type
            .parse()
            .map_err(|e| ConfigError::job(name, e))?;
        let sources: Vec<PathBuf> = config
            .directory
            .paths()
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let strategy: Arc<dyn Backup> = match kind {
            JobType::File => {
                let source = sources
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConfigError::MissingField(format!("{}.directory", name)))?;
                Arc::new(CopyBackup::new(
                    source,
                    Self::local_dir(name, config.destination.as_deref())?,
                ))
            }
            JobType::Files => Arc::new(ArchiveBackup::new(
                sources,
                Self::local_dir(name, config.destination.as_deref())?,
            )),
            JobType::Sftp => {
                let server = config
                    .server
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingField(format!("{}.server", name)))?;
                let credentials = Credentials::new(&server.address, &server.user, &server.pass)
                    .with_port(server.port);
                Arc::new(
                    RemoteBackup::new(
                        sources,
                        Self::local_dir(name, config.local_path())?,
                        credentials,
                        &server.destination,
                        Arc::clone(&self.shipper),
                    )
                    .with_keep_local(config.keep_local),
                )
            }
        };

        let mut job = BackupJob::new(name, config.delay(), strategy)
            .with_start_policy(self.start_policy);

        // Formatter overrides are applied after construction
        if let Some(formatter) = &config.formatter {
            *job.naming_mut() = YamlLoader::naming_policy(name, formatter)?;
        }

        Ok(job)
    }

    /// Build every job, in order.
    pub fn build_all(&self, configs: &[JobConfig]) -> Result<Vec<BackupJob>, ConfigError> {
        configs.iter().map(|config| self.build(config)).collect()
    }

    fn local_dir(job: &str, value: Option<&str>) -> Result<PathBuf, ConfigError> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingField(format!("{}.destination", job)))
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a scheduler with the given settings and no jobs.
pub fn scheduler_from_settings(settings: &GlobalConfig) -> Scheduler {
    let mut scheduler = Scheduler::new()
        .with_tick_interval(settings.tick_interval())
        .with_shutdown_timeout(settings.shutdown_timeout());
    if let Some(max) = settings.max_concurrent_jobs {
        scheduler = scheduler.with_max_concurrent_jobs(max);
    }
    scheduler
}

/// Build a scheduler holding every job in `config`.
pub fn build_scheduler(
    config: &StashConfig,
    builder: JobConfigBuilder,
) -> Result<Scheduler, ConfigError> {
    YamlLoader::validate_config(config)?;

    let builder = builder.with_start_policy(config.settings.start_policy());
    let mut scheduler = scheduler_from_settings(&config.settings);
    for job in builder.build_all(&config.jobs)? {
        scheduler.register(job);
    }
    Ok(scheduler)
}

/// Load a configuration file and build a scheduler from it.
pub fn load_scheduler(path: impl AsRef<Path>) -> Result<Scheduler, ConfigError> {
    let config = YamlLoader::load_config(path)?;
    build_scheduler(&config, JobConfigBuilder::new())
}
