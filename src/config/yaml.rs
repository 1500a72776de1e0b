//! YAML configuration parsing.
//!
//! Parses global settings and job definitions from one YAML file and checks
//! them before any job is built.

use std::collections::HashSet;
use std::path::Path;

use crate::core::job::JobType;
use crate::core::naming::NamingPolicy;

use super::error::ConfigError;
use super::types::{FormatterConfig, GlobalConfig, JobConfig, StashConfig};

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load and validate a configuration file.
    pub fn load_config(path: impl AsRef<Path>) -> Result<StashConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StashConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Parse and validate a configuration from a YAML string.
    pub fn parse_config(yaml: &str) -> Result<StashConfig, ConfigError> {
        let config: StashConfig = serde_yaml::from_str(yaml)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Parse and validate a single job definition.
    pub fn parse_job_config(yaml: &str) -> Result<JobConfig, ConfigError> {
        let config: JobConfig = serde_yaml::from_str(yaml)?;
        Self::validate_job_config(&config)?;
        Ok(config)
    }

    /// Validate settings, every job, and job name uniqueness.
    pub fn validate_config(config: &StashConfig) -> Result<(), ConfigError> {
        Self::validate_global_config(&config.settings)?;

        let mut names = HashSet::new();
        for job in &config.jobs {
            Self::validate_job_config(job)?;
            if !names.insert(job.name.as_str()) {
                return Err(ConfigError::DuplicateJob(job.name.clone()));
            }
        }

        Ok(())
    }

    fn validate_global_config(settings: &GlobalConfig) -> Result<(), ConfigError> {
        if settings.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "tick_interval_ms cannot be zero".into(),
            ));
        }

        // A zero ceiling would make every job un-runnable
        if settings.max_concurrent_jobs == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_concurrent_jobs cannot be zero".into(),
            ));
        }

        Ok(())
    }

    /// Validate one job definition.
    pub fn validate_job_config(config: &JobConfig) -> Result<(), ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }
        let name = config.name.as_str();

        let kind: JobType = config
            .job_type
            .parse()
            .map_err(|e| ConfigError::job(name, e))?;

        let sources = config.directory.paths();
        if sources.is_empty() {
            return Err(ConfigError::MissingField(format!("{}.directory", name)));
        }
        if sources.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig(format!(
                "job '{}' has an empty directory entry",
                name
            )));
        }

        match kind {
            JobType::File => {
                if sources.len() != 1 {
                    return Err(ConfigError::InvalidConfig(format!(
                        "job '{}' copies a single file but lists {} directories",
                        name,
                        sources.len()
                    )));
                }
                Self::require(name, "destination", config.destination.as_deref())?;
            }
            JobType::Files => {
                Self::require(name, "destination", config.destination.as_deref())?;
            }
            JobType::Sftp => {
                Self::require(name, "local_destination", config.local_path())?;
                let server = config
                    .server
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingField(format!("{}.server", name)))?;
                Self::require(name, "server.address", Some(server.address.as_str()))?;
                Self::require(name, "server.user", Some(server.user.as_str()))?;
                Self::require(name, "server.destination", Some(server.destination.as_str()))?;
                if server.port == 0 {
                    return Err(ConfigError::InvalidConfig(format!(
                        "job '{}' has server port 0",
                        name
                    )));
                }
            }
        }

        if let Some(formatter) = &config.formatter {
            Self::naming_policy(name, formatter)?;
        }

        Ok(())
    }

    /// Build the naming policy a formatter block describes.
    pub fn naming_policy(
        job: &str,
        formatter: &FormatterConfig,
    ) -> Result<NamingPolicy, ConfigError> {
        let mut naming = NamingPolicy::default();
        if let Some(prefix) = &formatter.prefix {
            naming.set_prefix(prefix.as_str());
        }
        if let Some(format) = &formatter.format {
            naming
                .set_time_format(format.as_str())
                .map_err(|e| ConfigError::job(job, e))?;
        }
        if let Some(zone) = &formatter.timezone {
            naming
                .set_time_zone(zone)
                .map_err(|e| ConfigError::job(job, e))?;
        }
        Ok(naming)
    }

    fn require(job: &str, field: &str, value: Option<&str>) -> Result<(), ConfigError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingField(format!("{}.{}", job, field))),
        }
    }
}
