//! Artifact naming policy.
//!
//! Every run of a job writes its artifact under a fresh, timestamped name:
//! `<destination>/<prefix><formatted time>`. The timestamp is rendered with a
//! chrono strftime pattern in the job's configured time zone.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};

use super::job::JobError;

/// Default timestamp pattern, e.g. `03-14-2025 09 30 PM`.
pub const DEFAULT_TIME_FORMAT: &str = "%m-%d-%Y %I %M %p";

/// Default time zone used to render timestamps.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::America::Chicago;

/// How a job names the artifacts it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    prefix: String,
    time_format: String,
    time_zone: Tz,
}

impl NamingPolicy {
    /// Create a policy with the default pattern, time zone and no prefix.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            time_zone: DEFAULT_TIME_ZONE,
        }
    }

    /// Set the prefix, returning the updated policy.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.set_prefix(prefix);
        self
    }

    /// Set the timestamp pattern, returning the updated policy.
    pub fn with_time_format(mut self, format: impl Into<String>) -> Result<Self, JobError> {
        self.set_time_format(format)?;
        Ok(self)
    }

    /// Set the time zone, returning the updated policy.
    pub fn with_time_zone(mut self, zone: &str) -> Result<Self, JobError> {
        self.set_time_zone(zone)?;
        Ok(self)
    }

    /// Replace the prefix.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Replace the timestamp pattern.
    ///
    /// The pattern is checked up front: chrono only reports a bad specifier
    /// when the timestamp is rendered, which would be mid-backup.
    pub fn set_time_format(&mut self, format: impl Into<String>) -> Result<(), JobError> {
        let format = format.into();
        if format.is_empty() || StrftimeItems::new(&format).any(|item| item == Item::Error) {
            return Err(JobError::InvalidTimeFormat(format));
        }
        self.time_format = format;
        Ok(())
    }

    /// Replace the time zone with an IANA zone name such as `Europe/Berlin`.
    pub fn set_time_zone(&mut self, zone: &str) -> Result<(), JobError> {
        self.time_zone = zone
            .parse::<Tz>()
            .map_err(|_| JobError::InvalidTimeZone(zone.to_string()))?;
        Ok(())
    }

    /// Get the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the timestamp pattern.
    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    /// Get the time zone.
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Render the artifact file name for the given instant.
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&self.time_zone);
        format!("{}{}", self.prefix, local.format(&self.time_format))
    }

    /// Resolve the full artifact path under `parent` for the given instant.
    pub fn resolve(&self, parent: &Path, at: DateTime<Utc>) -> PathBuf {
        parent.join(self.file_name(at))
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::new()
    }
}
