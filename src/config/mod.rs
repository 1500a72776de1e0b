//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for global settings and
//! backup jobs, and turns a loaded configuration into a ready scheduler.

mod builder;
mod error;
mod types;
mod yaml;

pub use builder::{JobConfigBuilder, build_scheduler, load_scheduler, scheduler_from_settings};
pub use error::ConfigError;
pub use types::{FormatterConfig, GlobalConfig, JobConfig, ServerConfig, Sources, StashConfig};
pub use yaml::YamlLoader;
