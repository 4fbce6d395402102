use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}. Memory values must be positive")]
    ZeroMemory { name: &'static str, value: u32 },

    #[error(
        "Invalid memory budget: default_job_memory ({default}) <= max_job_memory ({max_job}) <= max_system_memory ({max_system}) must hold"
    )]
    InconsistentMemory {
        default: u32,
        max_job: u32,
        max_system: u32,
    },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid check_interval_ms: {0}. Must be positive")]
    InvalidCheckInterval(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .genie/config.yaml (host config)
    /// 3. .genie/local.yaml (local overrides, optional)
    /// 4. Environment variables (GENIE_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".genie/config.yaml"))
            .merge(Yaml::file(".genie/local.yaml"))
            .merge(Env::prefixed("GENIE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let memory = &config.jobs.memory;
        for (name, value) in [
            ("default_job_memory", memory.default_job_memory),
            ("max_job_memory", memory.max_job_memory),
            ("max_system_memory", memory.max_system_memory),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroMemory { name, value });
            }
        }
        if memory.default_job_memory > memory.max_job_memory
            || memory.max_job_memory > memory.max_system_memory
        {
            return Err(ConfigError::InconsistentMemory {
                default: memory.default_job_memory,
                max_job: memory.max_job_memory,
                max_system: memory.max_system_memory,
            });
        }

        if config.jobs.monitor.check_interval_ms == 0 {
            return Err(ConfigError::InvalidCheckInterval(0));
        }

        if config.jobs.locations.jobs.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "jobs.locations.jobs cannot be empty".to_string(),
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
