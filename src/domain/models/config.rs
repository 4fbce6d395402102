use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the job coordination core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Host name recorded on job executions (falls back to `$HOSTNAME`)
    #[serde(default)]
    pub host_name: Option<String>,

    /// Job execution configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Host name to stamp on job executions.
    pub fn resolved_host_name(&self) -> String {
        self.host_name
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}

/// Job execution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobsConfig {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub locations: LocationsConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Memory admission budget, all values in MB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Used when neither the request nor the command asks for memory
    #[serde(default = "default_job_memory")]
    pub default_job_memory: u32,

    /// Hard cap for a single job
    #[serde(default = "default_max_job_memory")]
    pub max_job_memory: u32,

    /// Hard cap for the sum of all jobs scheduled on this host
    #[serde(default = "default_max_system_memory")]
    pub max_system_memory: u32,
}

const fn default_job_memory() -> u32 {
    1024
}

const fn default_max_job_memory() -> u32 {
    10_240
}

const fn default_max_system_memory() -> u32 {
    30_720
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_job_memory: default_job_memory(),
            max_job_memory: default_max_job_memory(),
            max_system_memory: default_max_system_memory(),
        }
    }
}

/// Filesystem and archive locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationsConfig {
    /// Root under which each job gets its working directory
    #[serde(default = "default_jobs_dir")]
    pub jobs: PathBuf,

    /// Root of the local attachment store
    #[serde(default = "default_attachments_dir")]
    pub attachments: PathBuf,

    /// Base URI job archives are written under
    #[serde(default = "default_archives")]
    pub archives: String,
}

fn default_jobs_dir() -> PathBuf {
    PathBuf::from("/tmp/genie/jobs")
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("/tmp/genie/attachments")
}

fn default_archives() -> String {
    "file:///tmp/genie/archives/".to_string()
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs_dir(),
            attachments: default_attachments_dir(),
            archives: default_archives(),
        }
    }
}

impl LocationsConfig {
    /// Where the archive of a job's working directory will be written.
    pub fn archive_location(&self, job_id: &str) -> String {
        format!("{}/{}.tar.gz", self.archives.trim_end_matches('/'), job_id)
    }
}

/// Done-file monitor configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

const fn default_check_interval_ms() -> u64 {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".genie/genie.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Stdout format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling JSON log files (stdout only when absent)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}
