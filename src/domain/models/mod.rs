pub mod config;
pub mod job;
pub mod resource;

pub use config::{
    Config, DatabaseConfig, JobsConfig, LocationsConfig, LogFormat, LoggingConfig, MemoryConfig,
    MonitorConfig, RotationPolicy,
};
pub use job::{
    ClusterCriteria, Job, JobExecution, JobMetadata, JobRequest, JobStatus, KILLED_EXIT_CODE,
};
pub use resource::{
    tags, Application, Cluster, ClusterStatus, Command, CommandStatus, ResourceFiles,
};
