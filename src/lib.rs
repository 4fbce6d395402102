//! Genie core - job coordination for a single execution host
//!
//! Accepts a validated job request, resolves the cluster, command and
//! applications it runs against, enforces the host memory budget, records
//! the job, and hands it to the local execution layer, which renders a launch
//! script through an ordered workflow pipeline and monitors the process.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and port traits
//! - **Service Layer** (`services`): Resolution, admission, coordination, workflow
//! - **Adapters** (`adapters`): `SQLite` persistence, in-memory catalog, local execution
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use genie_core::{ConfigLoader, JobCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     // Wire adapters into a JobCoordinator and call coordinate_job
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{GenieError, GenieResult};
pub use domain::models::{
    Application, Cluster, ClusterCriteria, Command, Config, Job, JobExecution, JobMetadata,
    JobRequest, JobStatus,
};
pub use domain::ports::{
    ApplicationService, AttachmentService, ClusterLoadBalancer, ClusterService, CommandService,
    FileTransferService, JobKillService, JobPersistenceService, JobStateService,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::LoggerImpl;
pub use services::{JobCoordinator, MemoryLedger, WorkflowExecutor};
