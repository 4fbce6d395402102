//! Port trait definitions (Hexagonal Architecture)
//!
//! The coordinator and the workflow pipeline only talk to the outside world
//! through these traits:
//! - Resource lookups: clusters, commands, applications, load balancing
//! - JobPersistenceService: the durable job record
//! - JobStateService / JobKillService: host-local execution
//! - FileTransferService / AttachmentService: staging files for a job
pub mod file_staging;
pub mod job_execution;
pub mod job_persistence;
pub mod resource_lookup;

pub use file_staging::{AttachmentService, FileTransferService};
pub use job_execution::{JobKillService, JobStateService};
pub use job_persistence::JobPersistenceService;
pub use resource_lookup::{ApplicationService, ClusterLoadBalancer, ClusterService, CommandService};
