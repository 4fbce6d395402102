//! Service layer: the coordination core and the workflow pipeline.
//!
//! Services depend only on domain ports, never on concrete adapters.

pub mod admission;
pub mod job_coordinator;
pub mod load_balancer;
pub mod memory_ledger;
pub mod resource_resolver;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use admission::AdmissionController;
pub use job_coordinator::JobCoordinator;
pub use load_balancer::FirstClusterLoadBalancer;
pub use memory_ledger::MemoryLedger;
pub use resource_resolver::{ResolvedResources, ResourceResolver};
pub use workflow::{
    ExecutionContext, JobExecutionEnvironment, WorkflowExecutor, WorkflowTask,
};
