use async_trait::async_trait;

use crate::domain::errors::GenieResult;
use crate::domain::models::{Application, Cluster, Command, JobRequest};

/// Port for the host-local execution state.
///
/// Implementations must keep their memory accounting consistent under
/// concurrent `used_memory`/`schedule` calls. The coordinator reads the used
/// memory and schedules in two separate calls, so a short over-commit window
/// between concurrent admissions is expected.
#[async_trait]
pub trait JobStateService: Send + Sync {
    /// Memory (MB) reserved by every job currently scheduled on this host.
    async fn used_memory(&self) -> GenieResult<u64>;

    /// Register the job's memory and hand it to execution.
    async fn schedule(
        &self,
        job_id: &str,
        request: &JobRequest,
        cluster: &Cluster,
        command: &Command,
        applications: &[Application],
        memory: u32,
    ) -> GenieResult<()>;
}

/// Port for killing a job that was handed to execution.
#[async_trait]
pub trait JobKillService: Send + Sync {
    async fn kill_job(&self, job_id: &str) -> GenieResult<()>;
}
