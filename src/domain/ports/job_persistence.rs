use async_trait::async_trait;

use crate::domain::errors::GenieResult;
use crate::domain::models::{Job, JobExecution, JobMetadata, JobRequest, JobStatus};

/// Repository port for job records.
///
/// Every mutating call on an unknown job id fails with `NotFound`.
#[async_trait]
pub trait JobPersistenceService: Send + Sync {
    /// Save the request, its metadata, the job and a skeletal execution
    /// record as one unit. Fails with `Conflict` if the id already exists.
    async fn create_job(
        &self,
        request: &JobRequest,
        metadata: &JobMetadata,
        job: &Job,
        execution: &JobExecution,
    ) -> GenieResult<()>;

    /// Record the resolved execution plan.
    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory: u32,
    ) -> GenieResult<()>;

    /// Move a job to a new status with a human readable message.
    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        status_msg: &str,
    ) -> GenieResult<()>;

    /// Mark the job running under the given OS process.
    async fn set_job_running(&self, job_id: &str, process_id: u32) -> GenieResult<()>;

    /// Record the exit code read from the done file and the final status it implies.
    async fn set_exit_code(&self, job_id: &str, exit_code: i32) -> GenieResult<()>;

    async fn get_job(&self, job_id: &str) -> GenieResult<Option<Job>>;

    async fn get_job_execution(&self, job_id: &str) -> GenieResult<Option<JobExecution>>;
}
