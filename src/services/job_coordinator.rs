//! End-to-end job coordination.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{
    Job, JobExecution, JobMetadata, JobRequest, JobStatus, JobsConfig, LocationsConfig,
};
use crate::domain::ports::{JobKillService, JobPersistenceService, JobStateService};
use crate::services::admission::AdmissionController;
use crate::services::resource_resolver::{ResolvedResources, ResourceResolver};

/// Decides where and how a job runs, persists that plan and hands the job
/// to execution.
///
/// The sequence for one job is strictly sequential:
///
/// 1. resolve cluster, command and applications
/// 2. per-job memory cap
/// 3. persist the job (the durability point)
/// 4. host-wide memory budget
/// 5. persist the resolved runtime environment
/// 6. schedule with the execution state
///
/// Failures before step 3 leave no trace. Failures after it mark the job
/// `FAILED` before the error is returned; a failure of that status update is
/// logged and never replaces the original error.
///
/// The coordinator holds no locks. Many jobs may be coordinated concurrently
/// through a shared `Arc<JobCoordinator>`.
pub struct JobCoordinator {
    resolver: ResourceResolver,
    admission: AdmissionController,
    persistence: Arc<dyn JobPersistenceService>,
    job_state: Arc<dyn JobStateService>,
    kill_service: Arc<dyn JobKillService>,
    locations: LocationsConfig,
    host_name: String,
}

impl JobCoordinator {
    pub fn new(
        resolver: ResourceResolver,
        persistence: Arc<dyn JobPersistenceService>,
        job_state: Arc<dyn JobStateService>,
        kill_service: Arc<dyn JobKillService>,
        jobs_config: &JobsConfig,
        host_name: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            admission: AdmissionController::new(jobs_config.memory, job_state.clone()),
            persistence,
            job_state,
            kill_service,
            locations: jobs_config.locations.clone(),
            host_name: host_name.into(),
        }
    }

    /// Coordinate a job and return its id once it has been handed to execution.
    #[instrument(skip_all, fields(job_id = tracing::field::Empty))]
    pub async fn coordinate_job(
        &self,
        request: &JobRequest,
        metadata: &JobMetadata,
    ) -> GenieResult<String> {
        let job_id = request
            .id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                GenieError::Server("Job request has no id. Unable to coordinate job".to_string())
            })?
            .to_string();
        tracing::Span::current().record("job_id", job_id.as_str());

        let resolved = self.resolver.resolve(request).await?;
        let memory = self.admission.effective_memory(request, &resolved.command);
        self.admission.check_job_memory(memory)?;

        let archive_location = (!request.disable_log_archival())
            .then(|| self.locations.archive_location(&job_id));
        let job = Job::init(&job_id, request, archive_location);
        let execution = JobExecution::skeleton(&job_id, &self.host_name);
        self.persistence
            .create_job(request, metadata, &job, &execution)
            .await?;

        if let Err(err) = self.admission.check_system_memory(memory).await {
            self.mark_failed(&job_id, err.message()).await;
            return Err(err);
        }

        if let Err(err) = self
            .persistence
            .update_job_with_runtime_environment(
                &job_id,
                &resolved.cluster.id,
                &resolved.command.id,
                &resolved.application_ids(),
                memory,
            )
            .await
        {
            self.mark_failed(&job_id, err.message()).await;
            return Err(err);
        }

        self.schedule(&job_id, request, &resolved, memory).await?;

        info!(
            cluster_id = %resolved.cluster.id,
            command_id = %resolved.command.id,
            memory,
            "Job coordinated"
        );
        Ok(job_id)
    }

    /// Kill a job already handed to execution. Errors pass through unchanged.
    #[instrument(skip(self))]
    pub async fn kill_job(&self, job_id: &str) -> GenieResult<()> {
        self.kill_service.kill_job(job_id).await
    }

    /// Delegate to execution. Any failure, including a panic in the
    /// execution service, marks the job failed and surfaces as a server error.
    async fn schedule(
        &self,
        job_id: &str,
        request: &JobRequest,
        resolved: &ResolvedResources,
        memory: u32,
    ) -> GenieResult<()> {
        let outcome = AssertUnwindSafe(self.job_state.schedule(
            job_id,
            request,
            &resolved.cluster,
            &resolved.command,
            &resolved.applications,
            memory,
        ))
        .catch_unwind()
        .await;

        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => format!("Failed to launch job: {}", err.message()),
            Err(panic) => format!("Failed to launch job: {}", panic_message(panic.as_ref())),
        };

        error!(error = %message, "Job launch failed");
        self.mark_failed(job_id, &message).await;
        Err(GenieError::Server(message))
    }

    async fn mark_failed(&self, job_id: &str, message: &str) {
        if let Err(err) = self
            .persistence
            .update_job_status(job_id, JobStatus::Failed, message)
            .await
        {
            warn!(error = %err, "Unable to mark job failed");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unexpected panic")
}
