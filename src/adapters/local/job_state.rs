//! Execution state for jobs launched on this host.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command as ProcessCommand;
use tracing::{info, instrument, warn};

use super::attachments::validate_path_segment;
use super::job_monitor::JobMonitor;
use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{Application, Cluster, Command, JobRequest, JobsConfig};
use crate::domain::ports::{JobPersistenceService, JobStateService};
use crate::services::memory_ledger::MemoryLedger;
use crate::services::workflow::{ExecutionContext, JobExecutionEnvironment, WorkflowExecutor};

/// Runs jobs as local `bash` processes and accounts for their memory.
///
/// `schedule` reserves memory, materializes the launch script through the
/// workflow pipeline, starts the script in the background and hands the
/// process to a [`JobMonitor`]. Any failure before the monitor takes over
/// releases the reservation.
pub struct LocalJobStateService {
    ledger: MemoryLedger,
    persistence: Arc<dyn JobPersistenceService>,
    workflow: Arc<WorkflowExecutor>,
    jobs_dir: PathBuf,
    check_interval: Duration,
}

impl LocalJobStateService {
    pub fn new(
        ledger: MemoryLedger,
        persistence: Arc<dyn JobPersistenceService>,
        workflow: Arc<WorkflowExecutor>,
        jobs_config: &JobsConfig,
    ) -> Self {
        Self {
            ledger,
            persistence,
            workflow,
            jobs_dir: jobs_config.locations.jobs.clone(),
            check_interval: Duration::from_millis(jobs_config.monitor.check_interval_ms),
        }
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    async fn launch(&self, environment: JobExecutionEnvironment) -> GenieResult<()> {
        let job_id = environment.job_id.clone();
        let working_dir = environment.job_working_dir.clone();
        let timeout = environment
            .job_request
            .timeout_secs()
            .map(Duration::from_secs);

        let context = ExecutionContext::create(environment).await?;
        let script = self.workflow.run(context).await?;

        let mut child = ProcessCommand::new("bash")
            .arg(&script)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GenieError::Server(format!("Unable to start job process: {e}")))?;
        let pid = child
            .id()
            .ok_or_else(|| GenieError::Server("Job process exited before reporting a pid".to_string()))?;

        if let Err(err) = self.persistence.set_job_running(&job_id, pid).await {
            if let Err(kill_err) = child.start_kill() {
                warn!(error = %kill_err, pid, "Unable to stop unrecorded job process");
            }
            return Err(err);
        }
        info!(pid, "Job process started");

        JobMonitor::new(
            job_id,
            &working_dir,
            child,
            self.persistence.clone(),
            self.ledger.clone(),
            self.check_interval,
        )
        .with_timeout(timeout)
        .spawn();
        Ok(())
    }
}

#[async_trait]
impl JobStateService for LocalJobStateService {
    async fn used_memory(&self) -> GenieResult<u64> {
        Ok(self.ledger.used().await)
    }

    #[instrument(skip(self, request, cluster, command, applications), fields(cluster_id = %cluster.id, command_id = %command.id))]
    async fn schedule(
        &self,
        job_id: &str,
        request: &JobRequest,
        cluster: &Cluster,
        command: &Command,
        applications: &[Application],
        memory: u32,
    ) -> GenieResult<()> {
        validate_path_segment("job id", job_id)?;
        self.ledger.reserve(job_id, memory).await;

        let environment = JobExecutionEnvironment {
            job_id: job_id.to_string(),
            job_request: request.clone(),
            cluster: cluster.clone(),
            command: command.clone(),
            applications: applications.to_vec(),
            memory,
            job_working_dir: self.jobs_dir.join(job_id),
        };

        if let Err(err) = self.launch(environment).await {
            self.ledger.release(job_id).await;
            return Err(err);
        }
        Ok(())
    }
}
