//! Kill jobs running on this host.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::JobStatus;
use crate::domain::ports::{JobKillService, JobPersistenceService};

/// Deliver SIGTERM to a job's launch script.
pub(crate) fn send_sigterm(pid: u32) -> Result<(), Errno> {
    let pid = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
    kill(Pid::from_raw(pid), Signal::SIGTERM)
}

/// Sends SIGTERM to the process recorded for a job.
///
/// The launch script traps the signal, stops the command and writes the
/// killed exit code, so the monitor records the final status.
pub struct LocalJobKillService {
    persistence: Arc<dyn JobPersistenceService>,
    host_name: String,
}

impl LocalJobKillService {
    pub fn new(persistence: Arc<dyn JobPersistenceService>, host_name: impl Into<String>) -> Self {
        Self {
            persistence,
            host_name: host_name.into(),
        }
    }
}

#[async_trait]
impl JobKillService for LocalJobKillService {
    #[instrument(skip(self))]
    async fn kill_job(&self, job_id: &str) -> GenieResult<()> {
        let job = self.persistence.get_job(job_id).await?.ok_or_else(|| {
            GenieError::Precondition(format!("No job with id {job_id} exists to kill"))
        })?;

        if job.status.is_finished() {
            info!(status = %job.status, "Job already finished, nothing to kill");
            return Ok(());
        }

        let execution = self.persistence.get_job_execution(job_id).await?;
        let pid = match execution {
            Some(exec) if exec.host_name == self.host_name && job.status == JobStatus::Running => {
                exec.process_id
            }
            _ => None,
        }
        .ok_or_else(|| {
            GenieError::Precondition(format!(
                "Job {job_id} is not running on host {}",
                self.host_name
            ))
        })?;

        match send_sigterm(pid) {
            Ok(()) => {
                info!(pid, "Sent SIGTERM to job");
                Ok(())
            }
            Err(Errno::ESRCH) => {
                warn!(pid, "Job process already gone");
                Ok(())
            }
            Err(errno) => Err(GenieError::Server(format!(
                "Unable to signal job {job_id} process {pid}: {errno}"
            ))),
        }
    }
}
