//! Two-level memory admission control.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{Command, JobRequest, MemoryConfig};
use crate::domain::ports::JobStateService;

/// Gates jobs on a per-job cap and on the host-wide memory budget.
///
/// The per-job check needs no knowledge of load and is final. The host-wide
/// check reads the current usage from the execution state and is transient:
/// the same request can be admitted once other jobs finish.
pub struct AdmissionController {
    memory: MemoryConfig,
    job_state: Arc<dyn JobStateService>,
}

impl AdmissionController {
    pub fn new(memory: MemoryConfig, job_state: Arc<dyn JobStateService>) -> Self {
        Self { memory, job_state }
    }

    /// Request memory, else the command's declared memory, else the default.
    pub fn effective_memory(&self, request: &JobRequest, command: &Command) -> u32 {
        request
            .memory()
            .or(command.memory)
            .unwrap_or(self.memory.default_job_memory)
    }

    /// Reject jobs larger than the per-job cap.
    pub fn check_job_memory(&self, memory: u32) -> GenieResult<()> {
        if memory > self.memory.max_job_memory {
            return Err(GenieError::Precondition(format!(
                "Requested {memory} MB to run job which is more than the {} MB allowed",
                self.memory.max_job_memory
            )));
        }
        Ok(())
    }

    /// Reject jobs that would push the host past its memory budget.
    ///
    /// Reading usage here and registering the job's memory later are two
    /// separate calls, so concurrent admissions can briefly over-commit.
    pub async fn check_system_memory(&self, memory: u32) -> GenieResult<()> {
        let used = self.job_state.used_memory().await?;
        let max = u64::from(self.memory.max_system_memory);

        if used + u64::from(memory) > max {
            warn!(used, requested = memory, max, "Host memory budget exhausted");
            return Err(GenieError::ServiceUnavailable(
                "Unable to run job due to host being too busy during request.".to_string(),
            ));
        }

        debug!(used, requested = memory, max, "Memory admitted");
        Ok(())
    }
}
