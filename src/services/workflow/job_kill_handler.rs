use async_trait::async_trait;
use tracing::instrument;

use super::context::ExecutionContext;
use super::script::{job_dir_var, DONE_FILE_NAME};
use super::WorkflowTask;
use crate::domain::errors::GenieResult;
use crate::domain::models::KILLED_EXIT_CODE;

/// Installs a SIGTERM trap so a killed job still writes its done file.
///
/// The trap kills the background job processes, then records
/// [`KILLED_EXIT_CODE`]. Bash runs the trap once the current foreground
/// command returns, so the launch line backgrounds the job and waits on its
/// pid to let the trap run promptly while the job is running.
pub struct JobKillHandlerTask;

#[async_trait]
impl WorkflowTask for JobKillHandlerTask {
    fn name(&self) -> &'static str {
        "job_kill_handler"
    }

    #[instrument(skip_all, fields(job_id = %context.job_id()))]
    async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()> {
        let lines = [
            "# Kill the job processes and record the kill on SIGTERM".to_string(),
            "function handle_kill_request {".to_string(),
            "    echo \"Kill signal received\"".to_string(),
            "    kill $(jobs -p) 2>/dev/null || true".to_string(),
            format!(
                "    echo {KILLED_EXIT_CODE} > {}/{DONE_FILE_NAME}",
                job_dir_var()
            ),
            "    exit 143".to_string(),
            "}".to_string(),
            String::new(),
            "trap handle_kill_request SIGTERM".to_string(),
            String::new(),
        ];
        for line in &lines {
            context.write_line(line).await?;
        }
        Ok(())
    }
}
