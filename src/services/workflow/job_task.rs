use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::context::ExecutionContext;
use super::script::{
    file_name, job_dir_path, job_dir_var, staged_path, timestamp_line, DONE_FILE_NAME,
    ENV_LOG_FILE_NAME, STDERR_LOG_FILE_NAME, STDOUT_LOG_FILE_NAME,
};
use super::WorkflowTask;
use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::ports::{AttachmentService, FileTransferService};

/// Stages the job's own files and emits the lines that launch the command.
///
/// Any failure, I/O included, is reported as [`GenieError::Server`].
pub struct JobTask {
    file_transfer: Arc<dyn FileTransferService>,
    attachments: Arc<dyn AttachmentService>,
}

impl JobTask {
    pub fn new(
        file_transfer: Arc<dyn FileTransferService>,
        attachments: Arc<dyn AttachmentService>,
    ) -> Self {
        Self {
            file_transfer,
            attachments,
        }
    }

    async fn run(&self, context: &mut ExecutionContext) -> GenieResult<()> {
        let env = context.environment().clone();
        let working_dir = env.job_working_dir.as_path();

        if let Some(setup_file) = env
            .job_request
            .setup_file()
            .filter(|s| !s.trim().is_empty())
        {
            let name = self.stage(setup_file, working_dir).await?;
            context
                .write_line("# Sourcing setup file specified in job request")
                .await?;
            context
                .write_line(&format!("source {}", job_dir_path(Path::new(name))))
                .await?;
            context.blank_line().await?;
        }

        for dependency in env
            .job_request
            .dependencies()
            .iter()
            .filter(|d| !d.trim().is_empty())
        {
            self.stage(dependency, working_dir).await?;
        }

        // Attachments are single use
        self.attachments.copy(&env.job_id, working_dir).await?;
        self.attachments.delete(&env.job_id).await?;

        let job_dir = job_dir_var();
        context
            .write_line("# Dump the environment to a env.log file")
            .await?;
        context
            .write_line(&format!("env | sort > {job_dir}/{ENV_LOG_FILE_NAME}"))
            .await?;
        context.blank_line().await?;

        let command_line = std::iter::once(env.command.executable.as_str())
            .chain(env.command.arguments.iter().map(String::as_str))
            .chain(env.job_request.command_args().iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        context
            .write_line("# Kick off the command in background mode and wait for it using its pid")
            .await?;
        context
            .write_line(&format!(
                "{command_line} > {job_dir}/{STDOUT_LOG_FILE_NAME} 2> {job_dir}/{STDERR_LOG_FILE_NAME} &"
            ))
            .await?;
        context.write_line("wait $!").await?;
        context.blank_line().await?;

        context
            .write_line("# Write the return code from the command in the done file.")
            .await?;
        context
            .write_line(&format!("echo $? > {job_dir}/{DONE_FILE_NAME}"))
            .await?;
        context.write_line(&timestamp_line("End")).await?;
        Ok(())
    }

    /// Fetch `reference` into the working directory, returning the local name.
    async fn stage<'a>(&self, reference: &'a str, working_dir: &Path) -> GenieResult<&'a str> {
        let destination = staged_path(working_dir, reference)?;
        self.file_transfer.get_file(reference, &destination).await?;
        file_name(reference)
    }
}

#[async_trait]
impl WorkflowTask for JobTask {
    fn name(&self) -> &'static str {
        "job"
    }

    #[instrument(skip_all, fields(job_id = %context.job_id()))]
    async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()> {
        info!("Starting job task");
        self.run(context).await.map_err(|err| match err {
            GenieError::Server(_) => err,
            other => GenieError::Server(other.message().to_string()),
        })?;
        info!("Finished job task");
        Ok(())
    }
}
