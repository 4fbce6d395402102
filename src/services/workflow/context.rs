//! Strongly typed state shared by the workflow tasks of one job.

use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::script::SCRIPT_FILE_NAME;
use crate::domain::errors::GenieResult;
use crate::domain::models::{Application, Cluster, Command, JobRequest};

/// The resolved plan a job is materialized from. Read-only for every task.
#[derive(Debug, Clone)]
pub struct JobExecutionEnvironment {
    pub job_id: String,
    pub job_request: JobRequest,
    pub cluster: Cluster,
    pub command: Command,
    pub applications: Vec<Application>,
    pub memory: u32,
    pub job_working_dir: PathBuf,
}

/// Execution environment plus the open launch-script writer.
///
/// Tasks append lines through [`write_line`](Self::write_line); nothing
/// reaches disk durably until [`finish`](Self::finish) flushes the script
/// and marks it executable.
pub struct ExecutionContext {
    environment: JobExecutionEnvironment,
    script_path: PathBuf,
    writer: BufWriter<File>,
}

impl ExecutionContext {
    /// Create the working directory and open `<workdir>/run` for writing.
    pub async fn create(environment: JobExecutionEnvironment) -> GenieResult<Self> {
        fs::create_dir_all(&environment.job_working_dir).await?;
        let script_path = environment.job_working_dir.join(SCRIPT_FILE_NAME);
        let file = File::create(&script_path).await?;

        Ok(Self {
            environment,
            script_path,
            writer: BufWriter::new(file),
        })
    }

    pub fn environment(&self) -> &JobExecutionEnvironment {
        &self.environment
    }

    pub fn job_id(&self) -> &str {
        &self.environment.job_id
    }

    pub fn job_working_dir(&self) -> &Path {
        &self.environment.job_working_dir
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Append one line to the launch script.
    pub async fn write_line(&mut self, line: &str) -> GenieResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    pub async fn blank_line(&mut self) -> GenieResult<()> {
        self.write_line("").await
    }

    /// Flush the script, make it executable and return its path.
    pub async fn finish(mut self) -> GenieResult<PathBuf> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        set_executable(&self.script_path).await?;
        Ok(self.script_path)
    }
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> GenieResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> GenieResult<()> {
    Ok(())
}
