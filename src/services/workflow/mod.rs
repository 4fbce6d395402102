//! Workflow task pipeline.
//!
//! Turns a resolved plan into a runnable launch script on local disk. An
//! ordered list of [`WorkflowTask`]s appends to one [`ExecutionContext`]:
//!
//! | Order | Task                    | Side effects                                |
//! |-------|-------------------------|---------------------------------------------|
//! | 1     | `InitialSetupTask`      | directory layout, script header, exports    |
//! | 2     | `JobKillHandlerTask`    | SIGTERM trap writing the killed exit code   |
//! | 3-5   | `ResourceSetupTask`     | stage application, cluster, command files   |
//! | 6     | `JobTask`               | stage job files, attachments, launch lines  |
//!
//! The pipeline stops at the first failing task.

pub mod context;
pub mod initial_setup;
pub mod job_kill_handler;
pub mod job_task;
pub mod resource_setup;
pub mod script;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::ports::{AttachmentService, FileTransferService};

pub use context::{ExecutionContext, JobExecutionEnvironment};
pub use initial_setup::InitialSetupTask;
pub use job_kill_handler::JobKillHandlerTask;
pub use job_task::JobTask;
pub use resource_setup::{ResourceKind, ResourceSetupTask};

/// One step of the pipeline.
#[async_trait]
pub trait WorkflowTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()>;
}

/// Records how long a task ran, on every exit path.
struct TaskTimer {
    task: &'static str,
    job_id: String,
    start: Instant,
}

impl TaskTimer {
    fn start(task: &'static str, job_id: &str) -> Self {
        Self {
            task,
            job_id: job_id.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TaskTimer {
    fn drop(&mut self) {
        debug!(
            task = self.task,
            job_id = %self.job_id,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "Workflow task timer"
        );
    }
}

/// Runs tasks in registration order against one context.
#[derive(Default)]
pub struct WorkflowExecutor {
    tasks: Vec<Box<dyn WorkflowTask>>,
}

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full job pipeline.
    pub fn standard(
        file_transfer: Arc<dyn FileTransferService>,
        attachments: Arc<dyn AttachmentService>,
    ) -> Self {
        let mut executor = Self::new();
        executor.add(Box::new(InitialSetupTask));
        executor.add(Box::new(JobKillHandlerTask));
        for kind in [
            ResourceKind::Application,
            ResourceKind::Cluster,
            ResourceKind::Command,
        ] {
            executor.add(Box::new(ResourceSetupTask::new(kind, file_transfer.clone())));
        }
        executor.add(Box::new(JobTask::new(file_transfer, attachments)));
        executor
    }

    pub fn add(&mut self, task: Box<dyn WorkflowTask>) {
        self.tasks.push(task);
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Run every task, then flush the script. Returns the script path.
    ///
    /// The first failing task halts the pipeline; its error surfaces as a
    /// server error naming the task.
    #[instrument(skip_all, fields(job_id = %context.job_id()))]
    pub async fn run(&self, mut context: ExecutionContext) -> GenieResult<PathBuf> {
        for task in &self.tasks {
            let _timer = TaskTimer::start(task.name(), context.job_id());
            if let Err(err) = task.execute(&mut context).await {
                error!(task = task.name(), error = %err, "Workflow task failed");
                return Err(GenieError::Server(format!(
                    "Workflow task {} failed: {}",
                    task.name(),
                    err.message()
                )));
            }
        }

        let script = context.finish().await?;
        info!(script = %script.display(), "Launch script ready");
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{RecordingAttachments, RecordingFileTransfer};
    use std::sync::Mutex;

    struct RecordingTask {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl WorkflowTask for RecordingTask {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(GenieError::NotFound("missing file".to_string()));
            }
            context.write_line(&format!("# {}", self.name)).await
        }
    }

    fn executor(log: &Arc<Mutex<Vec<&'static str>>>, failing: Option<&'static str>) -> WorkflowExecutor {
        let mut executor = WorkflowExecutor::new();
        for name in ["first", "second", "third"] {
            executor.add(Box::new(RecordingTask {
                name,
                log: log.clone(),
                fail: failing == Some(name),
            }));
        }
        executor
    }

    #[tokio::test]
    async fn test_runs_tasks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = ExecutionContext::create(context::test_env::environment(dir.path()))
            .await
            .unwrap();

        let script = executor(&log, None).run(context).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
        let content = std::fs::read_to_string(script).unwrap();
        assert_eq!(content, "# first\n# second\n# third\n");
    }

    #[tokio::test]
    async fn test_halts_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = ExecutionContext::create(context::test_env::environment(dir.path()))
            .await
            .unwrap();

        let err = executor(&log, Some("second")).run(context).await.unwrap_err();

        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
        assert!(matches!(err, GenieError::Server(ref m) if m.contains("second") && m.contains("missing file")));
    }

    #[test]
    fn test_standard_pipeline_order() {
        let executor = WorkflowExecutor::standard(
            Arc::new(RecordingFileTransfer::default()),
            Arc::new(RecordingAttachments::default()),
        );

        assert_eq!(
            executor.task_names(),
            [
                "initial_setup",
                "job_kill_handler",
                "application_setup",
                "cluster_setup",
                "command_setup",
                "job",
            ]
        );
    }
}
