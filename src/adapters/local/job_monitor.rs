//! Done-file polling for one launched job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::job_kill::send_sigterm;
use crate::domain::models::JobStatus;
use crate::domain::ports::JobPersistenceService;
use crate::services::memory_ledger::MemoryLedger;
use crate::services::workflow::script::DONE_FILE_NAME;

/// Outcome of one monitored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The done file appeared with this exit code.
    Completed(i32),
    /// The process exited without leaving a usable done file.
    Lost,
}

/// Watches `<workdir>/genie.done` until the job finishes.
///
/// On completion the exit code is persisted and the job's memory reservation
/// released. A process that exits without a done file marks the job FAILED.
/// A job running past its timeout receives SIGTERM, which the kill trap in
/// the launch script turns into a done file.
pub struct JobMonitor {
    job_id: String,
    done_file: PathBuf,
    child: Child,
    persistence: Arc<dyn JobPersistenceService>,
    ledger: MemoryLedger,
    interval: Duration,
    timeout: Option<Duration>,
}

impl JobMonitor {
    pub fn new(
        job_id: impl Into<String>,
        working_dir: &Path,
        child: Child,
        persistence: Arc<dyn JobPersistenceService>,
        ledger: MemoryLedger,
        interval: Duration,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            done_file: working_dir.join(DONE_FILE_NAME),
            child,
            persistence,
            ledger,
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn spawn(self) -> JoinHandle<MonitorOutcome> {
        tokio::spawn(self.run())
    }

    #[instrument(skip_all, fields(job_id = %self.job_id))]
    pub async fn run(mut self) -> MonitorOutcome {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        let mut timeout_signalled = false;

        let outcome = loop {
            ticker.tick().await;

            if let Some(code) = read_exit_code(&self.done_file).await {
                break MonitorOutcome::Completed(code);
            }

            match self.child.try_wait() {
                Ok(Some(status)) => {
                    // The done file may land between the read above and the exit
                    match read_exit_code(&self.done_file).await {
                        Some(code) => break MonitorOutcome::Completed(code),
                        None => {
                            warn!(%status, "Job process exited without a done file");
                            break MonitorOutcome::Lost;
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Unable to poll job process"),
            }

            if let Some(timeout) = self.timeout {
                if !timeout_signalled && started.elapsed() >= timeout {
                    warn!(timeout_secs = timeout.as_secs(), "Job exceeded its timeout");
                    if let Some(pid) = self.child.id() {
                        if let Err(err) = send_sigterm(pid) {
                            warn!(error = %err, "Unable to signal timed out job");
                        }
                    }
                    timeout_signalled = true;
                }
            }
        };

        self.record(outcome).await;
        if let Err(err) = self.child.wait().await {
            warn!(error = %err, "Unable to reap job process");
        }
        self.ledger.release(&self.job_id).await;
        outcome
    }

    async fn record(&self, outcome: MonitorOutcome) {
        let result = match outcome {
            MonitorOutcome::Completed(code) => {
                info!(exit_code = code, "Job finished");
                self.persistence.set_exit_code(&self.job_id, code).await
            }
            MonitorOutcome::Lost => {
                self.persistence
                    .update_job_status(
                        &self.job_id,
                        JobStatus::Failed,
                        "Job process exited without writing a done file.",
                    )
                    .await
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "Unable to record job completion");
        }
    }
}

/// Exit code from a complete done file. A missing, empty or partially
/// written file yields `None`.
async fn read_exit_code(done_file: &Path) -> Option<i32> {
    tokio::fs::read_to_string(done_file)
        .await
        .ok()
        .and_then(|content| content.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator, SqliteJobPersistence};
    use crate::domain::models::{tags, ClusterCriteria, Job, JobExecution, JobMetadata, JobRequest};

    async fn persistence_with_job(job_id: &str) -> Arc<SqliteJobPersistence> {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        let persistence = Arc::new(SqliteJobPersistence::new(pool));
        let request = JobRequest::new(
            "job",
            "user",
            "1",
            vec![ClusterCriteria::new(tags(["a"]))],
            tags(["b"]),
        )
        .unwrap()
        .with_id(job_id);
        persistence
            .create_job(
                &request,
                &JobMetadata::default(),
                &Job::init(job_id, &request, None),
                &JobExecution::skeleton(job_id, "localhost"),
            )
            .await
            .unwrap();
        persistence
    }

    fn shell(script: &str, dir: &Path) -> Child {
        tokio::process::Command::new("sh")
            .arg("-c")
            .arg(script)
            .current_dir(dir)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_done_file_exit_code_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = persistence_with_job("job1").await;
        let ledger = MemoryLedger::new();
        ledger.reserve("job1", 512).await;

        let monitor = JobMonitor::new(
            "job1",
            dir.path(),
            shell("echo 3 > genie.done", dir.path()),
            persistence.clone(),
            ledger.clone(),
            Duration::from_millis(20),
        );
        let outcome = monitor.spawn().await.unwrap();

        assert_eq!(outcome, MonitorOutcome::Completed(3));
        let job = persistence.get_job("job1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(ledger.used().await, 0);
    }

    #[tokio::test]
    async fn test_exit_without_done_file_marks_failed() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = persistence_with_job("job1").await;
        let ledger = MemoryLedger::new();
        ledger.reserve("job1", 512).await;

        let outcome = JobMonitor::new(
            "job1",
            dir.path(),
            shell("exit 0", dir.path()),
            persistence.clone(),
            ledger.clone(),
            Duration::from_millis(20),
        )
        .run()
        .await;

        assert_eq!(outcome, MonitorOutcome::Lost);
        let job = persistence.get_job("job1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(ledger.used().await, 0);
    }

    #[tokio::test]
    async fn test_read_exit_code_ignores_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let done = dir.path().join(DONE_FILE_NAME);

        assert_eq!(read_exit_code(&done).await, None);
        std::fs::write(&done, "").unwrap();
        assert_eq!(read_exit_code(&done).await, None);
        std::fs::write(&done, "0\n").unwrap();
        assert_eq!(read_exit_code(&done).await, Some(0));
    }
}
