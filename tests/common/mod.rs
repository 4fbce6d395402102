//! Common test utilities for integration tests
//!
//! Provides the fully wired local stack used by the end-to-end tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use genie_core::adapters::local::{
    LocalAttachmentService, LocalFileTransfer, LocalJobKillService, LocalJobStateService,
};
use genie_core::adapters::memory::InMemoryCatalog;
use genie_core::adapters::sqlite::{
    all_embedded_migrations, create_test_pool, Migrator, SqliteJobPersistence,
};
use genie_core::domain::models::JobsConfig;
use genie_core::services::{FirstClusterLoadBalancer, ResourceResolver};
use genie_core::{JobCoordinator, JobPersistenceService, JobStatus, MemoryLedger, WorkflowExecutor};
use tempfile::TempDir;

pub const HOST_NAME: &str = "test-host";

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Coordinator wired to SQLite, the in-memory catalog and local execution.
pub struct LocalStack {
    pub coordinator: JobCoordinator,
    pub catalog: Arc<InMemoryCatalog>,
    pub persistence: Arc<SqliteJobPersistence>,
    pub job_state: Arc<LocalJobStateService>,
    pub jobs_dir: PathBuf,
    pub dir: TempDir,
}

impl LocalStack {
    pub async fn new(configure: impl FnOnce(&mut JobsConfig)) -> Self {
        let dir = temp_dir();
        let mut config = JobsConfig::default();
        config.locations.jobs = dir.path().join("jobs");
        config.locations.attachments = dir.path().join("attachments");
        config.locations.archives = format!("file://{}/archives/", dir.path().display());
        config.monitor.check_interval_ms = 50;
        configure(&mut config);

        let pool = create_test_pool().await.expect("test pool");
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .expect("migrations");
        let persistence = Arc::new(SqliteJobPersistence::new(pool));

        let workflow = WorkflowExecutor::standard(
            Arc::new(LocalFileTransfer::new()),
            Arc::new(LocalAttachmentService::new(
                config.locations.attachments.clone(),
            )),
        );
        let job_state = Arc::new(LocalJobStateService::new(
            MemoryLedger::new(),
            persistence.clone(),
            Arc::new(workflow),
            &config,
        ));
        let kill_service = Arc::new(LocalJobKillService::new(persistence.clone(), HOST_NAME));

        let catalog = Arc::new(InMemoryCatalog::new());
        let resolver = ResourceResolver::new(
            catalog.clone(),
            catalog.clone(),
            catalog.clone(),
            Arc::new(FirstClusterLoadBalancer::new()),
        );
        let coordinator = JobCoordinator::new(
            resolver,
            persistence.clone(),
            job_state.clone(),
            kill_service,
            &config,
            HOST_NAME,
        );

        Self {
            coordinator,
            catalog,
            persistence,
            job_state,
            jobs_dir: config.locations.jobs,
            dir,
        }
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.jobs_dir.join(job_id)
    }

    /// Poll the job record until it reaches a finished status.
    pub async fn wait_until_finished(&self, job_id: &str, timeout: Duration) -> JobStatus {
        let start = Instant::now();
        loop {
            let job = self
                .persistence
                .get_job(job_id)
                .await
                .expect("get_job")
                .expect("job exists");
            if job.status.is_finished() || start.elapsed() > timeout {
                return job.status;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Wait for a path to exist, polling every 50ms.
pub async fn wait_for_path(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
