//! Hand-written collaborator mocks shared by the service unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{
    tags, Application, Cluster, ClusterCriteria, Command, CommandStatus, Job, JobExecution,
    JobMetadata, JobRequest, JobStatus,
};
use crate::domain::ports::{
    ApplicationService, AttachmentService, ClusterLoadBalancer, ClusterService, CommandService,
    FileTransferService, JobKillService, JobPersistenceService, JobStateService,
};

pub const JOB_ID: &str = "job1";

pub fn job_request(command_criteria: &[&str]) -> JobRequest {
    JobRequest::new(
        "relativity",
        "einstein",
        "1.0",
        vec![ClusterCriteria::new(tags(["sched:adhoc"]))],
        tags(command_criteria.iter().copied()),
    )
    .unwrap()
    .with_id(JOB_ID)
    .with_setup_file("setupFilePath")
    .with_tags(tags(["foo", "bar"]))
}

pub fn job_metadata() -> JobMetadata {
    JobMetadata {
        client_host: Some("localhost".to_string()),
        user_agent: Some("genie-test".to_string()),
        num_attachments: Some(2),
        total_size_of_attachments: Some(28_080),
    }
}

#[derive(Default)]
pub struct MockClusterService {
    pub clusters: Vec<Cluster>,
    pub commands: HashMap<String, Vec<Command>>,
    pub find_calls: AtomicUsize,
    pub requested_statuses: Mutex<Vec<Vec<CommandStatus>>>,
}

impl MockClusterService {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self {
            clusters,
            ..Default::default()
        }
    }

    pub fn with_commands(mut self, cluster_id: &str, commands: Vec<Command>) -> Self {
        self.commands.insert(cluster_id.to_string(), commands);
        self
    }
}

#[async_trait]
impl ClusterService for MockClusterService {
    async fn find_clusters_for_criteria(
        &self,
        _criterias: &[ClusterCriteria],
    ) -> GenieResult<Vec<Cluster>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.clusters.clone())
    }

    async fn get_commands_for_cluster(
        &self,
        cluster_id: &str,
        statuses: &[CommandStatus],
    ) -> GenieResult<Vec<Command>> {
        self.requested_statuses.lock().unwrap().push(statuses.to_vec());
        Ok(self
            .commands
            .get(cluster_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| statuses.contains(&c.status))
            .collect())
    }
}

#[derive(Default)]
pub struct MockCommandService {
    pub applications: HashMap<String, Vec<Application>>,
    pub calls: AtomicUsize,
}

impl MockCommandService {
    pub fn with_applications(mut self, command_id: &str, apps: Vec<Application>) -> Self {
        self.applications.insert(command_id.to_string(), apps);
        self
    }
}

#[async_trait]
impl CommandService for MockCommandService {
    async fn get_applications_for_command(
        &self,
        command_id: &str,
    ) -> GenieResult<Vec<Application>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.applications.get(command_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockApplicationService {
    pub applications: HashMap<String, Application>,
    pub requested: Mutex<Vec<String>>,
}

impl MockApplicationService {
    pub fn with_application(mut self, app: Application) -> Self {
        self.applications.insert(app.id.clone(), app);
        self
    }
}

#[async_trait]
impl ApplicationService for MockApplicationService {
    async fn get_application(&self, id: &str) -> GenieResult<Application> {
        self.requested.lock().unwrap().push(id.to_string());
        self.applications
            .get(id)
            .cloned()
            .ok_or_else(|| GenieError::NotFound(format!("No application with id {id}")))
    }
}

/// Picks the last candidate so tests can tell it was consulted.
#[derive(Default)]
pub struct RecordingLoadBalancer {
    pub calls: AtomicUsize,
}

impl ClusterLoadBalancer for RecordingLoadBalancer {
    fn select_cluster(&self, clusters: &[Cluster]) -> GenieResult<Cluster> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        clusters
            .last()
            .cloned()
            .ok_or_else(|| GenieError::Precondition("empty".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeUpdate {
    pub job_id: String,
    pub cluster_id: String,
    pub command_id: String,
    pub application_ids: Vec<String>,
    pub memory: u32,
}

#[derive(Default)]
pub struct MockPersistence {
    pub created: Mutex<Vec<(JobRequest, JobMetadata, Job, JobExecution)>>,
    pub runtime_updates: Mutex<Vec<RuntimeUpdate>>,
    pub status_updates: Mutex<Vec<(String, JobStatus, String)>>,
    pub fail_status_updates: bool,
    pub fail_runtime_updates: bool,
}

impl MockPersistence {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn status_updates(&self) -> Vec<(String, JobStatus, String)> {
        self.status_updates.lock().unwrap().clone()
    }

    pub fn runtime_updates(&self) -> Vec<RuntimeUpdate> {
        self.runtime_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobPersistenceService for MockPersistence {
    async fn create_job(
        &self,
        request: &JobRequest,
        metadata: &JobMetadata,
        job: &Job,
        execution: &JobExecution,
    ) -> GenieResult<()> {
        self.created.lock().unwrap().push((
            request.clone(),
            metadata.clone(),
            job.clone(),
            execution.clone(),
        ));
        Ok(())
    }

    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory: u32,
    ) -> GenieResult<()> {
        if self.fail_runtime_updates {
            return Err(GenieError::Server("runtime update failed".to_string()));
        }
        self.runtime_updates.lock().unwrap().push(RuntimeUpdate {
            job_id: job_id.to_string(),
            cluster_id: cluster_id.to_string(),
            command_id: command_id.to_string(),
            application_ids: application_ids.to_vec(),
            memory,
        });
        Ok(())
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        status_msg: &str,
    ) -> GenieResult<()> {
        self.status_updates
            .lock()
            .unwrap()
            .push((job_id.to_string(), status, status_msg.to_string()));
        if self.fail_status_updates {
            return Err(GenieError::Server("status update failed".to_string()));
        }
        Ok(())
    }

    async fn set_job_running(&self, _job_id: &str, _process_id: u32) -> GenieResult<()> {
        Ok(())
    }

    async fn set_exit_code(&self, _job_id: &str, _exit_code: i32) -> GenieResult<()> {
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> GenieResult<Option<Job>> {
        Ok(self
            .created
            .lock()
            .unwrap()
            .iter()
            .find(|(_, _, job, _)| job.id == job_id)
            .map(|(_, _, job, _)| job.clone()))
    }

    async fn get_job_execution(&self, job_id: &str) -> GenieResult<Option<JobExecution>> {
        Ok(self
            .created
            .lock()
            .unwrap()
            .iter()
            .find(|(_, _, _, exec)| exec.id == job_id)
            .map(|(_, _, _, exec)| exec.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCall {
    pub job_id: String,
    pub cluster: Cluster,
    pub command: Command,
    pub applications: Vec<Application>,
    pub memory: u32,
}

pub enum ScheduleBehavior {
    Succeed,
    Fail(GenieError),
    Panic,
}

pub struct MockJobState {
    pub used: u64,
    pub used_memory_calls: AtomicUsize,
    pub schedules: Mutex<Vec<ScheduleCall>>,
    pub behavior: ScheduleBehavior,
}

impl MockJobState {
    pub fn with_used(used: u64) -> Self {
        Self {
            used,
            used_memory_calls: AtomicUsize::new(0),
            schedules: Mutex::new(Vec::new()),
            behavior: ScheduleBehavior::Succeed,
        }
    }

    pub fn failing(used: u64, behavior: ScheduleBehavior) -> Self {
        Self {
            behavior,
            ..Self::with_used(used)
        }
    }

    pub fn used_memory_calls(&self) -> usize {
        self.used_memory_calls.load(Ordering::SeqCst)
    }

    pub fn schedules(&self) -> Vec<ScheduleCall> {
        self.schedules.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStateService for MockJobState {
    async fn used_memory(&self) -> GenieResult<u64> {
        self.used_memory_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.used)
    }

    async fn schedule(
        &self,
        job_id: &str,
        _request: &JobRequest,
        cluster: &Cluster,
        command: &Command,
        applications: &[Application],
        memory: u32,
    ) -> GenieResult<()> {
        self.schedules.lock().unwrap().push(ScheduleCall {
            job_id: job_id.to_string(),
            cluster: cluster.clone(),
            command: command.clone(),
            applications: applications.to_vec(),
            memory,
        });
        match &self.behavior {
            ScheduleBehavior::Succeed => Ok(()),
            ScheduleBehavior::Fail(err) => Err(err.clone()),
            ScheduleBehavior::Panic => panic!("launcher blew up"),
        }
    }
}

#[derive(Default)]
pub struct MockKillService {
    pub error: Option<GenieError>,
    pub killed: Mutex<Vec<String>>,
}

#[async_trait]
impl JobKillService for MockKillService {
    async fn kill_job(&self, job_id: &str) -> GenieResult<()> {
        self.killed.lock().unwrap().push(job_id.to_string());
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Writes `staged from <source>` at the destination and records the call.
#[derive(Default)]
pub struct RecordingFileTransfer {
    pub fetched: Mutex<Vec<(String, PathBuf)>>,
    pub fail_on: Option<String>,
}

impl RecordingFileTransfer {
    pub fn failing_on(source: &str) -> Self {
        Self {
            fail_on: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn sources(&self) -> Vec<String> {
        self.fetched.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }
}

#[async_trait]
impl FileTransferService for RecordingFileTransfer {
    async fn get_file(&self, source: &str, destination: &Path) -> GenieResult<()> {
        if self.fail_on.as_deref() == Some(source) {
            return Err(GenieError::NotFound(format!("No file at {source}")));
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, format!("staged from {source}")).await?;
        self.fetched
            .lock()
            .unwrap()
            .push((source.to_string(), destination.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAttachments {
    pub copied: Mutex<Vec<(String, PathBuf)>>,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl AttachmentService for RecordingAttachments {
    async fn save(&self, _job_id: &str, _filename: &str, _content: &[u8]) -> GenieResult<()> {
        Ok(())
    }

    async fn copy(&self, job_id: &str, destination: &Path) -> GenieResult<()> {
        self.copied
            .lock()
            .unwrap()
            .push((job_id.to_string(), destination.to_path_buf()));
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> GenieResult<()> {
        self.deleted.lock().unwrap().push(job_id.to_string());
        Ok(())
    }
}
