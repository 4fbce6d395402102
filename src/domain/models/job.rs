//! Job request and job record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::errors::{GenieError, GenieResult};

/// Exit code written to the done file when a job is killed.
pub const KILLED_EXIT_CODE: i32 = 999;

/// One set of cluster tags. A cluster matches when it carries every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCriteria {
    pub tags: BTreeSet<String>,
}

impl ClusterCriteria {
    pub fn new(tags: BTreeSet<String>) -> Self {
        Self { tags }
    }
}

/// An immutable description of the job a user wants to run.
///
/// Built through [`JobRequest::new`], which validates the mandatory fields.
/// The id is usually absent at submission time and is attached by the
/// front end or the persistence layer before coordination starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    id: Option<String>,
    name: String,
    user: String,
    version: String,
    description: Option<String>,
    group: Option<String>,
    email: Option<String>,
    /// Evaluated in order; the first set that matches any cluster wins
    cluster_criterias: Vec<ClusterCriteria>,
    command_criteria: BTreeSet<String>,
    command_args: Vec<String>,
    applications: Vec<String>,
    memory: Option<u32>,
    setup_file: Option<String>,
    dependencies: Vec<String>,
    tags: BTreeSet<String>,
    disable_log_archival: bool,
    timeout_secs: Option<u64>,
}

impl JobRequest {
    /// Create a request, rejecting blank identity fields and empty criteria.
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        version: impl Into<String>,
        cluster_criterias: Vec<ClusterCriteria>,
        command_criteria: BTreeSet<String>,
    ) -> GenieResult<Self> {
        let name = name.into();
        let user = user.into();
        let version = version.into();

        for (field, value) in [("name", &name), ("user", &user), ("version", &version)] {
            if value.trim().is_empty() {
                return Err(GenieError::Precondition(format!(
                    "Job request {field} cannot be blank"
                )));
            }
        }
        if cluster_criterias.is_empty() {
            return Err(GenieError::Precondition(
                "At least one cluster criteria is required".to_string(),
            ));
        }
        if command_criteria.is_empty() {
            return Err(GenieError::Precondition(
                "Command criteria cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: None,
            name,
            user,
            version,
            description: None,
            group: None,
            email: None,
            cluster_criterias,
            command_criteria,
            command_args: Vec::new(),
            applications: Vec::new(),
            memory: None,
            setup_file: None,
            dependencies: Vec::new(),
            tags: BTreeSet::new(),
            disable_log_archival: false,
            timeout_secs: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_generated_id(self) -> Self {
        self.with_id(Uuid::new_v4().to_string())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_command_args(mut self, args: Vec<String>) -> Self {
        self.command_args = args;
        self
    }

    pub fn with_applications(mut self, applications: Vec<String>) -> Self {
        self.applications = applications;
        self
    }

    pub fn with_memory(mut self, memory: u32) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_setup_file(mut self, setup_file: impl Into<String>) -> Self {
        self.setup_file = Some(setup_file.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_disable_log_archival(mut self, disable: bool) -> Self {
        self.disable_log_archival = disable;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn cluster_criterias(&self) -> &[ClusterCriteria] {
        &self.cluster_criterias
    }

    pub fn command_criteria(&self) -> &BTreeSet<String> {
        &self.command_criteria
    }

    pub fn command_args(&self) -> &[String] {
        &self.command_args
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    pub fn memory(&self) -> Option<u32> {
        self.memory
    }

    pub fn setup_file(&self) -> Option<&str> {
        self.setup_file.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn disable_log_archival(&self) -> bool {
        self.disable_log_archival
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }
}

/// Request-time telemetry. Opaque to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub client_host: Option<String>,
    pub user_agent: Option<String>,
    pub num_attachments: Option<u32>,
    pub total_size_of_attachments: Option<u64>,
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Init,
    Running,
    Succeeded,
    Killed,
    Failed,
    Invalid,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Killed => "KILLED",
            Self::Failed => "FAILED",
            Self::Invalid => "INVALID",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INIT" => Some(Self::Init),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "KILLED" => Some(Self::Killed),
            "FAILED" => Some(Self::Failed),
            "INVALID" => Some(Self::Invalid),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Killed | Self::Failed | Self::Invalid
        )
    }

    /// Final status implied by the exit code in a done file.
    pub fn from_exit_code(exit_code: i32) -> Self {
        match exit_code {
            0 => Self::Succeeded,
            KILLED_EXIT_CODE => Self::Killed,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub status: JobStatus,
    pub status_msg: Option<String>,
    pub cluster_id: Option<String>,
    pub command_id: Option<String>,
    pub application_ids: Vec<String>,
    pub memory: Option<u32>,
    pub tags: BTreeSet<String>,
    pub archive_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh `Init` job for the given (already identified) request.
    pub fn init(
        id: impl Into<String>,
        request: &JobRequest,
        archive_location: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: request.name().to_string(),
            user: request.user().to_string(),
            version: request.version().to_string(),
            status: JobStatus::Init,
            status_msg: Some("Job Accepted and in initialization phase.".to_string()),
            cluster_id: None,
            command_id: None,
            application_ids: Vec::new(),
            memory: None,
            tags: request.tags().clone(),
            archive_location,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Host-level bookkeeping for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: String,
    pub host_name: String,
    pub process_id: Option<u32>,
    pub exit_code: Option<i32>,
    pub memory: Option<u32>,
}

impl JobExecution {
    /// Skeleton record written before the job has a process.
    pub fn skeleton(id: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host_name: host_name.into(),
            process_id: None,
            exit_code: None,
            memory: None,
        }
    }
}
