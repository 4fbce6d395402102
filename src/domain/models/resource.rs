//! Cluster, command and application resources.
//!
//! These are owned by their own lookup services; the coordinator only reads
//! them to build a resolved execution plan.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Files a resource contributes to a job's working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFiles {
    /// Script sourced by the launch script before the job runs
    pub setup_file: Option<String>,
    /// Configuration files staged under the resource's config directory
    #[serde(default)]
    pub configs: Vec<String>,
    /// Dependency files staged under the resource's dependency directory
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Status of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Up,
    OutOfService,
    Terminated,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Terminated => "TERMINATED",
        }
    }
}

/// Status shared by commands and applications. Only `Active` ones are runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Active,
    Deprecated,
    Inactive,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Inactive => "INACTIVE",
        }
    }
}

/// A compute cluster a job can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub tags: BTreeSet<String>,
    pub status: ClusterStatus,
    #[serde(default)]
    pub files: ResourceFiles,
}

impl Cluster {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tags: BTreeSet<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags,
            status: ClusterStatus::Up,
            files: ResourceFiles::default(),
        }
    }

    pub fn with_files(mut self, files: ResourceFiles) -> Self {
        self.files = files;
        self
    }
}

/// A runnable command registered on one or more clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub name: String,
    pub tags: BTreeSet<String>,
    pub status: CommandStatus,
    /// Executable invoked by the launch script
    pub executable: String,
    /// Arguments placed after the executable, in order
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Memory (MB) the command needs when the request does not say
    pub memory: Option<u32>,
    #[serde(default)]
    pub files: ResourceFiles,
}

impl Command {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tags: BTreeSet<String>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags,
            status: CommandStatus::Active,
            executable: executable.into(),
            arguments: Vec::new(),
            memory: None,
            files: ResourceFiles::default(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_memory(mut self, memory: u32) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_status(mut self, status: CommandStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_files(mut self, files: ResourceFiles) -> Self {
        self.files = files;
        self
    }

    /// A command is eligible when its tags contain every requested tag.
    pub fn matches_criteria(&self, criteria: &BTreeSet<String>) -> bool {
        self.tags.is_superset(criteria)
    }
}

/// Supporting software installed for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub status: CommandStatus,
    #[serde(default)]
    pub files: ResourceFiles,
}

impl Application {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: CommandStatus::Active,
            files: ResourceFiles::default(),
        }
    }

    pub fn with_files(mut self, files: ResourceFiles) -> Self {
        self.files = files;
        self
    }
}

/// Build a tag set from string literals.
pub fn tags<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}
