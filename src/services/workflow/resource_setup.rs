use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::context::ExecutionContext;
use super::script::{file_name, job_dir_path, staged_path, GENIE_DIR};
use super::WorkflowTask;
use crate::domain::errors::GenieResult;
use crate::domain::models::ResourceFiles;
use crate::domain::ports::FileTransferService;

/// Which part of the resolved plan a [`ResourceSetupTask`] stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Application,
    Cluster,
    Command,
}

impl ResourceKind {
    /// Directory under `genie/` holding this kind's resources.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Application => "applications",
            Self::Cluster => "cluster",
            Self::Command => "command",
        }
    }

    fn task_name(&self) -> &'static str {
        match self {
            Self::Application => "application_setup",
            Self::Cluster => "cluster_setup",
            Self::Command => "command_setup",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Cluster => "cluster",
            Self::Command => "command",
        }
    }
}

/// Stages config files, dependencies and the setup file of every resource of
/// one kind into `genie/<kind>/<id>/`, sourcing each setup file.
pub struct ResourceSetupTask {
    kind: ResourceKind,
    file_transfer: Arc<dyn FileTransferService>,
}

impl ResourceSetupTask {
    pub fn new(kind: ResourceKind, file_transfer: Arc<dyn FileTransferService>) -> Self {
        Self {
            kind,
            file_transfer,
        }
    }

    async fn stage(
        &self,
        context: &mut ExecutionContext,
        id: &str,
        files: &ResourceFiles,
    ) -> GenieResult<()> {
        let relative_dir = PathBuf::from(GENIE_DIR).join(self.kind.dir_name()).join(id);
        let resource_dir = context.job_working_dir().join(&relative_dir);

        for config in files.configs.iter().filter(|c| !c.trim().is_empty()) {
            self.fetch(config, &resource_dir.join("config")).await?;
        }
        for dependency in files.dependencies.iter().filter(|d| !d.trim().is_empty()) {
            self.fetch(dependency, &resource_dir.join("dependencies")).await?;
        }

        if let Some(setup_file) = files.setup_file.as_deref().filter(|s| !s.trim().is_empty()) {
            let name = self.fetch(setup_file, &resource_dir).await?;
            context
                .write_line(&format!(
                    "# Sourcing setup file for {} {id}",
                    self.kind.label()
                ))
                .await?;
            context
                .write_line(&format!("source {}", job_dir_path(&relative_dir.join(name))))
                .await?;
            context.blank_line().await?;
        }
        Ok(())
    }

    /// Fetch `reference` into `dir`, returning the local file name.
    async fn fetch<'a>(&self, reference: &'a str, dir: &Path) -> GenieResult<&'a str> {
        let destination = staged_path(dir, reference)?;
        debug!(source = reference, destination = %destination.display(), "Staging file");
        self.file_transfer.get_file(reference, &destination).await?;
        file_name(reference)
    }
}

#[async_trait]
impl WorkflowTask for ResourceSetupTask {
    fn name(&self) -> &'static str {
        self.kind.task_name()
    }

    #[instrument(skip_all, fields(job_id = %context.job_id(), kind = self.kind.label()))]
    async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()> {
        let env = context.environment();
        let resources: Vec<(String, ResourceFiles)> = match self.kind {
            ResourceKind::Application => env
                .applications
                .iter()
                .map(|a| (a.id.clone(), a.files.clone()))
                .collect(),
            ResourceKind::Cluster => vec![(env.cluster.id.clone(), env.cluster.files.clone())],
            ResourceKind::Command => vec![(env.command.id.clone(), env.command.files.clone())],
        };

        for (id, files) in &resources {
            self.stage(context, id, files).await?;
        }
        Ok(())
    }
}
