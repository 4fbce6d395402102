//! In-memory cluster, command and application catalog.
//!
//! Backs the three resource lookup ports with one registry, so a host can
//! run jobs without an external configuration service. Registration order
//! is significant: it is the order candidates are offered to the resolver.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{
    Application, Cluster, ClusterCriteria, ClusterStatus, Command, CommandStatus,
};
use crate::domain::ports::{ApplicationService, ClusterService, CommandService};

#[derive(Default)]
struct Inner {
    clusters: Vec<Cluster>,
    commands: HashMap<String, Command>,
    applications: HashMap<String, Application>,
    cluster_commands: HashMap<String, Vec<String>>,
    command_applications: HashMap<String, Vec<String>>,
}

impl Inner {
    fn command(&self, id: &str) -> GenieResult<&Command> {
        self.commands
            .get(id)
            .ok_or_else(|| GenieError::NotFound(format!("No command with id {id} exists")))
    }

    fn application(&self, id: &str) -> GenieResult<&Application> {
        self.applications
            .get(id)
            .ok_or_else(|| GenieError::NotFound(format!("No application with id {id} exists")))
    }

    fn ensure_cluster(&self, id: &str) -> GenieResult<()> {
        if self.clusters.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(GenieError::NotFound(format!("No cluster with id {id} exists")))
        }
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    inner: RwLock<Inner>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a cluster. A replaced cluster keeps its position.
    pub async fn register_cluster(&self, cluster: Cluster) {
        let mut inner = self.inner.write().await;
        match inner.clusters.iter_mut().find(|c| c.id == cluster.id) {
            Some(existing) => *existing = cluster,
            None => inner.clusters.push(cluster),
        }
    }

    pub async fn register_command(&self, command: Command) {
        self.inner
            .write()
            .await
            .commands
            .insert(command.id.clone(), command);
    }

    pub async fn register_application(&self, application: Application) {
        self.inner
            .write()
            .await
            .applications
            .insert(application.id.clone(), application);
    }

    /// Append a command to the cluster's ordered command list.
    pub async fn add_command_to_cluster(&self, cluster_id: &str, command_id: &str) -> GenieResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_cluster(cluster_id)?;
        inner.command(command_id)?;

        let commands = inner.cluster_commands.entry(cluster_id.to_string()).or_default();
        if !commands.iter().any(|c| c == command_id) {
            commands.push(command_id.to_string());
        }
        Ok(())
    }

    /// Append an application to the command's ordered application list.
    pub async fn add_application_to_command(
        &self,
        command_id: &str,
        application_id: &str,
    ) -> GenieResult<()> {
        let mut inner = self.inner.write().await;
        inner.command(command_id)?;
        inner.application(application_id)?;

        let applications = inner
            .command_applications
            .entry(command_id.to_string())
            .or_default();
        if !applications.iter().any(|a| a == application_id) {
            applications.push(application_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterService for InMemoryCatalog {
    /// Criteria sets are tried in order; the UP clusters carrying every tag
    /// of the first set that matches anything are returned.
    async fn find_clusters_for_criteria(
        &self,
        criterias: &[ClusterCriteria],
    ) -> GenieResult<Vec<Cluster>> {
        let inner = self.inner.read().await;
        for (priority, criteria) in criterias.iter().enumerate() {
            let matches: Vec<Cluster> = inner
                .clusters
                .iter()
                .filter(|c| c.status == ClusterStatus::Up && c.tags.is_superset(&criteria.tags))
                .cloned()
                .collect();
            if !matches.is_empty() {
                debug!(priority, candidates = matches.len(), "Cluster criteria matched");
                return Ok(matches);
            }
        }
        Ok(Vec::new())
    }

    async fn get_commands_for_cluster(
        &self,
        cluster_id: &str,
        statuses: &[CommandStatus],
    ) -> GenieResult<Vec<Command>> {
        let inner = self.inner.read().await;
        inner.ensure_cluster(cluster_id)?;

        let ids = inner.cluster_commands.get(cluster_id).cloned().unwrap_or_default();
        let mut commands = Vec::with_capacity(ids.len());
        for id in &ids {
            let command = inner.command(id)?;
            if statuses.is_empty() || statuses.contains(&command.status) {
                commands.push(command.clone());
            }
        }
        Ok(commands)
    }
}

#[async_trait]
impl CommandService for InMemoryCatalog {
    async fn get_applications_for_command(&self, command_id: &str) -> GenieResult<Vec<Application>> {
        let inner = self.inner.read().await;
        inner.command(command_id)?;

        inner
            .command_applications
            .get(command_id)
            .map(|ids| ids.iter().map(|id| inner.application(id).cloned()).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl ApplicationService for InMemoryCatalog {
    async fn get_application(&self, id: &str) -> GenieResult<Application> {
        self.inner.read().await.application(id).cloned()
    }
}
