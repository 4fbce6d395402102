use async_trait::async_trait;

use crate::domain::errors::GenieResult;
use crate::domain::models::{Application, Cluster, ClusterCriteria, Command, CommandStatus};

/// Port for cluster lookups.
///
/// The implementation owns the criteria matching rule; callers treat the
/// candidate list as opaque apart from its order.
#[async_trait]
pub trait ClusterService: Send + Sync {
    /// Clusters matching the first criteria set (in priority order) that
    /// matches anything. Empty when no set matches.
    async fn find_clusters_for_criteria(
        &self,
        criterias: &[ClusterCriteria],
    ) -> GenieResult<Vec<Cluster>>;

    /// Commands registered on a cluster, in registration order, restricted
    /// to the given statuses.
    async fn get_commands_for_cluster(
        &self,
        cluster_id: &str,
        statuses: &[CommandStatus],
    ) -> GenieResult<Vec<Command>>;
}

/// Port for command-owned lookups.
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Applications a command depends on, in the order the command lists them.
    async fn get_applications_for_command(&self, command_id: &str)
        -> GenieResult<Vec<Application>>;
}

/// Port for application lookups.
#[async_trait]
pub trait ApplicationService: Send + Sync {
    /// Fetch one application. Missing ids are the implementation's error to define.
    async fn get_application(&self, id: &str) -> GenieResult<Application>;
}

/// Picks one cluster out of several equally eligible candidates.
pub trait ClusterLoadBalancer: Send + Sync {
    fn select_cluster(&self, clusters: &[Cluster]) -> GenieResult<Cluster>;
}
