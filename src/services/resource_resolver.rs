//! Resolves a job request to a cluster, a command and its applications.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{Application, Cluster, Command, CommandStatus, JobRequest};
use crate::domain::ports::{
    ApplicationService, ClusterLoadBalancer, ClusterService, CommandService,
};

/// The matched (cluster, command, applications) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResources {
    pub cluster: Cluster,
    pub command: Command,
    pub applications: Vec<Application>,
}

impl ResolvedResources {
    pub fn application_ids(&self) -> Vec<String> {
        self.applications.iter().map(|a| a.id.clone()).collect()
    }
}

/// Read-only matching of a request against the resource services.
///
/// Selection is "first match wins" at every level: the cluster service's
/// criteria priority, then the order commands are registered on the cluster.
pub struct ResourceResolver {
    cluster_service: Arc<dyn ClusterService>,
    command_service: Arc<dyn CommandService>,
    application_service: Arc<dyn ApplicationService>,
    load_balancer: Arc<dyn ClusterLoadBalancer>,
}

impl ResourceResolver {
    pub fn new(
        cluster_service: Arc<dyn ClusterService>,
        command_service: Arc<dyn CommandService>,
        application_service: Arc<dyn ApplicationService>,
        load_balancer: Arc<dyn ClusterLoadBalancer>,
    ) -> Self {
        Self {
            cluster_service,
            command_service,
            application_service,
            load_balancer,
        }
    }

    #[instrument(skip_all, fields(job_id = request.id().unwrap_or_default()))]
    pub async fn resolve(&self, request: &JobRequest) -> GenieResult<ResolvedResources> {
        let cluster = self.select_cluster(request).await?;
        let command = self.select_command(request, &cluster).await?;
        let applications = self.resolve_applications(request, &command).await?;

        debug!(
            cluster_id = %cluster.id,
            command_id = %command.id,
            applications = applications.len(),
            "Resolved job resources"
        );

        Ok(ResolvedResources {
            cluster,
            command,
            applications,
        })
    }

    async fn select_cluster(&self, request: &JobRequest) -> GenieResult<Cluster> {
        let mut candidates = self
            .cluster_service
            .find_clusters_for_criteria(request.cluster_criterias())
            .await?;

        match candidates.len() {
            0 => Err(GenieError::Precondition(
                "No cluster found matching all the criteria".to_string(),
            )),
            1 => Ok(candidates.remove(0)),
            _ => self.load_balancer.select_cluster(&candidates),
        }
    }

    async fn select_command(&self, request: &JobRequest, cluster: &Cluster) -> GenieResult<Command> {
        let commands = self
            .cluster_service
            .get_commands_for_cluster(&cluster.id, &[CommandStatus::Active])
            .await?;

        commands
            .into_iter()
            .find(|command| command.matches_criteria(request.command_criteria()))
            .ok_or_else(|| {
                GenieError::Precondition(format!(
                    "No command found matching all command criteria on cluster {}",
                    cluster.id
                ))
            })
    }

    async fn resolve_applications(
        &self,
        request: &JobRequest,
        command: &Command,
    ) -> GenieResult<Vec<Application>> {
        if request.applications().is_empty() {
            return self
                .command_service
                .get_applications_for_command(&command.id)
                .await;
        }

        let mut applications = Vec::with_capacity(request.applications().len());
        for id in request.applications() {
            applications.push(self.application_service.get_application(id).await?);
        }
        Ok(applications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::tags;
    use crate::services::test_support::*;
    use std::sync::atomic::Ordering;

    struct Fixture {
        clusters: Arc<MockClusterService>,
        commands: Arc<MockCommandService>,
        applications: Arc<MockApplicationService>,
        balancer: Arc<RecordingLoadBalancer>,
    }

    impl Fixture {
        fn new(
            clusters: MockClusterService,
            commands: MockCommandService,
            applications: MockApplicationService,
        ) -> Self {
            Self {
                clusters: Arc::new(clusters),
                commands: Arc::new(commands),
                applications: Arc::new(applications),
                balancer: Arc::new(RecordingLoadBalancer::default()),
            }
        }

        fn resolver(&self) -> ResourceResolver {
            ResourceResolver::new(
                self.clusters.clone(),
                self.commands.clone(),
                self.applications.clone(),
                self.balancer.clone(),
            )
        }
    }

    fn cluster(id: &str) -> Cluster {
        Cluster::new(id, format!("cluster-{id}"), tags(["sched:adhoc"]))
    }

    #[tokio::test]
    async fn test_picks_first_command_with_superset_tags() {
        let commands = vec![
            Command::new("cmd-partial", "partial", tags(["a", "b"]), "/bin/partial"),
            Command::new("cmd-match", "match", tags(["a", "b", "c", "d"]), "/bin/match"),
            Command::new("cmd-later", "later", tags(["a", "b", "c"]), "/bin/later"),
        ];
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")]).with_commands("c1", commands),
            MockCommandService::default(),
            MockApplicationService::default(),
        );

        let resolved = fixture
            .resolver()
            .resolve(&job_request(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(resolved.cluster.id, "c1");
        assert_eq!(resolved.command.id, "cmd-match");
    }

    #[tokio::test]
    async fn test_only_active_commands_requested() {
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")]).with_commands(
                "c1",
                vec![
                    Command::new("old", "old", tags(["a"]), "/bin/old")
                        .with_status(CommandStatus::Deprecated),
                    Command::new("new", "new", tags(["a"]), "/bin/new"),
                ],
            ),
            MockCommandService::default(),
            MockApplicationService::default(),
        );

        let resolved = fixture.resolver().resolve(&job_request(&["a"])).await.unwrap();

        assert_eq!(resolved.command.id, "new");
        assert_eq!(
            *fixture.clusters.requested_statuses.lock().unwrap(),
            vec![vec![CommandStatus::Active]]
        );
    }

    #[tokio::test]
    async fn test_no_cluster_is_precondition() {
        let fixture = Fixture::new(
            MockClusterService::new(vec![]),
            MockCommandService::default(),
            MockApplicationService::default(),
        );

        let err = fixture.resolver().resolve(&job_request(&["a"])).await.unwrap_err();

        assert!(matches!(err, GenieError::Precondition(ref m) if m.contains("No cluster")));
    }

    #[tokio::test]
    async fn test_no_matching_command_is_precondition() {
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")]).with_commands(
                "c1",
                vec![Command::new("cmd", "cmd", tags(["unrelated"]), "/bin/cmd")],
            ),
            MockCommandService::default(),
            MockApplicationService::default(),
        );

        let err = fixture
            .resolver()
            .resolve(&job_request(&["a", "b", "c"]))
            .await
            .unwrap_err();

        assert!(matches!(err, GenieError::Precondition(ref m) if m.contains("No command")));
    }

    #[tokio::test]
    async fn test_load_balancer_only_consulted_for_multiple_candidates() {
        let single = Fixture::new(
            MockClusterService::new(vec![cluster("c1")])
                .with_commands("c1", vec![Command::new("cmd", "cmd", tags(["a"]), "x")]),
            MockCommandService::default(),
            MockApplicationService::default(),
        );
        single.resolver().resolve(&job_request(&["a"])).await.unwrap();
        assert_eq!(single.balancer.calls.load(Ordering::SeqCst), 0);

        let multiple = Fixture::new(
            MockClusterService::new(vec![cluster("c1"), cluster("c2")])
                .with_commands("c2", vec![Command::new("cmd", "cmd", tags(["a"]), "x")]),
            MockCommandService::default(),
            MockApplicationService::default(),
        );
        let resolved = multiple.resolver().resolve(&job_request(&["a"])).await.unwrap();
        assert_eq!(multiple.balancer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolved.cluster.id, "c2");
    }

    #[tokio::test]
    async fn test_command_applications_used_when_request_has_none() {
        let apps = vec![
            Application::new("hadoop", "hadoop"),
            Application::new("spark", "spark"),
            Application::new("hive", "hive"),
        ];
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")])
                .with_commands("c1", vec![Command::new("cmd", "cmd", tags(["a"]), "x")]),
            MockCommandService::default().with_applications("cmd", apps),
            MockApplicationService::default(),
        );

        let resolved = fixture.resolver().resolve(&job_request(&["a"])).await.unwrap();

        assert_eq!(resolved.application_ids(), ["hadoop", "spark", "hive"]);
        assert!(fixture.applications.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_applications_keep_request_order() {
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")])
                .with_commands("c1", vec![Command::new("cmd", "cmd", tags(["a"]), "x")]),
            MockCommandService::default()
                .with_applications("cmd", vec![Application::new("ignored", "ignored")]),
            MockApplicationService::default()
                .with_application(Application::new("app-1", "one"))
                .with_application(Application::new("app-2", "two")),
        );
        let request =
            job_request(&["a"]).with_applications(vec!["app-2".to_string(), "app-1".to_string()]);

        let resolved = fixture.resolver().resolve(&request).await.unwrap();

        assert_eq!(resolved.application_ids(), ["app-2", "app-1"]);
        assert_eq!(fixture.commands.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_explicit_application_error_passes_through() {
        let fixture = Fixture::new(
            MockClusterService::new(vec![cluster("c1")])
                .with_commands("c1", vec![Command::new("cmd", "cmd", tags(["a"]), "x")]),
            MockCommandService::default(),
            MockApplicationService::default(),
        );
        let request = job_request(&["a"]).with_applications(vec!["ghost".to_string()]);

        let err = fixture.resolver().resolve(&request).await.unwrap_err();

        assert!(matches!(err, GenieError::NotFound(ref m) if m.contains("ghost")));
    }
}
