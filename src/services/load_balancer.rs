//! Default cluster load balancer.

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::Cluster;
use crate::domain::ports::ClusterLoadBalancer;

/// Always picks the first candidate, so callers express preference through
/// the order their cluster service returns candidates in.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstClusterLoadBalancer;

impl FirstClusterLoadBalancer {
    pub fn new() -> Self {
        Self
    }
}

impl ClusterLoadBalancer for FirstClusterLoadBalancer {
    fn select_cluster(&self, clusters: &[Cluster]) -> GenieResult<Cluster> {
        clusters.first().cloned().ok_or_else(|| {
            GenieError::Precondition("No cluster candidates to select from".to_string())
        })
    }
}
