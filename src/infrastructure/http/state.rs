use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::Cluster;
use crate::domain::ports::IdentityService;
use crate::domain::repositories::AggregationRepository;
use crate::domain::services::{ConstraintStore, ResourceRegistry};
use crate::domain::value_objects::ClusterId;
use crate::infrastructure::messaging::AuditSink;

/// Everything one configured cluster needs to serve requests: its
/// registry of plugins, its compiled constraints, and a handle to the
/// shared aggregation store.
pub struct ClusterContext {
    pub cluster: Cluster,
    pub registry: ResourceRegistry,
}

/// Shared application state handed to every axum handler (§6). One
/// `AggregationRepository`/`AuditSink`/`IdentityService` is shared across
/// all configured clusters; resource registries and compiled cluster
/// metadata are per-cluster.
#[derive(Clone)]
pub struct AppState {
    pub clusters: Arc<Vec<Arc<ClusterContext>>>,
    pub repo: Arc<dyn AggregationRepository>,
    pub constraints: Arc<ConstraintStore>,
    pub audit: Arc<AuditSink>,
    pub identity: Arc<dyn IdentityService>,
    pub observer_id: Uuid,
}

impl AppState {
    pub fn cluster(&self, id: &ClusterId) -> Option<Arc<ClusterContext>> {
        self.clusters.iter().find(|c| c.cluster.id() == id).cloned()
    }
}
