use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::ports::{DiscoveredDomain, DiscoveredProject, IdentityService};
use crate::domain::value_objects::ClusterId;
use crate::error::Result;

/// In-memory stand-in for the identity service, used by tests and by
/// the admin CLI's `discovery run` command against a fixture. A real
/// deployment talks to the actual identity service instead (§1: out of
/// scope, external collaborator).
#[derive(Default)]
pub struct StubIdentityService {
    domains: DashMap<ClusterId, Vec<DiscoveredDomain>>,
    projects: DashMap<(ClusterId, Uuid), Vec<DiscoveredProject>>,
}

impl StubIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_domain(&self, cluster: ClusterId, domain: DiscoveredDomain) {
        self.domains.entry(cluster).or_default().push(domain);
    }

    pub fn seed_project(&self, cluster: ClusterId, domain_uuid: Uuid, project: DiscoveredProject) {
        self.projects.entry((cluster, domain_uuid)).or_default().push(project);
    }
}

#[async_trait]
impl IdentityService for StubIdentityService {
    async fn list_domains(&self, cluster: &ClusterId) -> Result<Vec<DiscoveredDomain>> {
        Ok(self.domains.get(cluster).map(|v| v.clone()).unwrap_or_default())
    }

    async fn list_projects(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Vec<DiscoveredProject>> {
        Ok(self
            .projects
            .get(&(cluster.clone(), domain_uuid))
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}
