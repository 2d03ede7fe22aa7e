use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::entities::{
    ClusterResource, Domain, DomainResource, Project, ProjectResource, ProjectService,
};
use crate::domain::repositories::AggregationRepository;
use crate::domain::value_objects::ClusterId;
use crate::error::Result;

type DomainKey = (ClusterId, Uuid);
type ProjectKey = (ClusterId, Uuid);

/// In-memory implementation of the aggregation store, backed by
/// `DashMap` for lock-free concurrent access — the same data-structure
/// choice the teacher's `InMemoryTenantRepository` makes. Used for tests
/// and for running the engine without a database.
#[derive(Default)]
pub struct InMemoryAggregationRepository {
    domains: DashMap<DomainKey, Domain>,
    domain_resources: DashMap<DomainKey, Vec<DomainResource>>,
    projects: DashMap<ProjectKey, Project>,
    project_services: DashMap<ProjectKey, Vec<ProjectService>>,
    project_resources: DashMap<ProjectKey, Vec<ProjectResource>>,
    cluster_resources: DashMap<ClusterId, Vec<ClusterResource>>,
}

impl InMemoryAggregationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AggregationRepository for InMemoryAggregationRepository {
    async fn upsert_domain(&self, domain: &Domain) -> Result<()> {
        self.domains.insert((domain.cluster.clone(), domain.uuid), domain.clone());
        Ok(())
    }

    async fn delete_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<()> {
        self.domains.remove(&(cluster.clone(), domain_uuid));
        self.domain_resources.remove(&(cluster.clone(), domain_uuid));
        Ok(())
    }

    async fn get_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Option<Domain>> {
        Ok(self.domains.get(&(cluster.clone(), domain_uuid)).map(|d| d.clone()))
    }

    async fn list_domains(&self, cluster: &ClusterId) -> Result<Vec<Domain>> {
        let mut out: Vec<Domain> = self
            .domains
            .iter()
            .filter(|e| &e.key().0 == cluster)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|d| d.uuid);
        Ok(out)
    }

    async fn upsert_domain_resource(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        resource: &DomainResource,
    ) -> Result<()> {
        let mut entry = self
            .domain_resources
            .entry((cluster.clone(), domain_uuid))
            .or_default();
        if let Some(existing) = entry
            .iter_mut()
            .find(|r| r.service_type == resource.service_type && r.resource_name == resource.resource_name)
        {
            *existing = resource.clone();
        } else {
            entry.push(resource.clone());
        }
        Ok(())
    }

    async fn get_domain_resources(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
    ) -> Result<Vec<DomainResource>> {
        Ok(self
            .domain_resources
            .get(&(cluster.clone(), domain_uuid))
            .map(|v| v.clone())
            .unwrap_or_default())
    }

    async fn upsert_project(&self, project: &Project) -> Result<()> {
        self.projects.insert((project.cluster.clone(), project.uuid), project.clone());
        Ok(())
    }

    async fn delete_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<()> {
        self.projects.remove(&(cluster.clone(), project_uuid));
        self.project_services.remove(&(cluster.clone(), project_uuid));
        self.project_resources.remove(&(cluster.clone(), project_uuid));
        Ok(())
    }

    async fn get_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.get(&(cluster.clone(), project_uuid)).map(|p| p.clone()))
    }

    async fn list_projects(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Vec<Project>> {
        let mut out: Vec<Project> = self
            .projects
            .iter()
            .filter(|e| e.value().cluster == *cluster && e.value().domain_uuid == domain_uuid)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|p| p.uuid);
        Ok(out)
    }

    async fn list_all_projects(&self, cluster: &ClusterId) -> Result<Vec<Project>> {
        let mut out: Vec<Project> = self
            .projects
            .iter()
            .filter(|e| &e.key().0 == cluster)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|p| p.uuid);
        Ok(out)
    }

    async fn upsert_project_service(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service: &ProjectService,
    ) -> Result<()> {
        let mut entry = self
            .project_services
            .entry((cluster.clone(), project_uuid))
            .or_default();
        if let Some(existing) = entry.iter_mut().find(|s| s.service_type == service.service_type) {
            *existing = service.clone();
        } else {
            entry.push(service.clone());
        }
        Ok(())
    }

    async fn get_project_services(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
    ) -> Result<Vec<ProjectService>> {
        Ok(self
            .project_services
            .get(&(cluster.clone(), project_uuid))
            .map(|v| v.clone())
            .unwrap_or_default())
    }

    async fn upsert_project_resource(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        resource: &ProjectResource,
    ) -> Result<()> {
        let mut entry = self
            .project_resources
            .entry((cluster.clone(), project_uuid))
            .or_default();
        if let Some(existing) = entry.iter_mut().find(|r| {
            r.service_type == resource.service_type && r.resource_name == resource.resource_name
        }) {
            *existing = resource.clone();
        } else {
            entry.push(resource.clone());
        }
        Ok(())
    }

    async fn get_project_resources(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
    ) -> Result<Vec<ProjectResource>> {
        Ok(self
            .project_resources
            .get(&(cluster.clone(), project_uuid))
            .map(|v| v.iter().filter(|r| r.service_type == service_type).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_project_resources_for_domain(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
    ) -> Result<Vec<(Uuid, ProjectResource)>> {
        let projects = self.list_projects(cluster, domain_uuid).await?;
        let mut out = Vec::new();
        for project in projects {
            if let Some(resources) = self.project_resources.get(&(cluster.clone(), project.uuid)) {
                if let Some(r) = resources
                    .iter()
                    .find(|r| r.service_type == service_type && r.resource_name == resource_name)
                {
                    out.push((project.uuid, r.clone()));
                }
            }
        }
        out.sort_by_key(|(uuid, _)| *uuid);
        Ok(out)
    }

    async fn upsert_cluster_resource(&self, cluster: &ClusterId, resource: &ClusterResource) -> Result<()> {
        let mut entry = self.cluster_resources.entry(cluster.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|r| {
            r.service_type == resource.service_type && r.resource_name == resource.resource_name
        }) {
            *existing = resource.clone();
        } else {
            entry.push(resource.clone());
        }
        Ok(())
    }

    async fn list_cluster_resources(&self, cluster: &ClusterId) -> Result<Vec<ClusterResource>> {
        Ok(self.cluster_resources.get(cluster).map(|v| v.clone()).unwrap_or_default())
    }

    async fn set_project_resource_quota(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
        backend_quota: u64,
    ) -> Result<Option<u64>> {
        let mut entry = self
            .project_resources
            .entry((cluster.clone(), project_uuid))
            .or_default();
        if let Some(existing) = entry
            .iter_mut()
            .find(|r| r.service_type == service_type && r.resource_name == resource_name)
        {
            let old = existing.quota;
            existing.quota = new_quota;
            existing.backend_quota = backend_quota;
            Ok(Some(old))
        } else {
            let mut resource = ProjectResource::new(service_type, resource_name);
            resource.quota = new_quota;
            resource.backend_quota = backend_quota;
            entry.push(resource);
            Ok(None)
        }
    }

    async fn set_domain_resource_quota(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
    ) -> Result<Option<u64>> {
        let mut entry = self
            .domain_resources
            .entry((cluster.clone(), domain_uuid))
            .or_default();
        if let Some(existing) = entry
            .iter_mut()
            .find(|r| r.service_type == service_type && r.resource_name == resource_name)
        {
            let old = existing.quota;
            existing.quota = new_quota;
            Ok(Some(old))
        } else {
            entry.push(DomainResource::new(service_type, resource_name, new_quota));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_project_resource_quota_returns_previous_value() {
        let repo = InMemoryAggregationRepository::new();
        let cluster = ClusterId::new("eu-west-1").unwrap();
        let project_uuid = Uuid::new_v4();

        let first = repo
            .set_project_resource_quota(&cluster, project_uuid, "compute", "cores", 10, 10)
            .await
            .unwrap();
        assert_eq!(first, None);

        let second = repo
            .set_project_resource_quota(&cluster, project_uuid, "compute", "cores", 20, 20)
            .await
            .unwrap();
        assert_eq!(second, Some(10));
    }

    #[tokio::test]
    async fn list_domains_is_sorted_by_uuid() {
        let repo = InMemoryAggregationRepository::new();
        let cluster = ClusterId::new("eu-west-1").unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        repo.upsert_domain(&Domain::new(cluster.clone(), b.max(a), "b")).await.unwrap();
        repo.upsert_domain(&Domain::new(cluster.clone(), a.min(b), "a")).await.unwrap();

        let domains = repo.list_domains(&cluster).await.unwrap();
        assert_eq!(domains.len(), 2);
        assert!(domains[0].uuid <= domains[1].uuid);
    }

    #[tokio::test]
    async fn delete_domain_cascades_resources() {
        let repo = InMemoryAggregationRepository::new();
        let cluster = ClusterId::new("eu-west-1").unwrap();
        let domain_uuid = Uuid::new_v4();
        repo.upsert_domain(&Domain::new(cluster.clone(), domain_uuid, "d")).await.unwrap();
        repo.upsert_domain_resource(&cluster, domain_uuid, &DomainResource::new("compute", "cores", 10))
            .await
            .unwrap();

        repo.delete_domain(&cluster, domain_uuid).await.unwrap();

        assert!(repo.get_domain(&cluster, domain_uuid).await.unwrap().is_none());
        assert!(repo.get_domain_resources(&cluster, domain_uuid).await.unwrap().is_empty());
    }
}
