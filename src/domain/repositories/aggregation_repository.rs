use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{
    ClusterResource, Domain, DomainResource, Project, ProjectResource, ProjectService,
};
use crate::domain::value_objects::ClusterId;
use crate::error::Result;

/// The aggregation store (§4.D): cluster/domain/project × service ×
/// resource rows, queried by the report builder and inconsistency
/// detector, written by the discovery loop, scrapers, and the
/// quota-change pipeline.
///
/// Every mutating method is expected to run inside a single transaction
/// covering the resource rows touched, the owning service row's
/// `scraped_at`, and any rollups — implicit rollback on failure (§4.D).
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait AggregationRepository: Send + Sync {
    async fn upsert_domain(&self, domain: &Domain) -> Result<()>;
    async fn delete_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<()>;
    async fn get_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Option<Domain>>;
    async fn list_domains(&self, cluster: &ClusterId) -> Result<Vec<Domain>>;

    async fn upsert_domain_resource(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        resource: &DomainResource,
    ) -> Result<()>;
    async fn get_domain_resources(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
    ) -> Result<Vec<DomainResource>>;

    async fn upsert_project(&self, project: &Project) -> Result<()>;
    async fn delete_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<()>;
    async fn get_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<Option<Project>>;
    async fn list_projects(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Vec<Project>>;
    async fn list_all_projects(&self, cluster: &ClusterId) -> Result<Vec<Project>>;

    async fn upsert_project_service(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service: &ProjectService,
    ) -> Result<()>;
    async fn get_project_services(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
    ) -> Result<Vec<ProjectService>>;

    async fn upsert_project_resource(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        resource: &ProjectResource,
    ) -> Result<()>;
    async fn get_project_resources(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
    ) -> Result<Vec<ProjectResource>>;
    async fn list_project_resources_for_domain(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
    ) -> Result<Vec<(Uuid, ProjectResource)>>;

    async fn upsert_cluster_resource(&self, cluster: &ClusterId, resource: &ClusterResource) -> Result<()>;
    async fn list_cluster_resources(&self, cluster: &ClusterId) -> Result<Vec<ClusterResource>>;

    /// Atomically sets a project resource's quota and returns the
    /// previous value, for use by the quota-change pipeline's persist
    /// stage (§4.G). `None` when the row did not exist yet.
    async fn set_project_resource_quota(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
        backend_quota: u64,
    ) -> Result<Option<u64>>;

    /// Same as above but for a domain-scoped quota change.
    async fn set_domain_resource_quota(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
    ) -> Result<Option<u64>>;
}
