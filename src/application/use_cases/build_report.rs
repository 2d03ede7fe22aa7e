use uuid::Uuid;

use crate::application::dto::{
    ClusterReport, ClusterResourceReport, DomainReport, DomainResourceReport, ProjectReport,
    ReportFilter, ResourceReport, ServiceReport,
};
use crate::domain::entities::{Cluster, ProjectResource};
use crate::domain::repositories::AggregationRepository;
use crate::domain::services::ResourceRegistry;
use crate::error::Result;

/// Joins the aggregation store into the three hierarchical report
/// shapes (§4.E). Pure read path: never touches the constraint store or
/// any backend plugin.
pub struct ReportBuilder<'a> {
    pub cluster: &'a Cluster,
    pub registry: &'a ResourceRegistry,
    pub repo: &'a dyn AggregationRepository,
}

impl<'a> ReportBuilder<'a> {
    fn render_resource(&self, service_type: &str, r: &ProjectResource, has_bursting: bool, filter: &ReportFilter) -> ResourceReport {
        let behavior = self.registry.behavior_for_resource(service_type, &r.resource_name);
        let multiplier = if behavior.max_burst_multiplier > 0.0 {
            behavior.max_burst_multiplier
        } else {
            self.cluster.max_burst_multiplier()
        };
        let usable_quota = if has_bursting && multiplier > 0.0 {
            ((r.quota as f64) * (1.0 + multiplier)).floor() as u64
        } else {
            r.quota
        };
        let burst_usage = r.usage.saturating_sub(r.quota);
        ResourceReport {
            resource_name: r.resource_name.clone(),
            quota: r.quota,
            usable_quota,
            usage: r.usage,
            burst_usage,
            backend_quota: r.backend_quota,
            physical_usage: r.physical_usage,
            subresources: if filter.with_subresources { r.subresources.clone() } else { None },
        }
    }

    async fn render_project(&self, project_uuid: Uuid, filter: &ReportFilter) -> Result<ProjectReport> {
        let project = self
            .repo
            .get_project(self.cluster.id(), project_uuid)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("project {project_uuid}")))?;

        let service_meta = self.repo.get_project_services(self.cluster.id(), project_uuid).await?;

        let mut services = Vec::new();
        for service_type in self.registry.service_types().map(|s| s.to_string()) {
            if !filter.matches_service(&service_type) {
                continue;
            }
            let (scraped_at, rates_scraped_at, scrape_error_message) = service_meta
                .iter()
                .find(|s| s.service_type == service_type)
                .map(|s| (s.scraped_at, s.rates_scraped_at, s.scrape_error_message.clone()))
                .unwrap_or((None, None, None));

            let resources = self
                .repo
                .get_project_resources(self.cluster.id(), project_uuid, &service_type)
                .await?
                .into_iter()
                .filter(|r| filter.matches_resource(&r.resource_name))
                .map(|r| self.render_resource(&service_type, &r, project.has_bursting, filter))
                .collect();

            services.push(ServiceReport {
                service_type,
                scraped_at,
                rates_scraped_at: if filter.with_rates { rates_scraped_at } else { None },
                scrape_error_message,
                resources,
            });
        }

        Ok(ProjectReport {
            uuid: project.uuid,
            name: project.name,
            parent_uuid: project.parent_uuid,
            has_bursting: project.has_bursting,
            services,
        })
    }

    /// Produces a project report for exactly one project.
    pub async fn project_report(&self, project_uuid: Uuid, filter: &ReportFilter) -> Result<ProjectReport> {
        self.render_project(project_uuid, filter).await
    }

    /// Streaming variant (§4.E): invokes `on_project` once per completed
    /// project report instead of collecting them, so a domain with many
    /// projects need not be held in memory at once.
    pub async fn stream_domain_projects<F>(
        &self,
        domain_uuid: Uuid,
        filter: &ReportFilter,
        mut on_project: F,
    ) -> Result<()>
    where
        F: FnMut(ProjectReport),
    {
        let mut projects = self.repo.list_projects(self.cluster.id(), domain_uuid).await?;
        projects.sort_by_key(|p| p.uuid);
        for project in projects {
            let report = self.render_project(project.uuid, filter).await?;
            on_project(report);
        }
        Ok(())
    }

    /// Non-streaming domain report: same data, collected eagerly.
    pub async fn domain_report(&self, domain_uuid: Uuid, filter: &ReportFilter) -> Result<DomainReport> {
        let domain = self
            .repo
            .get_domain(self.cluster.id(), domain_uuid)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("domain {domain_uuid}")))?;

        let domain_resources = self.repo.get_domain_resources(self.cluster.id(), domain_uuid).await?;
        let project_sums = self.repo.list_all_projects(self.cluster.id()).await?;

        let mut resources = Vec::new();
        for dr in domain_resources.into_iter().filter(|r| {
            filter.matches_service(&r.service_type) && filter.matches_resource(&r.resource_name)
        }) {
            let mut projects_quota = 0u64;
            for project in &project_sums {
                if project.domain_uuid != domain_uuid {
                    continue;
                }
                let rows = self
                    .repo
                    .get_project_resources(self.cluster.id(), project.uuid, &dr.service_type)
                    .await?;
                projects_quota += rows
                    .iter()
                    .find(|r| r.resource_name == dr.resource_name)
                    .map(|r| r.quota)
                    .unwrap_or(0);
            }
            resources.push(DomainResourceReport {
                service_type: dr.service_type,
                resource_name: dr.resource_name,
                quota: dr.quota,
                projects_quota,
            });
        }

        let mut projects = Vec::new();
        self.stream_domain_projects(domain_uuid, filter, |p| projects.push(p)).await?;
        projects.sort_by_key(|p| p.uuid);

        Ok(DomainReport { uuid: domain.uuid, name: domain.name, resources, projects })
    }

    pub async fn cluster_report(&self, filter: &ReportFilter) -> Result<ClusterReport> {
        let mut rows = self.repo.list_cluster_resources(self.cluster.id()).await?;
        rows.sort_by(|a, b| (a.service_type.as_str(), a.resource_name.as_str()).cmp(&(b.service_type.as_str(), b.resource_name.as_str())));

        let resources = rows
            .into_iter()
            .filter(|r| filter.matches_service(&r.service_type) && filter.matches_resource(&r.resource_name))
            .map(|r| {
                let behavior = self.registry.behavior_for_resource(&r.service_type, &r.resource_name);
                ClusterResourceReport {
                    raw_capacity: r.capacity,
                    capacity: r.effective_capacity(behavior.overcommit_factor),
                    capacity_per_az: if filter.with_subcapacities { r.capacity_per_az.clone() } else { None },
                    scraped_at: r.scraped_at,
                    service_type: r.service_type,
                    resource_name: r.resource_name,
                }
            })
            .collect();

        Ok(ClusterReport { cluster: self.cluster.id().as_str().to_string(), resources })
    }
}
