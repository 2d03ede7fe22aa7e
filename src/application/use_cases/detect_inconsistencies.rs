use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::Cluster;
use crate::domain::repositories::AggregationRepository;
use crate::domain::services::ResourceRegistry;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct OvercommittedDomainQuota {
    pub domain_uuid: Uuid,
    pub domain_name: String,
    pub service_type: String,
    pub resource_name: String,
    pub projects_quota: u64,
    pub domain_quota: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverspentProjectQuota {
    pub domain_uuid: Uuid,
    pub project_uuid: Uuid,
    pub project_name: String,
    pub service_type: String,
    pub resource_name: String,
    pub usage: u64,
    pub quota: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendMismatch {
    pub domain_uuid: Uuid,
    pub project_uuid: Uuid,
    pub project_name: String,
    pub service_type: String,
    pub resource_name: String,
    pub quota: u64,
    pub backend_quota: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeErrorFinding {
    pub service_type: String,
    pub message: String,
    pub affected_projects: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InconsistencyReport {
    pub overcommitted_domain_quota: Vec<OvercommittedDomainQuota>,
    pub overspent_project_quota: Vec<OverspentProjectQuota>,
    pub backend_mismatch: Vec<BackendMismatch>,
    pub scrape_errors: Vec<ScrapeErrorFinding>,
}

/// Three independent, pure read-path queries plus scrape-error grouping
/// (§4.F). Every list is emitted even when empty, never omitted.
pub struct InconsistencyDetector<'a> {
    pub cluster: &'a Cluster,
    pub registry: &'a ResourceRegistry,
    pub repo: &'a dyn AggregationRepository,
}

impl<'a> InconsistencyDetector<'a> {
    pub async fn run(&self) -> Result<InconsistencyReport> {
        let mut report = InconsistencyReport::default();
        let domains = self.repo.list_domains(self.cluster.id()).await?;

        for domain in &domains {
            let domain_resources = self.repo.get_domain_resources(self.cluster.id(), domain.uuid).await?;
            for dr in &domain_resources {
                let rows = self
                    .repo
                    .list_project_resources_for_domain(self.cluster.id(), domain.uuid, &dr.service_type, &dr.resource_name)
                    .await?;
                let projects_quota: u64 = rows.iter().map(|(_, r)| r.quota).sum();
                if projects_quota > dr.quota {
                    report.overcommitted_domain_quota.push(OvercommittedDomainQuota {
                        domain_uuid: domain.uuid,
                        domain_name: domain.name.clone(),
                        service_type: dr.service_type.clone(),
                        resource_name: dr.resource_name.clone(),
                        projects_quota,
                        domain_quota: dr.quota,
                    });
                }
            }
        }

        let projects = self.repo.list_all_projects(self.cluster.id()).await?;
        let mut scrape_error_counts: HashMap<(String, String), u64> = HashMap::new();

        for project in &projects {
            let bursting_multiplier = if project.has_bursting {
                Some(self.cluster.max_burst_multiplier())
            } else {
                None
            };

            for service_type in self.registry.service_types().map(|s| s.to_string()) {
                let resources = self
                    .repo
                    .get_project_resources(self.cluster.id(), project.uuid, &service_type)
                    .await?;
                for r in &resources {
                    if r.is_overspent(bursting_multiplier) {
                        report.overspent_project_quota.push(OverspentProjectQuota {
                            domain_uuid: project.domain_uuid,
                            project_uuid: project.uuid,
                            project_name: project.name.clone(),
                            service_type: service_type.clone(),
                            resource_name: r.resource_name.clone(),
                            usage: r.usage,
                            quota: r.quota,
                        });
                    }
                    if r.is_backend_mismatched() {
                        report.backend_mismatch.push(BackendMismatch {
                            domain_uuid: project.domain_uuid,
                            project_uuid: project.uuid,
                            project_name: project.name.clone(),
                            service_type: service_type.clone(),
                            resource_name: r.resource_name.clone(),
                            quota: r.quota,
                            backend_quota: r.backend_quota,
                        });
                    }
                }
            }

            let services = self.repo.get_project_services(self.cluster.id(), project.uuid).await?;
            for s in services {
                if let Some(message) = s.scrape_error_message {
                    *scrape_error_counts.entry((s.service_type, message)).or_insert(0) += 1;
                }
            }
        }

        report.scrape_errors = scrape_error_counts
            .into_iter()
            .map(|((service_type, message), affected_projects)| ScrapeErrorFinding {
                service_type,
                message,
                affected_projects,
            })
            .collect();
        report.scrape_errors.sort_by(|a, b| (&a.service_type, &a.message).cmp(&(&b.service_type, &b.message)));

        report.overcommitted_domain_quota.sort_by(|a, b| (a.domain_uuid, &a.service_type, &a.resource_name).cmp(&(b.domain_uuid, &b.service_type, &b.resource_name)));
        report.overspent_project_quota.sort_by(|a, b| (a.project_uuid, &a.service_type, &a.resource_name).cmp(&(b.project_uuid, &b.service_type, &b.resource_name)));
        report.backend_mismatch.sort_by(|a, b| (a.project_uuid, &a.service_type, &a.resource_name).cmp(&(b.project_uuid, &b.service_type, &b.resource_name)));

        Ok(report)
    }
}
