use std::collections::HashSet;

use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::{Domain, Project};
use crate::domain::ports::IdentityService;
use crate::domain::repositories::AggregationRepository;
use crate::domain::services::{ConstraintStore, Scope};
use crate::domain::value_objects::{ClusterId, Constraint, ResourceRef};
use crate::error::Result;

/// Include/exclude filter applied to discovered domain and project
/// names before they are reconciled into the store (§4.I).
#[derive(Clone)]
pub struct DiscoveryFilter {
    pub include: Option<Regex>,
    pub exclude: Option<Regex>,
}

impl DiscoveryFilter {
    pub fn none() -> Self {
        Self { include: None, exclude: None }
    }

    fn admits(&self, name: &str) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(name) {
                return false;
            }
        }
        self.include.as_ref().map_or(true, |include| include.is_match(name))
    }
}

/// A minimum-bound constraint to install on a newly discovered scope, so
/// that a project's initial quota is never below its configured floor
/// (§4.I: "constraint application for newly discovered scopes").
pub struct InitialConstraint {
    pub resource: ResourceRef,
    pub constraint: Constraint,
}

pub struct ReconcileOutcome {
    pub domains_inserted: u64,
    pub projects_inserted: u64,
    pub projects_marked_for_deletion: u64,
}

/// Periodic domain/project enumeration and three-way reconcile against
/// the aggregation store (§4.I). Never deletes in-place: rows missing
/// from discovery are reported for a second pass to remove once their
/// scrapers have converged.
pub struct DiscoveryUseCase<'a> {
    pub cluster: &'a ClusterId,
    pub identity: &'a dyn IdentityService,
    pub repo: &'a dyn AggregationRepository,
    pub constraints: &'a ConstraintStore,
}

impl<'a> DiscoveryUseCase<'a> {
    pub async fn run(
        &self,
        filter: &DiscoveryFilter,
        initial_project_constraints: &[InitialConstraint],
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome {
            domains_inserted: 0,
            projects_inserted: 0,
            projects_marked_for_deletion: 0,
        };

        let discovered_domains = self.identity.list_domains(self.cluster).await?;
        let known_domains = self.repo.list_domains(self.cluster).await?;
        let known_domain_ids: HashSet<Uuid> = known_domains.iter().map(|d| d.uuid).collect();

        let mut live_domain_ids = HashSet::new();
        for dd in discovered_domains.into_iter().filter(|d| filter.admits(&d.name)) {
            live_domain_ids.insert(dd.uuid);
            if !known_domain_ids.contains(&dd.uuid) {
                self.repo
                    .upsert_domain(&Domain::new(self.cluster.clone(), dd.uuid, dd.name.clone()))
                    .await?;
                outcome.domains_inserted += 1;
                info!(cluster = %self.cluster, domain = %dd.uuid, "discovered new domain");
            }

            let discovered_projects = self.identity.list_projects(self.cluster, dd.uuid).await?;
            let known_projects = self.repo.list_projects(self.cluster, dd.uuid).await?;
            let known_project_ids: HashSet<Uuid> = known_projects.iter().map(|p| p.uuid).collect();
            let mut live_project_ids = HashSet::new();

            for dp in discovered_projects.into_iter().filter(|p| filter.admits(&p.name)) {
                live_project_ids.insert(dp.uuid);
                if !known_project_ids.contains(&dp.uuid) {
                    self.repo
                        .upsert_project(&Project::new(
                            self.cluster.clone(),
                            dd.uuid,
                            dp.uuid,
                            dp.name.clone(),
                            dp.parent_uuid,
                            dp.has_bursting,
                        ))
                        .await?;
                    outcome.projects_inserted += 1;

                    for ic in initial_project_constraints {
                        self.constraints.set(self.cluster, Scope::Project(dp.uuid), ic.resource.clone(), ic.constraint);
                    }
                    info!(cluster = %self.cluster, domain = %dd.uuid, project = %dp.uuid, "discovered new project");
                }
            }

            for known in &known_projects {
                if !live_project_ids.contains(&known.uuid) {
                    outcome.projects_marked_for_deletion += 1;
                    warn!(cluster = %self.cluster, project = %known.uuid, "project missing from discovery, marked for deletion pending convergence");
                }
            }
        }

        for known in &known_domains {
            if !live_domain_ids.contains(&known.uuid) {
                warn!(cluster = %self.cluster, domain = %known.uuid, "domain missing from discovery, marked for deletion pending convergence");
            }
        }

        Ok(outcome)
    }

    /// Second-pass cleanup: removes a domain (cascading its resources
    /// and projects) once it has been confirmed gone and any in-flight
    /// scrapes have converged. Callers are responsible for that
    /// convergence check; this only performs the deletion.
    pub async fn finalize_domain_removal(&self, domain_uuid: Uuid) -> Result<()> {
        self.repo.delete_domain(self.cluster, domain_uuid).await
    }

    pub async fn finalize_project_removal(&self, project_uuid: Uuid) -> Result<()> {
        self.repo.delete_project(self.cluster, project_uuid).await
    }
}
