use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{AuditEvent, ChangeScope, Cluster, QuotaChange};
use crate::domain::ports::{ProjectRef, TokenContext};
use crate::domain::repositories::AggregationRepository;
use crate::domain::services::{ConstraintStore, ResourceRegistry, Scope};
use crate::domain::value_objects::ResourceRef;
use crate::error::{Error, Result};
use crate::infrastructure::messaging::AuditSink;

/// One quota-change request as received from the HTTP layer, already
/// stripped of transport concerns.
pub struct ChangeQuotaRequest {
    pub scope: ChangeScope,
    pub service_type: String,
    pub resource_name: String,
    /// The raw textual value from the request body, in the resource's
    /// declared unit (e.g. `"10 GiB"` or `"16"`).
    pub requested_value: String,
    pub token: TokenContext,
    pub request_path: String,
    pub remote_address: String,
    pub user_agent: String,
}

pub struct ChangeQuotaOutcome {
    pub old_quota: u64,
    pub new_quota: u64,
}

/// Implements the quota-change pipeline (§4.G): Received → Authorized →
/// Validated → Applied → Persisted → Audited → Acknowledged. Every exit
/// path, success or rejection, produces exactly one audit event before
/// returning.
pub struct ChangeQuotaUseCase<'a> {
    pub cluster: &'a Cluster,
    pub registry: &'a ResourceRegistry,
    pub constraints: &'a ConstraintStore,
    pub repo: &'a dyn AggregationRepository,
    pub audit: &'a AuditSink,
    pub observer_id: Uuid,
}

impl<'a> ChangeQuotaUseCase<'a> {
    pub async fn execute(&self, req: ChangeQuotaRequest) -> Result<ChangeQuotaOutcome> {
        match self.try_execute(&req).await {
            Ok(outcome) => {
                self.emit(&req, outcome.old_quota, outcome.new_quota, None);
                Ok(outcome)
            }
            Err((old_quota, err)) => {
                self.emit(&req, old_quota, old_quota, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Runs the validation/apply/persist stages. Returns `old_quota`
    /// alongside any error so the caller can still build a faithful
    /// audit payload for rejected changes.
    async fn try_execute(&self, req: &ChangeQuotaRequest) -> std::result::Result<ChangeQuotaOutcome, (u64, Error)> {
        if !self.cluster.has_service(&req.service_type) {
            return Err((0, Error::ServiceUnknown(req.service_type.clone())));
        }
        if !self.registry.has_resource(&req.service_type, &req.resource_name) {
            return Err((
                0,
                Error::ResourceUnknown {
                    service: req.service_type.clone(),
                    resource: req.resource_name.clone(),
                },
            ));
        }

        let info = self.registry.info_for_resource(&req.service_type, &req.resource_name);
        let requested = info
            .unit
            .parse(&req.requested_value)
            .map_err(|e| (0, e))?;

        let resource_ref = ResourceRef::new(req.service_type.clone(), req.resource_name.clone());
        let constraint_scope = match req.scope {
            ChangeScope::Domain(d) => Scope::Domain(d),
            ChangeScope::Project { project_uuid, .. } => Scope::Project(project_uuid),
        };
        let constraint = self.constraints.get(self.cluster.id(), constraint_scope, &resource_ref);

        if !req.token.is_privileged && !constraint.allows(requested) {
            if let Some(min) = constraint.minimum {
                if requested < min {
                    return Err((
                        0,
                        Error::QuotaBelowMinimum {
                            requested,
                            minimum: min,
                            unit: info.unit.to_string(),
                        },
                    ));
                }
            }
            if let Some(max) = constraint.maximum {
                if requested > max {
                    return Err((
                        0,
                        Error::QuotaAboveMaximum {
                            requested,
                            maximum: max,
                            unit: info.unit.to_string(),
                        },
                    ));
                }
            }
        }

        if let ChangeScope::Project { domain_uuid, project_uuid } = req.scope {
            self.check_bursting_ceiling(domain_uuid, project_uuid, &req.service_type, &req.resource_name, requested, &info)
                .await
                .map_err(|e| (0, e))?;
            self.check_domain_sum(domain_uuid, project_uuid, &req.service_type, &req.resource_name, requested)
                .await
                .map_err(|e| (0, e))?;
        }

        let mut new_quota = requested;

        if let ChangeScope::Project { domain_uuid, project_uuid } = req.scope {
            let project_ref = ProjectRef {
                cluster: self.cluster.id().clone(),
                domain_uuid,
                project_uuid,
            };
            let plugin = self.registry.plugin_for_service(&req.service_type).ok_or_else(|| {
                (0, Error::ServiceUnknown(req.service_type.clone()))
            })?;
            let mut quotas = HashMap::new();
            quotas.insert(req.resource_name.clone(), requested);

            plugin
                .is_quota_acceptable_for_project(&project_ref, &quotas)
                .await
                .map_err(|e| (0, e))?;

            let adjusted = plugin.set_quota(&project_ref, &quotas).await.map_err(|e| (0, e))?;
            if let Some(map) = adjusted {
                if let Some(v) = map.get(&req.resource_name) {
                    new_quota = *v;
                }
            }

            let previous = self
                .repo
                .set_project_resource_quota(
                    self.cluster.id(),
                    project_uuid,
                    &req.service_type,
                    &req.resource_name,
                    new_quota,
                    new_quota,
                )
                .await
                .map_err(|e| (0, Error::PersistFailed(e.to_string())))?;

            Ok(ChangeQuotaOutcome { old_quota: previous.unwrap_or(0), new_quota })
        } else if let ChangeScope::Domain(domain_uuid) = req.scope {
            let previous = self
                .repo
                .set_domain_resource_quota(
                    self.cluster.id(),
                    domain_uuid,
                    &req.service_type,
                    &req.resource_name,
                    new_quota,
                )
                .await
                .map_err(|e| (0, Error::PersistFailed(e.to_string())))?;

            Ok(ChangeQuotaOutcome { old_quota: previous.unwrap_or(0), new_quota })
        } else {
            unreachable!("ChangeScope only has Domain and Project variants")
        }
    }

    /// A project with bursting enabled may carry a quota above its
    /// domain's configured share, up to the resource's (or else the
    /// cluster's) maximum burst multiplier. Requests beyond that ceiling
    /// are rejected rather than silently clamped, since bursting capacity
    /// is a physical promise, not an administrative preference.
    async fn check_bursting_ceiling(
        &self,
        domain_uuid: Uuid,
        project_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        requested: u64,
        info: &crate::domain::ports::ResourceMetadata,
    ) -> Result<()> {
        let project = self.repo.get_project(self.cluster.id(), project_uuid).await?;
        let has_bursting = project.map(|p| p.has_bursting).unwrap_or(false);
        if !has_bursting {
            return Ok(());
        }

        let domain_resources = self.repo.get_domain_resources(self.cluster.id(), domain_uuid).await?;
        let domain_quota = domain_resources
            .iter()
            .find(|r| r.service_type == service_type && r.resource_name == resource_name)
            .map(|r| r.quota);

        let Some(domain_quota) = domain_quota else {
            return Ok(());
        };

        let behavior = self.registry.behavior_for_resource(service_type, resource_name);
        let multiplier = if behavior.max_burst_multiplier > 0.0 {
            behavior.max_burst_multiplier
        } else {
            self.cluster.max_burst_multiplier()
        };

        let ceiling = ((domain_quota as f64) * (1.0 + multiplier)).floor() as u64;
        if requested > ceiling {
            return Err(Error::QuotaViolatesBursting {
                requested,
                ceiling,
                unit: info.unit.to_string(),
            });
        }
        Ok(())
    }

    /// Invariant 1 (§3): the sum of sibling project quotas for this
    /// (service, resource), including the requested change, must not
    /// exceed the domain's configured quota. Projects with no domain
    /// quota configured for the resource yet are not constrained by it.
    async fn check_domain_sum(
        &self,
        domain_uuid: Uuid,
        project_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        requested: u64,
    ) -> Result<()> {
        let domain_resources = self.repo.get_domain_resources(self.cluster.id(), domain_uuid).await?;
        let Some(domain_quota) = domain_resources
            .iter()
            .find(|r| r.service_type == service_type && r.resource_name == resource_name)
            .map(|r| r.quota)
        else {
            return Ok(());
        };

        let siblings = self
            .repo
            .list_project_resources_for_domain(self.cluster.id(), domain_uuid, service_type, resource_name)
            .await?;
        let siblings_sum: u64 = siblings
            .iter()
            .filter(|(uuid, _)| *uuid != project_uuid)
            .map(|(_, r)| r.quota)
            .sum();

        let projects_sum = siblings_sum + requested;
        if projects_sum > domain_quota {
            return Err(Error::QuotaExceedsDomainSum { projects_sum, domain_quota });
        }
        Ok(())
    }

    fn emit(&self, req: &ChangeQuotaRequest, old_quota: u64, new_quota: u64, reject_reason: Option<String>) {
        let change = QuotaChange {
            who: req.token.clone(),
            when: Utc::now(),
            cluster: self.cluster.id().clone(),
            scope: req.scope,
            service_type: req.service_type.clone(),
            resource_name: req.resource_name.clone(),
            old_quota,
            new_quota,
            unit: self.registry.info_for_resource(&req.service_type, &req.resource_name).unit,
            reject_reason,
        };
        let event = AuditEvent::from_quota_change(
            &change,
            &req.token,
            req.request_path.clone(),
            req.remote_address.clone(),
            req.user_agent.clone(),
            self.observer_id,
        );
        self.audit.try_send(self.cluster.id(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Project;
    use crate::domain::services::ResourceRegistryBuilder;
    use crate::domain::value_objects::{ClusterId, Constraint, Unit};
    use crate::infrastructure::persistence::InMemoryAggregationRepository;
    use crate::infrastructure::plugins::NoopPlugin;
    use std::sync::Arc;

    fn token(privileged: bool) -> TokenContext {
        TokenContext {
            user_id: "u".into(),
            user_name: "alice".into(),
            domain_id: "d".into(),
            domain_name: "eng".into(),
            project_id: None,
            is_privileged: privileged,
        }
    }

    async fn harness() -> (Cluster, ResourceRegistry, ConstraintStore, InMemoryAggregationRepository, AuditSink) {
        let cluster_id = ClusterId::new("eu-west-1").unwrap();
        let cluster = Cluster::new(cluster_id.clone(), vec!["compute".into()], 0.5).unwrap();
        let registry = ResourceRegistryBuilder::new()
            .register_plugin(Arc::new(NoopPlugin::countable("compute", "compute", &["cores"])))
            .unwrap()
            .build();
        let constraints = ConstraintStore::new();
        let repo = InMemoryAggregationRepository::new();
        let audit = AuditSink::new();
        (cluster, registry, constraints, repo, audit)
    }

    #[tokio::test]
    async fn accepted_change_persists_and_audits_success() {
        let (cluster, registry, constraints, repo, audit) = harness().await;
        let domain_uuid = Uuid::new_v4();
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, project_uuid, "proj", None, false))
            .await
            .unwrap();

        let use_case = ChangeQuotaUseCase {
            cluster: &cluster,
            registry: &registry,
            constraints: &constraints,
            repo: &repo,
            audit: &audit,
            observer_id: Uuid::nil(),
        };
        let req = ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "16".into(),
            token: token(false),
            request_path: "/v1/x".into(),
            remote_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };

        let outcome = use_case.execute(req).await.unwrap();
        assert_eq!(outcome.old_quota, 0);
        assert_eq!(outcome.new_quota, 16);
    }

    #[tokio::test]
    async fn unprivileged_request_below_minimum_is_rejected() {
        let (cluster, registry, constraints, repo, audit) = harness().await;
        let domain_uuid = Uuid::new_v4();
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, project_uuid, "proj", None, false))
            .await
            .unwrap();
        constraints.set(
            cluster.id(),
            Scope::Project(project_uuid),
            ResourceRef::new("compute", "cores"),
            Constraint { minimum: Some(10), maximum: None, expected: None },
        );

        let use_case = ChangeQuotaUseCase {
            cluster: &cluster,
            registry: &registry,
            constraints: &constraints,
            repo: &repo,
            audit: &audit,
            observer_id: Uuid::nil(),
        };
        let req = ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "2".into(),
            token: token(false),
            request_path: "/v1/x".into(),
            remote_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };

        let err = use_case.execute(req).await.unwrap_err();
        assert!(matches!(err, Error::QuotaBelowMinimum { .. }));
    }

    #[tokio::test]
    async fn privileged_request_bypasses_constraint_clamp() {
        let (cluster, registry, constraints, repo, audit) = harness().await;
        let domain_uuid = Uuid::new_v4();
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, project_uuid, "proj", None, false))
            .await
            .unwrap();
        constraints.set(
            cluster.id(),
            Scope::Project(project_uuid),
            ResourceRef::new("compute", "cores"),
            Constraint { minimum: Some(10), maximum: None, expected: None },
        );

        let use_case = ChangeQuotaUseCase {
            cluster: &cluster,
            registry: &registry,
            constraints: &constraints,
            repo: &repo,
            audit: &audit,
            observer_id: Uuid::nil(),
        };
        let req = ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "2".into(),
            token: token(true),
            request_path: "/v1/x".into(),
            remote_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };

        let outcome = use_case.execute(req).await.unwrap();
        assert_eq!(outcome.new_quota, 2);
    }

    #[tokio::test]
    async fn bursting_ceiling_rejects_requests_beyond_multiplier() {
        let (cluster, registry, constraints, repo, audit) = harness().await;
        let domain_uuid = Uuid::new_v4();
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, project_uuid, "proj", None, true))
            .await
            .unwrap();
        repo.set_domain_resource_quota(cluster.id(), domain_uuid, "compute", "cores", 100)
            .await
            .unwrap();

        let use_case = ChangeQuotaUseCase {
            cluster: &cluster,
            registry: &registry,
            constraints: &constraints,
            repo: &repo,
            audit: &audit,
            observer_id: Uuid::nil(),
        };
        // cluster max_burst_multiplier is 0.5, so ceiling = 150
        let req = ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "200".into(),
            token: token(false),
            request_path: "/v1/x".into(),
            remote_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };

        let err = use_case.execute(req).await.unwrap_err();
        assert!(matches!(err, Error::QuotaViolatesBursting { .. }));
    }

    #[tokio::test]
    async fn domain_sum_rejects_change_that_would_overcommit_the_domain() {
        let (cluster, registry, constraints, repo, audit) = harness().await;
        let domain_uuid = Uuid::new_v4();
        let sibling_uuid = Uuid::new_v4();
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, sibling_uuid, "sibling", None, false))
            .await
            .unwrap();
        repo.upsert_project(&Project::new(cluster.id().clone(), domain_uuid, project_uuid, "proj", None, false))
            .await
            .unwrap();
        repo.set_domain_resource_quota(cluster.id(), domain_uuid, "compute", "cores", 100)
            .await
            .unwrap();
        repo.set_project_resource_quota(cluster.id(), sibling_uuid, "compute", "cores", 80, 80)
            .await
            .unwrap();

        let use_case = ChangeQuotaUseCase {
            cluster: &cluster,
            registry: &registry,
            constraints: &constraints,
            repo: &repo,
            audit: &audit,
            observer_id: Uuid::nil(),
        };
        // sibling already holds 80; requesting 30 more would sum to 110 > domain quota 100
        let req = ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "30".into(),
            token: token(false),
            request_path: "/v1/x".into(),
            remote_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };

        let err = use_case.execute(req).await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceedsDomainSum { projects_sum: 110, domain_quota: 100 }));
    }
}
