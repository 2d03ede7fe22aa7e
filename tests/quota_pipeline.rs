use std::sync::Arc;
use uuid::Uuid;

use quota_ledger::application::dto::ReportFilter;
use quota_ledger::application::use_cases::{
    ChangeQuotaRequest, ChangeQuotaUseCase, InconsistencyDetector, ReportBuilder,
};
use quota_ledger::domain::entities::{ChangeScope, Cluster, Domain, DomainResource, Project};
use quota_ledger::domain::ports::TokenContext;
use quota_ledger::domain::repositories::AggregationRepository;
use quota_ledger::domain::services::{ConstraintStore, ResourceRegistryBuilder};
use quota_ledger::domain::value_objects::ClusterId;
use quota_ledger::infrastructure::messaging::AuditSink;
use quota_ledger::infrastructure::persistence::InMemoryAggregationRepository;
use quota_ledger::infrastructure::plugins::NoopPlugin;

fn token() -> TokenContext {
    TokenContext {
        user_id: "operator".into(),
        user_name: "operator".into(),
        domain_id: "eng".into(),
        domain_name: "eng".into(),
        project_id: None,
        is_privileged: false,
    }
}

#[tokio::test]
async fn end_to_end_quota_change_is_visible_in_reports_and_converges_cleanly() {
    let cluster_id = ClusterId::new("eu-west-1").unwrap();
    let cluster = Cluster::new(cluster_id.clone(), vec!["compute".into()], 0.2).unwrap();
    let registry = ResourceRegistryBuilder::new()
        .register_plugin(Arc::new(NoopPlugin::countable("compute", "compute", &["cores"])))
        .unwrap()
        .build();
    let constraints = ConstraintStore::new();
    let repo = InMemoryAggregationRepository::new();
    let audit = AuditSink::new();

    let domain_uuid = Uuid::new_v4();
    let project_uuid = Uuid::new_v4();
    repo.upsert_domain(&Domain::new(cluster_id.clone(), domain_uuid, "engineering")).await.unwrap();
    repo.upsert_domain_resource(&cluster_id, domain_uuid, &DomainResource::new("compute", "cores", 1000))
        .await
        .unwrap();
    repo.upsert_project(&Project::new(cluster_id.clone(), domain_uuid, project_uuid, "checkout", None, false))
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
    let outcome = use_case
        .execute(ChangeQuotaRequest {
            scope: ChangeScope::Project { domain_uuid, project_uuid },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            requested_value: "64".into(),
            token: token(),
            request_path: "/v1/clusters/eu-west-1/domains/x/projects/y".into(),
            remote_address: "10.0.0.1".into(),
            user_agent: "integration-test".into(),
        })
        .await
        .unwrap();
    assert_eq!(outcome.old_quota, 0);
    assert_eq!(outcome.new_quota, 64);

    let builder = ReportBuilder { cluster: &cluster, registry: &registry, repo: &repo };
    let project_report = builder.project_report(project_uuid, &ReportFilter::default()).await.unwrap();
    let compute = project_report.services.iter().find(|s| s.service_type == "compute").unwrap();
    let cores = compute.resources.iter().find(|r| r.resource_name == "cores").unwrap();
    assert_eq!(cores.quota, 64);
    assert_eq!(cores.backend_quota, 64);

    let detector = InconsistencyDetector { cluster: &cluster, registry: &registry, repo: &repo };
    let findings = detector.run().await.unwrap();
    assert!(findings.overcommitted_domain_quota.is_empty());
    assert!(findings.backend_mismatch.is_empty());
    assert!(findings.overspent_project_quota.is_empty());
}

#[tokio::test]
async fn overcommitted_domain_quota_is_detected() {
    let cluster_id = ClusterId::new("eu-west-1").unwrap();
    let cluster = Cluster::new(cluster_id.clone(), vec!["compute".into()], 0.0).unwrap();
    let registry = ResourceRegistryBuilder::new()
        .register_plugin(Arc::new(NoopPlugin::countable("compute", "compute", &["cores"])))
        .unwrap()
        .build();
    let repo = InMemoryAggregationRepository::new();

    let domain_uuid = Uuid::new_v4();
    repo.upsert_domain(&Domain::new(cluster_id.clone(), domain_uuid, "engineering")).await.unwrap();
    repo.upsert_domain_resource(&cluster_id, domain_uuid, &DomainResource::new("compute", "cores", 10))
        .await
        .unwrap();

    for name in ["checkout", "billing"] {
        let project_uuid = Uuid::new_v4();
        repo.upsert_project(&Project::new(cluster_id.clone(), domain_uuid, project_uuid, name, None, false))
            .await
            .unwrap();
        repo.set_project_resource_quota(&cluster_id, project_uuid, "compute", "cores", 8, 8)
            .await
            .unwrap();
    }

    let detector = InconsistencyDetector { cluster: &cluster, registry: &registry, repo: &repo };
    let findings = detector.run().await.unwrap();
    assert_eq!(findings.overcommitted_domain_quota.len(), 1);
    let finding = &findings.overcommitted_domain_quota[0];
    assert_eq!(finding.domain_quota, 10);
    assert_eq!(finding.projects_quota, 16);
}
