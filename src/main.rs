use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quota_ledger::config::Config;
use quota_ledger::domain::entities::Cluster;
use quota_ledger::domain::services::{ConstraintCompiler, ConstraintStore, ResourceRegistryBuilder, Scope};
use quota_ledger::domain::value_objects::{ClusterId, ResourceRef};
use quota_ledger::infrastructure::http::state::{AppState, ClusterContext};
use quota_ledger::infrastructure::identity::StubIdentityService;
use quota_ledger::infrastructure::messaging::{AuditSink, KafkaPublisher};
use quota_ledger::infrastructure::persistence::InMemoryAggregationRepository;
use quota_ledger::infrastructure::plugins::NoopPlugin;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load(std::env::var("QUOTA_LEDGER_CONFIG").ok().map(Into::into))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quota_ledger=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("quota-ledger starting");

    let repo: Arc<dyn quota_ledger::domain::repositories::AggregationRepository> =
        Arc::new(InMemoryAggregationRepository::new());
    let constraints = Arc::new(ConstraintStore::new());
    let audit = Arc::new(AuditSink::new());
    let identity = Arc::new(StubIdentityService::new());
    let observer_id = Uuid::new_v4();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut clusters = Vec::new();
    for cluster_config in &config.clusters {
        let cluster_id = ClusterId::new(&cluster_config.id)?;
        let enabled_services: Vec<String> = cluster_config.services.iter().map(|s| s.service_type.clone()).collect();
        let cluster = Cluster::new(cluster_id.clone(), enabled_services, cluster_config.max_burst_multiplier)?;

        let mut builder = ResourceRegistryBuilder::new();
        for service in &cluster_config.services {
            // A real deployment plugs in the backend-specific plugin
            // here; absent one, resources are tracked with no backend
            // call and never reject.
            builder = builder.register_plugin(Arc::new(NoopPlugin::new(
                service.service_type.clone(),
                service.area.clone(),
                Vec::new(),
            )))?;
        }
        for behavior in &cluster_config.resource_behavior {
            builder = builder.with_behavior(
                behavior.service_type.clone(),
                behavior.resource_name.clone(),
                quota_ledger::domain::services::ResourceBehavior {
                    overcommit_factor: behavior.overcommit_factor,
                    scaling_factor: behavior.scaling_factor,
                    max_burst_multiplier: behavior.max_burst_multiplier,
                },
            );
        }
        let registry = builder.build();

        if let Some(path) = &cluster_config.constraint_file {
            load_constraints(&cluster_id, path, &constraints)?;
        }

        audit.register_cluster(
            cluster_id.clone(),
            config.message_bus.queue_name.clone(),
            Arc::new(KafkaPublisher::new(&config.message_bus.bootstrap_servers)?),
            shutdown_rx.clone(),
        );

        clusters.push(Arc::new(ClusterContext { cluster, registry }));
        tracing::info!(cluster = %cluster_id, "cluster initialized");
    }

    let state = AppState {
        clusters: Arc::new(clusters),
        repo,
        constraints,
        audit,
        identity,
        observer_id,
    };

    let app = quota_ledger::infrastructure::http::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}

/// Parses a cluster's constraint document (one declarative expression
/// per scope/resource line, `scope\tservice/resource\texpr`) and installs
/// the compiled result into the shared store (§4.C, §4.I).
fn load_constraints(cluster_id: &ClusterId, path: &std::path::Path, store: &ConstraintStore) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(3, '\t');
        let (scope_str, resource_str, expr) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                tracing::warn!(cluster = %cluster_id, line = lineno, "malformed constraint line, skipping");
                continue;
            }
        };
        let scope = match scope_str.split_once(':') {
            Some(("domain", uuid)) => Scope::Domain(uuid.parse()?),
            Some(("project", uuid)) => Scope::Project(uuid.parse()?),
            _ => {
                tracing::warn!(cluster = %cluster_id, line = lineno, "unknown scope, skipping");
                continue;
            }
        };
        let (service_type, resource_name) = resource_str
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("malformed resource reference at line {lineno}: {resource_str}"))?;
        let resource = ResourceRef::new(service_type, resource_name);
        let outcome = ConstraintCompiler::compile(quota_ledger::domain::value_objects::Unit::None, expr);
        for e in &outcome.errors {
            tracing::warn!(cluster = %cluster_id, line = lineno, error = %e, "constraint compile error");
        }
        entries.push((scope, resource, outcome.constraint));
    }
    store.reload_cluster(cluster_id, entries);
    Ok(())
}
