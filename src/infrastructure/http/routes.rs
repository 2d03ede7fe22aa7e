use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::dto::{QuotaChangeRequest, QuotaChangeResponse, ReportFilter, ResourceOutcome};
use crate::application::use_cases::{
    ChangeQuotaRequest as UseCaseChangeQuotaRequest, ChangeQuotaUseCase, InconsistencyDetector, ReportBuilder,
};
use crate::domain::entities::ChangeScope;
use crate::domain::value_objects::ClusterId;
use crate::error::{Error, Result};
use crate::infrastructure::http::middleware::AuthenticatedUser;
use crate::infrastructure::http::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/clusters/:cluster/domains/:domain_id", put(change_domain_quota))
        .route("/v1/clusters/:cluster/domains/:domain_id", get(domain_report))
        .route(
            "/v1/clusters/:cluster/domains/:domain_id/projects/:project_id",
            post(change_project_quota),
        )
        .route(
            "/v1/clusters/:cluster/domains/:domain_id/projects/:project_id",
            put(change_project_quota),
        )
        .route(
            "/v1/clusters/:cluster/domains/:domain_id/projects/:project_id",
            get(project_report),
        )
        .route("/v1/clusters/:cluster/inconsistencies", get(inconsistencies))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let cluster_count = state.clusters.len();
    Json(serde_json::json!({ "status": "ok", "clusters": cluster_count }))
}

fn resolve_cluster_id(raw: &str) -> Result<ClusterId> {
    ClusterId::new(raw)
}

async fn change_project_quota(
    State(state): State<AppState>,
    AuthenticatedUser(token): AuthenticatedUser,
    Path((cluster, domain_id, project_id)): Path<(String, Uuid, Uuid)>,
    Json(body): Json<QuotaChangeRequest>,
) -> Result<impl IntoResponse> {
    let cluster_id = resolve_cluster_id(&cluster)?;
    let ctx = state
        .cluster(&cluster_id)
        .ok_or_else(|| Error::NotFound(format!("cluster {cluster}")))?;

    let mut outcomes = Vec::new();
    for service in body.services {
        for resource in service.resources {
            let use_case = ChangeQuotaUseCase {
                cluster: &ctx.cluster,
                registry: &ctx.registry,
                constraints: &state.constraints,
                repo: state.repo.as_ref(),
                audit: &state.audit,
                observer_id: state.observer_id,
            };
            let requested_value = match &resource.unit {
                Some(unit) => format!("{} {}", resource.quota, unit),
                None => resource.quota.to_string(),
            };
            let req = UseCaseChangeQuotaRequest {
                scope: ChangeScope::Project { domain_uuid: domain_id, project_uuid: project_id },
                service_type: service.service_type.clone(),
                resource_name: resource.name.clone(),
                requested_value,
                token: token.clone(),
                request_path: format!("/v1/clusters/{cluster}/domains/{domain_id}/projects/{project_id}"),
                remote_address: String::new(),
                user_agent: String::new(),
            };
            match use_case.execute(req).await {
                Ok(outcome) => outcomes.push(ResourceOutcome {
                    service_type: service.service_type.clone(),
                    resource_name: resource.name.clone(),
                    old_quota: outcome.old_quota,
                    new_quota: outcome.new_quota,
                    accepted: true,
                    reject_reason: None,
                }),
                Err(e) => outcomes.push(ResourceOutcome {
                    service_type: service.service_type.clone(),
                    resource_name: resource.name.clone(),
                    old_quota: resource.quota,
                    new_quota: resource.quota,
                    accepted: false,
                    reject_reason: Some(e.to_string()),
                }),
            }
        }
    }

    let response = QuotaChangeResponse { outcomes };
    let status = if response.all_accepted() {
        StatusCode::OK
    } else if response.any_accepted() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(response)))
}

async fn change_domain_quota(
    State(state): State<AppState>,
    AuthenticatedUser(token): AuthenticatedUser,
    Path((cluster, domain_id)): Path<(String, Uuid)>,
    Json(body): Json<QuotaChangeRequest>,
) -> Result<impl IntoResponse> {
    let cluster_id = resolve_cluster_id(&cluster)?;
    let ctx = state
        .cluster(&cluster_id)
        .ok_or_else(|| Error::NotFound(format!("cluster {cluster}")))?;

    let mut outcomes = Vec::new();
    for service in body.services {
        for resource in service.resources {
            let use_case = ChangeQuotaUseCase {
                cluster: &ctx.cluster,
                registry: &ctx.registry,
                constraints: &state.constraints,
                repo: state.repo.as_ref(),
                audit: &state.audit,
                observer_id: state.observer_id,
            };
            let requested_value = match &resource.unit {
                Some(unit) => format!("{} {}", resource.quota, unit),
                None => resource.quota.to_string(),
            };
            let req = UseCaseChangeQuotaRequest {
                scope: ChangeScope::Domain(domain_id),
                service_type: service.service_type.clone(),
                resource_name: resource.name.clone(),
                requested_value,
                token: token.clone(),
                request_path: format!("/v1/clusters/{cluster}/domains/{domain_id}"),
                remote_address: String::new(),
                user_agent: String::new(),
            };
            match use_case.execute(req).await {
                Ok(outcome) => outcomes.push(ResourceOutcome {
                    service_type: service.service_type.clone(),
                    resource_name: resource.name.clone(),
                    old_quota: outcome.old_quota,
                    new_quota: outcome.new_quota,
                    accepted: true,
                    reject_reason: None,
                }),
                Err(e) => outcomes.push(ResourceOutcome {
                    service_type: service.service_type.clone(),
                    resource_name: resource.name.clone(),
                    old_quota: resource.quota,
                    new_quota: resource.quota,
                    accepted: false,
                    reject_reason: Some(e.to_string()),
                }),
            }
        }
    }

    let response = QuotaChangeResponse { outcomes };
    let status = if response.all_accepted() { StatusCode::OK } else if response.any_accepted() { StatusCode::ACCEPTED } else { StatusCode::CONFLICT };
    Ok((status, Json(response)))
}

async fn project_report(
    State(state): State<AppState>,
    Path((cluster, _domain_id, project_id)): Path<(String, Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let cluster_id = resolve_cluster_id(&cluster)?;
    let ctx = state
        .cluster(&cluster_id)
        .ok_or_else(|| Error::NotFound(format!("cluster {cluster}")))?;
    let builder = ReportBuilder { cluster: &ctx.cluster, registry: &ctx.registry, repo: state.repo.as_ref() };
    let report = builder.project_report(project_id, &ReportFilter::default()).await?;
    Ok(Json(report))
}

async fn domain_report(
    State(state): State<AppState>,
    Path((cluster, domain_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    let cluster_id = resolve_cluster_id(&cluster)?;
    let ctx = state
        .cluster(&cluster_id)
        .ok_or_else(|| Error::NotFound(format!("cluster {cluster}")))?;
    let builder = ReportBuilder { cluster: &ctx.cluster, registry: &ctx.registry, repo: state.repo.as_ref() };
    let report = builder.domain_report(domain_id, &ReportFilter::default()).await?;
    Ok(Json(report))
}

async fn inconsistencies(
    State(state): State<AppState>,
    Path(cluster): Path<String>,
) -> Result<impl IntoResponse> {
    let cluster_id = resolve_cluster_id(&cluster)?;
    let ctx = state
        .cluster(&cluster_id)
        .ok_or_else(|| Error::NotFound(format!("cluster {cluster}")))?;
    let detector = InconsistencyDetector { cluster: &ctx.cluster, registry: &ctx.registry, repo: state.repo.as_ref() };
    let report = detector.run().await?;
    Ok(Json(report))
}
