use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Narrows a report query (§4.E). Unset `service_type`/`resource_name`
/// mean "all"; the `with_*` flags gate whether the heavier fields are
/// read from the store at all, not just whether they are rendered.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub service_type: Option<String>,
    pub resource_name: Option<String>,
    pub with_subresources: bool,
    pub with_subcapacities: bool,
    pub with_rates: bool,
}

impl ReportFilter {
    pub fn matches_service(&self, service_type: &str) -> bool {
        self.service_type.as_deref().map_or(true, |s| s == service_type)
    }

    pub fn matches_resource(&self, resource_name: &str) -> bool {
        self.resource_name.as_deref().map_or(true, |r| r == resource_name)
    }
}

/// One resource row within a project's service, with the derived fields
/// from §4.E folded in.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub resource_name: String,
    pub quota: u64,
    pub usable_quota: u64,
    pub usage: u64,
    pub burst_usage: u64,
    pub backend_quota: u64,
    pub physical_usage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subresources: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub service_type: String,
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates_scraped_at: Option<DateTime<Utc>>,
    pub scrape_error_message: Option<String>,
    pub resources: Vec<ResourceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub uuid: Uuid,
    pub name: String,
    pub parent_uuid: Option<Uuid>,
    pub has_bursting: bool,
    pub services: Vec<ServiceReport>,
}

/// A domain-level resource row: the configured quota handed down to
/// projects, with no usage of its own.
#[derive(Debug, Clone, Serialize)]
pub struct DomainResourceReport {
    pub service_type: String,
    pub resource_name: String,
    pub quota: u64,
    pub projects_quota: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub uuid: Uuid,
    pub name: String,
    pub resources: Vec<DomainResourceReport>,
    /// Populated only by the non-streaming builder; the streaming
    /// variant hands each project to a callback instead (§4.E).
    pub projects: Vec<ProjectReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterResourceReport {
    pub service_type: String,
    pub resource_name: String,
    pub raw_capacity: u64,
    pub capacity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_per_az: Option<HashMap<String, u64>>,
    pub scraped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub cluster: String,
    pub resources: Vec<ClusterResourceReport>,
}
