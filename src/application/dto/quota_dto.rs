use serde::{Deserialize, Serialize};

/// Request body for `POST/PUT /v1/domains/{d}/projects/{p}` (§6).
#[derive(Debug, Deserialize)]
pub struct QuotaChangeRequest {
    pub services: Vec<ServiceQuotaRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceQuotaRequest {
    #[serde(rename = "type")]
    pub service_type: String,
    pub resources: Vec<ResourceQuotaRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuotaRequest {
    pub name: String,
    pub quota: u64,
    pub unit: Option<String>,
}

/// Per-resource outcome, used to build the `202 Accepted` partial-success
/// report body.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    pub service_type: String,
    pub resource_name: String,
    pub old_quota: u64,
    pub new_quota: u64,
    pub accepted: bool,
    pub reject_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct QuotaChangeResponse {
    pub outcomes: Vec<ResourceOutcome>,
}

impl QuotaChangeResponse {
    pub fn all_accepted(&self) -> bool {
        self.outcomes.iter().all(|o| o.accepted)
    }

    pub fn any_accepted(&self) -> bool {
        self.outcomes.iter().any(|o| o.accepted)
    }
}
