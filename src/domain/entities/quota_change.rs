use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::TokenContext;
use crate::domain::value_objects::{ClusterId, Unit};

/// Which level of the hierarchy a change was requested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    Domain(Uuid),
    Project { domain_uuid: Uuid, project_uuid: Uuid },
}

/// A transient record of one quota-change request, constructed at the
/// end of the pipeline (§4.G) to build the audit event. Never persisted
/// itself — only its effect on the aggregation store is.
#[derive(Debug, Clone)]
pub struct QuotaChange {
    pub who: TokenContext,
    pub when: DateTime<Utc>,
    pub cluster: ClusterId,
    pub scope: ChangeScope,
    pub service_type: String,
    pub resource_name: String,
    pub old_quota: u64,
    pub new_quota: u64,
    pub unit: Unit,
    pub reject_reason: Option<String>,
}

impl QuotaChange {
    pub fn is_success(&self) -> bool {
        self.reject_reason.is_none()
    }
}
