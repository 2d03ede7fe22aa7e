use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::value_objects::ClusterId;

/// (cluster, domain, uuid, name, parent uuid, bursting flag) (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub cluster: ClusterId,
    pub domain_uuid: Uuid,
    pub uuid: Uuid,
    pub name: String,
    pub parent_uuid: Option<Uuid>,
    pub has_bursting: bool,
}

impl Project {
    pub fn new(
        cluster: ClusterId,
        domain_uuid: Uuid,
        uuid: Uuid,
        name: impl Into<String>,
        parent_uuid: Option<Uuid>,
        has_bursting: bool,
    ) -> Self {
        Self {
            cluster,
            domain_uuid,
            uuid,
            name: name.into(),
            parent_uuid,
            has_bursting,
        }
    }
}

/// A (service-type, resource-name, quota, usage, backend_quota, …) row
/// owned by a [`ProjectService`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectResource {
    pub service_type: String,
    pub resource_name: String,
    pub quota: u64,
    pub backend_quota: u64,
    pub usage: u64,
    pub physical_usage: Option<u64>,
    pub subresources: Option<Value>,
}

impl ProjectResource {
    pub fn new(service_type: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            resource_name: resource_name.into(),
            quota: 0,
            backend_quota: 0,
            usage: 0,
            physical_usage: None,
            subresources: None,
        }
    }

    /// Invariant 2 (§3): usage must stay within quota, unless bursting
    /// explicitly allows `usage ≤ (1+m)·quota`.
    pub fn is_overspent(&self, bursting_multiplier: Option<f64>) -> bool {
        let allowed = match bursting_multiplier {
            Some(m) if m > 0.0 => ((self.quota as f64) * (1.0 + m)).floor() as u64,
            _ => self.quota,
        };
        self.usage > allowed
    }

    /// Invariant 3 (§3): once the backend has ack'd, `quota ==
    /// backend_quota`.
    pub fn is_backend_mismatched(&self) -> bool {
        self.quota != self.backend_quota
    }
}

/// Carries `scraped_at`, `rates_scraped_at`, and a `scrape_error_message`
/// for one (project, service-type) pair; owns the [`ProjectResource`]
/// rows for that service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectService {
    pub service_type: String,
    pub scraped_at: Option<DateTime<Utc>>,
    pub rates_scraped_at: Option<DateTime<Utc>>,
    pub scrape_error_message: Option<String>,
}

impl ProjectService {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            scraped_at: None,
            rates_scraped_at: None,
            scrape_error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overspent_without_bursting() {
        let mut r = ProjectResource::new("compute", "cores");
        r.quota = 10;
        r.usage = 11;
        assert!(r.is_overspent(None));
        r.usage = 10;
        assert!(!r.is_overspent(None));
    }

    #[test]
    fn overspent_with_bursting_allowance() {
        let mut r = ProjectResource::new("compute", "cores");
        r.quota = 10;
        r.usage = 15;
        assert!(!r.is_overspent(Some(0.6)));
        r.usage = 17;
        assert!(r.is_overspent(Some(0.6)));
    }

    #[test]
    fn backend_mismatch_detection() {
        let mut r = ProjectResource::new("compute", "cores");
        r.quota = 10;
        r.backend_quota = 10;
        assert!(!r.is_backend_mismatched());
        r.backend_quota = 8;
        assert!(r.is_backend_mismatched());
    }
}
