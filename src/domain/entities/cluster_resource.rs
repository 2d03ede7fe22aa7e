use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw scraped capacity for one (service-type, resource-name) pair at
/// cluster scope, with an optional per-availability-zone breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterResource {
    pub service_type: String,
    pub resource_name: String,
    pub capacity: u64,
    pub capacity_per_az: Option<HashMap<String, u64>>,
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ClusterResource {
    pub fn new(service_type: impl Into<String>, resource_name: impl Into<String>, capacity: u64) -> Self {
        Self {
            service_type: service_type.into(),
            resource_name: resource_name.into(),
            capacity,
            capacity_per_az: None,
            scraped_at: None,
        }
    }

    /// `capacity = raw_capacity × overcommit_factor` (§4.E); the raw
    /// value is preserved on `self.capacity`.
    pub fn effective_capacity(&self, overcommit_factor: f64) -> u64 {
        ((self.capacity as f64) * overcommit_factor).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_capacity_applies_overcommit() {
        let r = ClusterResource::new("compute", "cores", 100);
        assert_eq!(r.effective_capacity(1.0), 100);
        assert_eq!(r.effective_capacity(1.5), 150);
    }
}
