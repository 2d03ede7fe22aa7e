use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::ports::{ProjectRef, QuotaPlugin, ResourceMetadata, ScrapedResource};
use crate::domain::value_objects::Unit;
use crate::error::Result;

/// A reference plugin implementation honoring the minimal contract
/// (§6): it never rejects a quota and reports zero usage. Useful as a
/// default for services that have no real backend yet, and as a test
/// double for the quota-change pipeline.
pub struct NoopPlugin {
    service_type: String,
    area: String,
    resources: Vec<ResourceMetadata>,
}

impl NoopPlugin {
    pub fn new(service_type: impl Into<String>, area: impl Into<String>, resources: Vec<ResourceMetadata>) -> Self {
        Self { service_type: service_type.into(), area: area.into(), resources }
    }

    pub fn countable(service_type: impl Into<String>, area: impl Into<String>, resource_names: &[&str]) -> Self {
        let resources = resource_names
            .iter()
            .map(|name| ResourceMetadata::new(*name, Unit::None))
            .collect();
        Self::new(service_type, area, resources)
    }
}

#[async_trait]
impl QuotaPlugin for NoopPlugin {
    fn service_type(&self) -> &str {
        &self.service_type
    }

    fn area(&self) -> &str {
        &self.area
    }

    fn resources(&self) -> Vec<ResourceMetadata> {
        self.resources.clone()
    }

    async fn scrape(&self, _project: &ProjectRef) -> Result<HashMap<String, ScrapedResource>> {
        Ok(self
            .resources
            .iter()
            .map(|r| (r.name.clone(), ScrapedResource::default()))
            .collect())
    }

    async fn set_quota(
        &self,
        _project: &ProjectRef,
        quotas: &HashMap<String, u64>,
    ) -> Result<Option<HashMap<String, u64>>> {
        let _ = quotas;
        Ok(None)
    }
}
