use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::value_objects::{ClusterId, Unit};
use crate::error::Result;

/// Identifies a project a plugin is asked to act on or scrape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub cluster: ClusterId,
    pub domain_uuid: Uuid,
    pub project_uuid: Uuid,
}

/// Static metadata for one resource exposed by a service (§3, §4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    pub unit: Unit,
    pub category: Option<String>,
    pub no_quota: bool,
    pub externally_managed: bool,
    pub auto_approve_initial_quota: bool,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            unit,
            category: None,
            no_quota: false,
            externally_managed: false,
            auto_approve_initial_quota: false,
        }
    }
}

/// A single resource's scraped state, as returned by [`QuotaPlugin::scrape`].
#[derive(Debug, Clone, Default)]
pub struct ScrapedResource {
    pub quota: u64,
    pub usage: u64,
    pub physical_usage: Option<u64>,
    pub subresources: Option<serde_json::Value>,
}

/// The small interface a backend service (compute, storage, networking,
/// …) must honor. Implementations are external collaborators; this
/// crate only depends on the trait.
///
/// Per the required re-architecture (no cyclic references between
/// cluster/plugin/driver): plugins receive a read-only resource-registry
/// handle and an identity-service handle as explicit parameters to the
/// calls that need them, never stored on `self`.
#[async_trait]
pub trait QuotaPlugin: Send + Sync {
    /// Short identifier for the service this plugin backs, e.g. `compute`.
    fn service_type(&self) -> &str;

    /// Broad category the service belongs to, e.g. `compute`, `storage`.
    fn area(&self) -> &str;

    /// The ordered list of resources this service exposes.
    fn resources(&self) -> Vec<ResourceMetadata>;

    /// Reads current quota/usage for one project from the backend.
    async fn scrape(&self, project: &ProjectRef) -> Result<HashMap<String, ScrapedResource>>;

    /// Applies a new quota map to the backend. Returns an optional
    /// adjusted map when the backend rounds or rejects individual
    /// values without failing the whole call.
    async fn set_quota(
        &self,
        project: &ProjectRef,
        quotas: &HashMap<String, u64>,
    ) -> Result<Option<HashMap<String, u64>>>;

    /// Optional pre-flight check; default implementation always accepts.
    async fn is_quota_acceptable_for_project(
        &self,
        project: &ProjectRef,
        quotas: &HashMap<String, u64>,
    ) -> Result<()> {
        let _ = (project, quotas);
        Ok(())
    }
}
