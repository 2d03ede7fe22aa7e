use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ClusterId;
use crate::error::Result;

/// A discovered domain or project, as reported by the identity service
/// during a discovery/refresh pass (§4.I).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDomain {
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProject {
    pub uuid: Uuid,
    pub name: String,
    pub parent_uuid: Option<Uuid>,
    pub has_bursting: bool,
}

/// The initiator context extracted from an already-validated token.
/// Token validation itself is the identity service's job; this crate
/// only consumes the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenContext {
    pub user_id: String,
    pub user_name: String,
    pub domain_id: String,
    pub domain_name: String,
    pub project_id: Option<String>,
    pub is_privileged: bool,
}

/// External collaborator: domain/project discovery and token
/// validation. Token refresh must be serialized under a mutex by the
/// implementation; callers retry once after a `401`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn list_domains(&self, cluster: &ClusterId) -> Result<Vec<DiscoveredDomain>>;

    async fn list_projects(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
    ) -> Result<Vec<DiscoveredProject>>;
}
