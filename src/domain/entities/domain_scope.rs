use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ClusterId;

/// (cluster, uuid, name) identity row; owns [`DomainResource`] rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Domain {
    pub cluster: ClusterId,
    pub uuid: Uuid,
    pub name: String,
}

impl Domain {
    pub fn new(cluster: ClusterId, uuid: Uuid, name: impl Into<String>) -> Self {
        Self { cluster, uuid, name: name.into() }
    }
}

/// A (service-type, resource-name, quota) row owned by a [`Domain`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainResource {
    pub service_type: String,
    pub resource_name: String,
    pub quota: u64,
}

impl DomainResource {
    pub fn new(service_type: impl Into<String>, resource_name: impl Into<String>, quota: u64) -> Self {
        Self {
            service_type: service_type.into(),
            resource_name: resource_name.into(),
            quota,
        }
    }
}
