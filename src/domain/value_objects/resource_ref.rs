use serde::{Deserialize, Serialize};
use std::fmt;

/// A (service-type, resource-name) pair. Cheap to copy around as the key
/// into the resource registry, constraint tables, and aggregation rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ResourceRef {
    pub service_type: String,
    pub resource_name: String,
}

impl ResourceRef {
    pub fn new(service_type: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            resource_name: resource_name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_type, self.resource_name)
    }
}
