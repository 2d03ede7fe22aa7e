use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ClusterId;
use crate::error::{Error, Result};

/// The top-level tenancy scope (§3). Created at startup from
/// configuration; the enabled service-type list must be a subset of
/// whatever plugins were registered into the resource registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    id: ClusterId,
    enabled_services: Vec<String>,
    max_burst_multiplier: f64,
}

impl Cluster {
    pub fn new(id: ClusterId, enabled_services: Vec<String>, max_burst_multiplier: f64) -> Result<Self> {
        if max_burst_multiplier < 0.0 {
            return Err(Error::ConfigInvalid(format!(
                "cluster {id} has a negative bursting multiplier: {max_burst_multiplier}"
            )));
        }
        Ok(Self { id, enabled_services, max_burst_multiplier })
    }

    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    pub fn enabled_services(&self) -> &[String] {
        &self.enabled_services
    }

    pub fn has_service(&self, service_type: &str) -> bool {
        self.enabled_services.iter().any(|s| s == service_type)
    }

    pub fn max_burst_multiplier(&self) -> f64 {
        self.max_burst_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_burst_multiplier() {
        let id = ClusterId::new("eu-west-1").unwrap();
        assert!(Cluster::new(id, vec![], -0.1).is_err());
    }

    #[test]
    fn has_service_checks_enabled_list() {
        let id = ClusterId::new("eu-west-1").unwrap();
        let cluster = Cluster::new(id, vec!["compute".into()], 0.2).unwrap();
        assert!(cluster.has_service("compute"));
        assert!(!cluster.has_service("storage"));
    }
}
