use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ports::{QuotaPlugin, ResourceMetadata};
use crate::domain::value_objects::Unit;
use crate::error::{Error, Result};

/// Overcommit/scaling/bursting behavior for one (service, resource) pair
/// within a given scope.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBehavior {
    pub overcommit_factor: f64,
    pub scaling_factor: f64,
    pub max_burst_multiplier: f64,
}

impl Default for ResourceBehavior {
    fn default() -> Self {
        Self {
            overcommit_factor: 1.0,
            scaling_factor: 1.0,
            max_burst_multiplier: 0.0,
        }
    }
}

struct ServiceEntry {
    area: String,
    resources: Vec<ResourceMetadata>,
    plugin: Arc<dyn QuotaPlugin>,
}

/// Per-cluster, read-only-after-construction map from service-type to
/// its plugin and resource metadata, plus the resource-behavior table.
///
/// Built once at startup via [`ResourceRegistryBuilder`] — never looked
/// up through a process-wide singleton (required re-architecture, §9).
pub struct ResourceRegistry {
    services: HashMap<String, ServiceEntry>,
    behavior: HashMap<(String, String), ResourceBehavior>,
}

impl ResourceRegistry {
    pub fn has_service(&self, service_type: &str) -> bool {
        self.services.contains_key(service_type)
    }

    pub fn has_resource(&self, service_type: &str, resource_name: &str) -> bool {
        self.services
            .get(service_type)
            .map(|e| e.resources.iter().any(|r| r.name == resource_name))
            .unwrap_or(false)
    }

    /// Returns a zero value (`unit = none`) when the service is unknown,
    /// never an error — callers decide whether that is fatal.
    pub fn info_for_resource(&self, service_type: &str, resource_name: &str) -> ResourceMetadata {
        self.services
            .get(service_type)
            .and_then(|e| e.resources.iter().find(|r| r.name == resource_name).cloned())
            .unwrap_or_else(|| ResourceMetadata::new(resource_name, Unit::None))
    }

    pub fn area_for_service(&self, service_type: &str) -> Option<&str> {
        self.services.get(service_type).map(|e| e.area.as_str())
    }

    pub fn plugin_for_service(&self, service_type: &str) -> Option<Arc<dyn QuotaPlugin>> {
        self.services.get(service_type).map(|e| e.plugin.clone())
    }

    pub fn behavior_for_resource(&self, service_type: &str, resource_name: &str) -> ResourceBehavior {
        self.behavior
            .get(&(service_type.to_string(), resource_name.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn service_types(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(|s| s.as_str())
    }
}

/// Construction-time registry. Plugins register by providing themselves
/// (a factory's output) plus their declared resources; a second
/// registration for the same service type is a fatal startup error.
#[derive(Default)]
pub struct ResourceRegistryBuilder {
    services: HashMap<String, ServiceEntry>,
    behavior: HashMap<(String, String), ResourceBehavior>,
}

impl ResourceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_plugin(mut self, plugin: Arc<dyn QuotaPlugin>) -> Result<Self> {
        let service_type = plugin.service_type().to_string();
        if self.services.contains_key(&service_type) {
            return Err(Error::ConfigInvalid(format!(
                "duplicate plugin registration for service type {service_type:?}"
            )));
        }
        let entry = ServiceEntry {
            area: plugin.area().to_string(),
            resources: plugin.resources(),
            plugin,
        };
        self.services.insert(service_type, entry);
        Ok(self)
    }

    pub fn with_behavior(
        mut self,
        service_type: impl Into<String>,
        resource_name: impl Into<String>,
        behavior: ResourceBehavior,
    ) -> Self {
        self.behavior
            .insert((service_type.into(), resource_name.into()), behavior);
        self
    }

    pub fn build(self) -> ResourceRegistry {
        ResourceRegistry {
            services: self.services,
            behavior: self.behavior,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ProjectRef, ScrapedResource};
    use async_trait::async_trait;
    use std::collections::HashMap as Map;

    struct StubPlugin(&'static str);

    #[async_trait]
    impl QuotaPlugin for StubPlugin {
        fn service_type(&self) -> &str {
            self.0
        }
        fn area(&self) -> &str {
            "compute"
        }
        fn resources(&self) -> Vec<ResourceMetadata> {
            vec![ResourceMetadata::new("cores", Unit::None)]
        }
        async fn scrape(&self, _project: &ProjectRef) -> Result<Map<String, ScrapedResource>> {
            Ok(Map::new())
        }
        async fn set_quota(
            &self,
            _project: &ProjectRef,
            _quotas: &Map<String, u64>,
        ) -> Result<Option<Map<String, u64>>> {
            Ok(None)
        }
    }

    #[test]
    fn unknown_resource_returns_zero_value_not_error() {
        let registry = ResourceRegistryBuilder::new().build();
        let info = registry.info_for_resource("compute", "cores");
        assert_eq!(info.unit, Unit::None);
        assert!(!registry.has_service("compute"));
    }

    #[test]
    fn duplicate_plugin_registration_is_fatal() {
        let builder = ResourceRegistryBuilder::new()
            .register_plugin(Arc::new(StubPlugin("compute")))
            .unwrap();
        let err = builder.register_plugin(Arc::new(StubPlugin("compute"))).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn registered_plugin_resources_are_visible() {
        let registry = ResourceRegistryBuilder::new()
            .register_plugin(Arc::new(StubPlugin("compute")))
            .unwrap()
            .build();
        assert!(registry.has_service("compute"));
        assert!(registry.has_resource("compute", "cores"));
        assert!(!registry.has_resource("compute", "ram"));
    }
}
