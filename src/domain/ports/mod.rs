pub mod identity_service;
pub mod message_bus;
pub mod plugin;

pub use identity_service::{DiscoveredDomain, DiscoveredProject, IdentityService, TokenContext};
pub use message_bus::MessageBusPublisher;
pub use plugin::{ProjectRef, QuotaPlugin, ResourceMetadata, ScrapedResource};
