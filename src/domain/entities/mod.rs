pub mod audit_event;
pub mod cluster;
pub mod cluster_resource;
pub mod domain_scope;
pub mod project;
pub mod quota_change;

pub use audit_event::{AuditEvent, AuditPayload, EventTarget};
pub use cluster::Cluster;
pub use cluster_resource::ClusterResource;
pub use domain_scope::{Domain, DomainResource};
pub use project::{Project, ProjectResource, ProjectService};
pub use quota_change::{ChangeScope, QuotaChange};
