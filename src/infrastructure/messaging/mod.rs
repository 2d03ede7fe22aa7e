pub mod audit_sink;
pub mod kafka_publisher;

pub use audit_sink::{AuditSink, ClusterCounters};
pub use kafka_publisher::KafkaPublisher;
