//! Cluster-wide quota accounting and enforcement engine.
//!
//! Layered per Clean Architecture: `domain` holds entities, value
//! objects, ports, and repository/service traits with no I/O;
//! `application` orchestrates them into use cases; `infrastructure`
//! provides the concrete adapters (Postgres, Kafka, the identity-service
//! stub, plugins).

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Error, Result};
