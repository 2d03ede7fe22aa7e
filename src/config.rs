//! Configuration loading and validation (§6).
//!
//! A YAML document enumerating clusters, each with auth, enabled
//! services, capacitors, subresources/subcapacities to collect, a
//! constraint file path, a bursting max multiplier, and resource
//! behavior overrides. Shaped after the teacher's `config.rs`
//! (`from_file`/`from_env`/`load`/`validate`/`example`), with
//! `serde_yaml` standing in for the teacher's `toml` since this
//! system's external contract is YAML (§9 decision 3).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub message_bus: MessageBusConfig,
    pub clusters: Vec<ClusterConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
            message_bus: MessageBusConfig::default(),
            clusters: vec![ClusterConfig::default()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// `LIMES_SILENT=1` suppresses the audit-event log tap on stdout (§6).
    pub silent_audit: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: LogLevel::Info, silent_audit: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// `LIMES_DEBUG_SQL=1` enables query tracing (§6).
    pub debug_sql: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/quota_ledger".to_string(),
            debug_sql: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBusConfig {
    pub bootstrap_servers: String,
    pub queue_name: String,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            queue_name: "audit-events".to_string(),
        }
    }
}

/// Resource behavior override for one (service, resource) pair within a
/// cluster: overcommit/scaling factors and a per-resource max bursting
/// multiplier, applied over the cluster-wide default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBehaviorConfig {
    pub service_type: String,
    pub resource_name: String,
    #[serde(default = "default_factor")]
    pub overcommit_factor: f64,
    #[serde(default = "default_factor")]
    pub scaling_factor: f64,
    #[serde(default)]
    pub max_burst_multiplier: f64,
}

fn default_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_type: String,
    pub area: String,
    /// Resources to report subresource/subcapacity breakdowns for, as
    /// named in §4.E's `with_subresources`/`with_subcapacities` flags.
    #[serde(default)]
    pub subresources: Vec<String>,
    #[serde(default)]
    pub subcapacities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub id: String,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub resource_behavior: Vec<ResourceBehaviorConfig>,
    #[serde(default)]
    pub max_burst_multiplier: f64,
    /// Path to the declarative constraint document for this cluster
    /// (§4.C); `None` means no constraints are enforced beyond defaults.
    pub constraint_file: Option<PathBuf>,
    #[serde(default)]
    pub discovery_include: Option<String>,
    #[serde(default)]
    pub discovery_exclude: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            services: Vec::new(),
            resource_behavior: Vec::new(),
            max_burst_multiplier: 0.0,
            constraint_file: None,
            discovery_include: None,
            discovery_exclude: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    fn from_yaml_str(content: &str) -> Result<Self> {
        // Removed option, kept only to hard-fail with a migration hint
        // rather than being silently ignored by serde (§6).
        if content.lines().any(|l| l.trim_start().starts_with("seeds:")) {
            return Err(Error::ConfigInvalid(
                "the 'seeds' option was removed; project/domain seeding now happens exclusively through discovery (§4.I)".into(),
            ));
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `DEBUG`/`LIMES_DEBUG_SQL`/`LIMES_SILENT` overrides (§6).
    /// Unlike the cluster/service tree, these three are environment-only
    /// — there is no YAML key for them.
    pub fn apply_env_overrides(&mut self) {
        if std::env::var("DEBUG").as_deref() == Ok("1") {
            self.logging.level = LogLevel::Debug;
        }
        if std::env::var("LIMES_DEBUG_SQL").as_deref() == Ok("1") {
            self.database.debug_sql = true;
        }
        if std::env::var("LIMES_SILENT").as_deref() == Ok("1") {
            self.logging.silent_audit = true;
        }
    }

    /// Load configuration with fallback priority: file, then
    /// environment-variable overrides, then validation.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_file(path)?
            }
            None => {
                tracing::warn!("no config file given, using defaults");
                Config::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Validates required keys, collecting every violation in one pass
    /// rather than stopping at the first (§6).
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port cannot be 0".to_string());
        }
        if self.clusters.is_empty() {
            errors.push("at least one cluster must be configured".to_string());
        }
        for cluster in &self.clusters {
            if cluster.id.is_empty() {
                errors.push("cluster id cannot be empty".to_string());
            }
            if cluster.max_burst_multiplier < 0.0 {
                errors.push(format!("cluster {} has a negative max_burst_multiplier", cluster.id));
            }
            for service in &cluster.services {
                if service.service_type.is_empty() {
                    errors.push(format!("cluster {} has a service with an empty service_type", cluster.id));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigInvalid(errors.join("; ")))
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    /// Generates an example YAML document for `quota-ledger-admin config generate`.
    pub fn example() -> String {
        serde_yaml::to_string(&Config::default()).unwrap_or_else(|_| "# failed to generate example config".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn removed_seeds_option_hard_fails_with_migration_hint() {
        let yaml = "server:\n  host: 0.0.0.0\nseeds:\n  - foo\n";
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(ref msg) if msg.contains("seeds")));
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(config.clusters.len(), parsed.clusters.len());
    }
}
