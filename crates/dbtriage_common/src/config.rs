//! dbtriage configuration
//!
//! Optional TOML file. Every field has a default, so an empty or partial file
//! is valid. Lookup order:
//! 1. `--config PATH` (must exist)
//! 2. `$XDG_CONFIG_HOME/dbtriage/config.toml` (or `~/.config/...`), if present
//! 3. built-in defaults

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::TriageError;

const CONFIG_DIR: &str = "dbtriage";
const CONFIG_FILE: &str = "config.toml";

/// Longest certificate warning window accepted, in days
const MAX_CERTIFICATE_WARNING_DAYS: i64 = 3650;

/// Rule trigger thresholds.
///
/// The values carry no documented tuning rationale; they are kept
/// configurable instead of being re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Volume usage above this percentage is a HIGH disk exhaustion signal
    #[serde(default = "default_storage_high")]
    pub storage_high_percent: u8,

    /// Volume usage above this percentage escalates to CRITICAL
    #[serde(default = "default_storage_critical")]
    pub storage_critical_percent: u8,

    /// Replica lag above this many seconds is reported
    #[serde(default = "default_replication_lag")]
    pub replication_lag_seconds: u64,

    /// Certificates expiring within this many days are reported
    #[serde(default = "default_certificate_warning_days")]
    pub certificate_warning_days: i64,
}

fn default_storage_high() -> u8 {
    85
}

fn default_storage_critical() -> u8 {
    95
}

fn default_replication_lag() -> u64 {
    300
}

fn default_certificate_warning_days() -> i64 {
    30
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            storage_high_percent: default_storage_high(),
            storage_critical_percent: default_storage_critical(),
            replication_lag_seconds: default_replication_lag(),
            certificate_warning_days: default_certificate_warning_days(),
        }
    }
}

impl Thresholds {
    /// Reject values that parse but cannot be evaluated.
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_high_percent > 100 || self.storage_critical_percent > 100 {
            return Err(format!(
                "storage thresholds must be percentages, got high {} and critical {}",
                self.storage_high_percent, self.storage_critical_percent
            ));
        }
        if self.storage_high_percent > self.storage_critical_percent {
            return Err(format!(
                "storage_high_percent ({}) is above storage_critical_percent ({})",
                self.storage_high_percent, self.storage_critical_percent
            ));
        }
        if !(0..=MAX_CERTIFICATE_WARNING_DAYS).contains(&self.certificate_warning_days) {
            return Err(format!(
                "certificate_warning_days must be between 0 and {}, got {}",
                MAX_CERTIFICATE_WARNING_DAYS, self.certificate_warning_days
            ));
        }
        Ok(())
    }
}

/// Per-probe timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_query_secs")]
    pub query_secs: u64,

    #[serde(default = "default_dns_secs")]
    pub dns_secs: u64,
}

fn default_query_secs() -> u64 {
    30
}

fn default_dns_secs() -> u64 {
    15
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query_secs: default_query_secs(),
            dns_secs: default_dns_secs(),
        }
    }
}

impl Timeouts {
    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs.max(1))
    }

    pub fn dns(&self) -> Duration {
        Duration::from_secs(self.dns_secs.max(1))
    }
}

/// Control-plane client flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterCli {
    #[default]
    Kubectl,
    Oc,
}

impl ClusterCli {
    pub fn binary(&self) -> &'static str {
        match self {
            ClusterCli::Kubectl => "kubectl",
            ClusterCli::Oc => "oc",
        }
    }
}

/// Where the probes look inside the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    #[serde(default)]
    pub cli: ClusterCli,

    /// Container running the database server inside each unit
    #[serde(default = "default_database_container")]
    pub database_container: String,

    /// Mount point of the data volume inside the database container
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Label selector for database pods; derived from the cluster name when unset
    #[serde(default)]
    pub pod_selector: Option<String>,

    #[serde(default = "default_cluster_resource")]
    pub cluster_resource: String,

    #[serde(default = "default_backup_resource")]
    pub backup_resource: String,

    #[serde(default = "default_certificate_resource")]
    pub certificate_resource: String,

    #[serde(default = "default_operator_selector")]
    pub operator_selector: String,

    /// Client-facing service; the cluster name when unset
    #[serde(default)]
    pub service_name: Option<String>,

    /// Name resolved from inside a database pod to check cluster DNS
    #[serde(default = "default_dns_probe_name")]
    pub dns_probe_name: String,
}

fn default_database_container() -> String {
    "mariadb".to_string()
}

fn default_data_dir() -> String {
    "/var/lib/mysql".to_string()
}

fn default_cluster_resource() -> String {
    "mariadbs.k8s.mariadb.com".to_string()
}

fn default_backup_resource() -> String {
    "backups.k8s.mariadb.com".to_string()
}

fn default_certificate_resource() -> String {
    "certificates.cert-manager.io".to_string()
}

fn default_operator_selector() -> String {
    "app.kubernetes.io/name=mariadb-operator".to_string()
}

fn default_dns_probe_name() -> String {
    "kubernetes.default.svc.cluster.local".to_string()
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            cli: ClusterCli::default(),
            database_container: default_database_container(),
            data_dir: default_data_dir(),
            pod_selector: None,
            cluster_resource: default_cluster_resource(),
            backup_resource: default_backup_resource(),
            certificate_resource: default_certificate_resource(),
            operator_selector: default_operator_selector(),
            service_name: None,
            dns_probe_name: default_dns_probe_name(),
        }
    }
}

impl ClusterSettings {
    /// Label selector for the database pods of `cluster`.
    pub fn pod_selector_for(&self, cluster: Option<&str>) -> String {
        if let Some(selector) = &self.pod_selector {
            return selector.clone();
        }
        match cluster {
            Some(name) => format!("app.kubernetes.io/instance={}", name),
            None => "app.kubernetes.io/name=mariadb".to_string(),
        }
    }

    pub fn service_name_for(&self, cluster: Option<&str>) -> Option<String> {
        self.service_name
            .clone()
            .or_else(|| cluster.map(str::to_string))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub cluster: ClusterSettings,
}

impl TriageConfig {
    /// Default per-user location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, TriageError> {
        let config: Self = toml::from_str(content).map_err(|source| TriageError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config
            .thresholds
            .validate()
            .map_err(|reason| TriageError::ConfigInvalid {
                path: origin.to_path_buf(),
                reason,
            })?;
        Ok(config)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, TriageError> {
        let content = fs::read_to_string(path).map_err(|source| TriageError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded config from {}", path.display());
        Self::from_toml(&content, path)
    }

    /// Resolve the effective configuration.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, TriageError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }
}
