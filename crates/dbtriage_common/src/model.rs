//! Probe result records and the aggregated diagnostic snapshot.
//!
//! Every record is flat, serialisable and `Default`. The defaults are the
//! conservative "not confirmed" values: counts are zero and health booleans
//! are false, so a probe that could not run never reads as healthy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database unit health, classified from the pod listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    pub total: u32,
    pub running: u32,
    pub crash_loop_count: u32,
    pub pending_count: u32,
    pub evicted_count: u32,
    pub oom_killed_count: u32,
    /// True iff `running == 0` and `total > 0`
    pub all_down: bool,
    /// Running unit names in listing order; the first one serves database queries
    #[serde(default)]
    pub running_pods: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PodStatus {
    pub fn first_running(&self) -> Option<&str> {
        self.running_pods.first().map(String::as_str)
    }
}

/// Galera membership label as reported by `wsrep_cluster_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatusLabel {
    Primary,
    NonPrimary,
    #[default]
    Unknown,
}

impl ClusterStatusLabel {
    /// Recognise a raw status value. Anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary" => Self::Primary,
            "non-primary" | "non_primary" | "nonprimary" | "disconnected" => Self::NonPrimary,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::NonPrimary => "non-Primary",
            Self::Unknown => "unknown",
        }
    }
}

/// Cluster membership as seen from one running database unit.
///
/// `reachable == false` means quorum is unknown, which is a different state
/// from a confirmed non-primary component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumStatus {
    pub reachable: bool,
    pub has_quorum: bool,
    pub cluster_size: u32,
    pub status_label: ClusterStatusLabel,
    pub queried_pod: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub total: u32,
    pub ready: u32,
    /// Always `total - ready`, never read from a condition directly
    pub not_ready: u32,
    pub disk_pressure: u32,
    pub memory_pressure: u32,
    pub pid_pressure: u32,
    #[serde(default)]
    pub not_ready_nodes: Vec<String>,
    #[serde(default)]
    pub pressured_nodes: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStatus {
    pub found: bool,
    pub running: bool,
    pub ready_replicas: u32,
    pub desired_replicas: u32,
    #[serde(default)]
    pub deployments: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_name: Option<String>,
    pub found: bool,
    pub has_endpoints: bool,
    pub ready_addresses: u32,
    pub not_ready_addresses: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Filesystem usage of one database data volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeUsage {
    pub name: String,
    pub used_percent: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub claims_total: u32,
    pub bound: u32,
    pub pending: u32,
    #[serde(default)]
    pub pending_claims: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<VolumeUsage>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl StorageStatus {
    pub fn max_used_percent(&self) -> Option<u8> {
        self.volumes.iter().map(|v| v.used_percent).max()
    }
}

/// Asynchronous replica channel state.
///
/// The thread and lag fields only carry meaning when `configured` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStatus {
    pub configured: bool,
    pub io_running: bool,
    pub sql_running: bool,
    pub seconds_behind: Option<u64>,
    pub last_error: Option<String>,
    pub queried_pod: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateStatus {
    pub checked: bool,
    pub total: u32,
    #[serde(default)]
    pub expired: Vec<String>,
    /// Never contains an entry of `expired`
    #[serde(default)]
    pub expiring_soon: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupOutcome {
    Succeeded,
    Failed,
    Running,
    #[default]
    Unknown,
}

impl BackupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub outcome: BackupOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStatus {
    pub checked: bool,
    pub total: u32,
    pub most_recent: Option<BackupRecord>,
    /// Only the most recent record drives this flag
    pub most_recent_failed: bool,
    /// Failures among older records, kept as evidence only
    pub older_failures: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Deployment target, classified from the active control-plane context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Kind,
    Minikube,
    K3d,
    DockerDesktop,
    Eks,
    Gke,
    Aks,
    OpenShift,
    Generic,
    #[default]
    Unknown,
}

impl Environment {
    /// Classify a kubeconfig context name.
    pub fn from_context(context: &str) -> Self {
        let ctx = context.trim().to_ascii_lowercase();
        if ctx.is_empty() {
            Self::Unknown
        } else if ctx.starts_with("kind-") {
            Self::Kind
        } else if ctx.contains("minikube") {
            Self::Minikube
        } else if ctx.starts_with("k3d-") {
            Self::K3d
        } else if ctx == "docker-desktop" || ctx == "docker-for-desktop" {
            Self::DockerDesktop
        } else if ctx.starts_with("arn:aws:eks:") || ctx.contains(".eks.") {
            Self::Eks
        } else if ctx.starts_with("gke_") {
            Self::Gke
        } else if has_token(&ctx, "aks") || ctx.contains(".azmk8s.") {
            Self::Aks
        } else if ctx.contains("openshift") || ctx.contains(":6443/") {
            Self::OpenShift
        } else {
            Self::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kind => "kind",
            Self::Minikube => "minikube",
            Self::K3d => "k3d",
            Self::DockerDesktop => "docker-desktop",
            Self::Eks => "eks",
            Self::Gke => "gke",
            Self::Aks => "aks",
            Self::OpenShift => "openshift",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        }
    }
}

/// Whether `token` appears delimited by non-alphanumeric characters.
fn has_token(text: &str, token: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|part| part == token)
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable snapshot of every probe dimension for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticState {
    pub namespace: String,
    pub cluster: Option<String>,
    pub control_plane_reachable: bool,
    pub dns_working: bool,
    pub environment: Environment,
    #[serde(default)]
    pub control_plane_errors: Vec<String>,
    #[serde(default)]
    pub dns_errors: Vec<String>,
    pub pods: PodStatus,
    pub quorum: QuorumStatus,
    pub nodes: NodeStatus,
    pub operator: OperatorStatus,
    pub service: ServiceStatus,
    pub storage: StorageStatus,
    pub replication: ReplicationStatus,
    pub certificates: CertificateStatus,
    pub backup: BackupStatus,
}

impl DiagnosticState {
    /// Snapshot for a run whose control plane could not be reached.
    pub fn unreachable(namespace: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            namespace: namespace.into(),
            control_plane_reachable: false,
            control_plane_errors: errors,
            ..Self::default()
        }
    }
}

/// Terminal state of a diagnostic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    ShortCircuited,
    FullEvaluation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRun {
    pub phase: RunPhase,
    pub state: DiagnosticState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_parsing() {
        assert_eq!(ClusterStatusLabel::parse("Primary"), ClusterStatusLabel::Primary);
        assert_eq!(ClusterStatusLabel::parse(" non-Primary\n"), ClusterStatusLabel::NonPrimary);
        assert_eq!(ClusterStatusLabel::parse("Disconnected"), ClusterStatusLabel::NonPrimary);
        assert_eq!(ClusterStatusLabel::parse("ON"), ClusterStatusLabel::Unknown);
        assert_eq!(ClusterStatusLabel::parse(""), ClusterStatusLabel::Unknown);
    }

    #[test]
    fn test_environment_classification() {
        assert_eq!(Environment::from_context("kind-galera"), Environment::Kind);
        assert_eq!(Environment::from_context("minikube"), Environment::Minikube);
        assert_eq!(
            Environment::from_context("arn:aws:eks:eu-west-1:123456789012:cluster/prod"),
            Environment::Eks
        );
        assert_eq!(Environment::from_context("gke_proj_europe-west1_prod"), Environment::Gke);
        assert_eq!(Environment::from_context("prod-aks-westeurope"), Environment::Aks);
        assert_eq!(Environment::from_context("admin@homelab"), Environment::Generic);
        assert_eq!(
            Environment::from_context("clusterUser_rg_prod.hcp.westeurope.azmk8s.io"),
            Environment::Aks
        );
        assert_eq!(Environment::from_context("aks-prod"), Environment::Aks);
        assert_eq!(Environment::from_context("oaks-prod"), Environment::Generic);
        assert_eq!(Environment::from_context("tasks-dev"), Environment::Generic);
        assert_eq!(Environment::from_context("  "), Environment::Unknown);
    }

    #[test]
    fn test_defaults_are_not_confirmed() {
        let state = DiagnosticState::default();
        assert!(!state.control_plane_reachable);
        assert!(!state.dns_working);
        assert!(!state.quorum.reachable);
        assert!(!state.quorum.has_quorum);
        assert!(!state.operator.running);
        assert!(!state.service.has_endpoints);
        assert!(!state.replication.configured);
        assert!(!state.backup.most_recent_failed);
        assert_eq!(state.environment, Environment::Unknown);
    }

    #[test]
    fn test_unreachable_snapshot_keeps_errors() {
        let state = DiagnosticState::unreachable("db", vec!["connection refused".to_string()]);
        assert_eq!(state.namespace, "db");
        assert!(!state.control_plane_reachable);
        assert_eq!(state.control_plane_errors, vec!["connection refused"]);
        assert_eq!(state.pods, PodStatus::default());
    }
}
