//! Shared types and the scenario inference core for dbtriage.
//!
//! - `model`: typed probe records and the `DiagnosticState` snapshot
//! - `scenario`: the scenario catalogue, confidence levels, matches
//! - `rules`: the declarative rule table and its engine
//! - `report`: text/JSON rendering and exit status
//! - `config`: thresholds, timeouts and cluster settings

pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod rules;
pub mod scenario;

pub use config::{ClusterCli, ClusterSettings, Thresholds, Timeouts, TriageConfig};
pub use error::TriageError;
pub use model::{
    BackupOutcome, BackupRecord, BackupStatus, CertificateStatus, ClusterStatusLabel,
    DiagnosticRun, DiagnosticState, Environment, NodeStatus, OperatorStatus, PodStatus,
    QuorumStatus, ReplicationStatus, RunPhase, ServiceStatus, StorageStatus, VolumeUsage,
};
pub use rules::{evaluate, RuleEngine};
pub use scenario::{Confidence, Scenario, ScenarioMatch};
