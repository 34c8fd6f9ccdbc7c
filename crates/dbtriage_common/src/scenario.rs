//! Scenario catalogue, confidence levels and rule output.

use serde::{Deserialize, Serialize};

/// Ordinal severity attached to a match.
///
/// Declaration order is the presentation order: a lower ordinal is more
/// severe and sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Critical,
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disaster scenarios the engine knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    ControlPlaneUnreachable,
    SiteDown,
    QuorumLoss,
    MemoryExhaustion,
    SingleUnitFailure,
    NodeFailure,
    DiskExhaustion,
    StorageProvisioningFailure,
    OperatorMisconfiguration,
    EndpointFailure,
    DnsFailure,
    ReplicationBroken,
    ReplicationLag,
    BackupFailure,
    CertificateExpired,
    CertificateExpiring,
}

impl Scenario {
    pub const ALL: [Scenario; 16] = [
        Scenario::ControlPlaneUnreachable,
        Scenario::SiteDown,
        Scenario::QuorumLoss,
        Scenario::MemoryExhaustion,
        Scenario::SingleUnitFailure,
        Scenario::NodeFailure,
        Scenario::DiskExhaustion,
        Scenario::StorageProvisioningFailure,
        Scenario::OperatorMisconfiguration,
        Scenario::EndpointFailure,
        Scenario::DnsFailure,
        Scenario::ReplicationBroken,
        Scenario::ReplicationLag,
        Scenario::BackupFailure,
        Scenario::CertificateExpired,
        Scenario::CertificateExpiring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ControlPlaneUnreachable => "Control plane unreachable",
            Self::SiteDown => "Site/DC down",
            Self::QuorumLoss => "Quorum loss",
            Self::MemoryExhaustion => "Memory exhaustion",
            Self::SingleUnitFailure => "Single pod failure",
            Self::NodeFailure => "Node failure",
            Self::DiskExhaustion => "Disk exhaustion",
            Self::StorageProvisioningFailure => "Storage provisioning failure",
            Self::OperatorMisconfiguration => "Operator misconfiguration",
            Self::EndpointFailure => "Service endpoint failure",
            Self::DnsFailure => "DNS failure",
            Self::ReplicationBroken => "Replication channel broken",
            Self::ReplicationLag => "Replication lag / network partition",
            Self::BackupFailure => "Silent backup failure",
            Self::CertificateExpired => "TLS certificate expired",
            Self::CertificateExpiring => "TLS certificate expiring soon",
        }
    }

    /// Runbook that holds the remediation steps for this scenario.
    pub fn reference_id(&self) -> &'static str {
        match self {
            Self::ControlPlaneUnreachable => "runbooks/control-plane-unreachable.md",
            Self::SiteDown => "runbooks/site-dc-down.md",
            Self::QuorumLoss => "runbooks/quorum-loss.md",
            Self::MemoryExhaustion => "runbooks/memory-exhaustion.md",
            Self::SingleUnitFailure => "runbooks/single-pod-failure.md",
            Self::NodeFailure => "runbooks/node-failure.md",
            Self::DiskExhaustion => "runbooks/disk-exhaustion.md",
            Self::StorageProvisioningFailure => "runbooks/storage-provisioning-failure.md",
            Self::OperatorMisconfiguration => "runbooks/operator-misconfiguration.md",
            Self::EndpointFailure => "runbooks/service-endpoint-failure.md",
            Self::DnsFailure => "runbooks/dns-failure.md",
            Self::ReplicationBroken => "runbooks/replication-broken.md",
            Self::ReplicationLag => "runbooks/replication-lag.md",
            Self::BackupFailure => "runbooks/backup-failure.md",
            Self::CertificateExpired => "runbooks/certificate-expiry.md",
            Self::CertificateExpiring => "runbooks/certificate-expiry.md",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A scenario hypothesis produced by one rule, with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMatch {
    pub scenario_name: String,
    pub confidence: Confidence,
    pub reference_id: String,
    pub evidence: Vec<String>,
}

impl ScenarioMatch {
    pub fn new(scenario: Scenario, confidence: Confidence, evidence: Vec<String>) -> Self {
        Self {
            scenario_name: scenario.name().to_string(),
            confidence,
            reference_id: scenario.reference_id().to_string(),
            evidence,
        }
    }

    pub fn is(&self, scenario: Scenario) -> bool {
        self.scenario_name == scenario.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Critical < Confidence::High);
        assert!(Confidence::High < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::Low);
    }

    #[test]
    fn test_confidence_serializes_uppercase() {
        let json = serde_json::to_string(&Confidence::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
    }

    #[test]
    fn test_scenario_names_are_unique() {
        let names: HashSet<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), Scenario::ALL.len());
    }

    #[test]
    fn test_reference_ids_point_at_runbooks() {
        for scenario in Scenario::ALL {
            let reference = scenario.reference_id();
            assert!(reference.starts_with("runbooks/"), "{}", reference);
            assert!(reference.ends_with(".md"), "{}", reference);
        }
    }

    #[test]
    fn test_match_carries_catalogue_data() {
        let m = ScenarioMatch::new(Scenario::QuorumLoss, Confidence::Critical, vec![]);
        assert_eq!(m.scenario_name, "Quorum loss");
        assert_eq!(m.reference_id, "runbooks/quorum-loss.md");
        assert!(m.is(Scenario::QuorumLoss));
        assert!(!m.is(Scenario::SiteDown));
    }
}
