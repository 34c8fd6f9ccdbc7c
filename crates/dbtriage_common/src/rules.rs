//! Scenario rule engine
//!
//! A fixed, ordered table of independent rules evaluated against one
//! `DiagnosticState`. Every rule whose predicate holds contributes exactly one
//! `ScenarioMatch`; rules are not mutually exclusive, so several may describe
//! the same root cause from different signals.
//!
//! The engine does no I/O and keeps no state. An unreachable control plane is
//! terminal: the single short-circuit match is returned and no table rule runs.

use crate::config::Thresholds;
use crate::model::DiagnosticState;
use crate::scenario::{Confidence, Scenario, ScenarioMatch};

type Predicate = fn(&DiagnosticState, &Thresholds) -> bool;
type EvidenceBuilder = fn(&DiagnosticState, &Thresholds) -> Vec<String>;

/// How a rule picks the confidence of its match.
#[derive(Clone, Copy)]
pub enum ConfidencePolicy {
    Fixed(Confidence),
    /// `escalated` when `when` holds, otherwise `base`
    Escalating {
        base: Confidence,
        escalated: Confidence,
        when: Predicate,
    },
}

impl ConfidencePolicy {
    fn resolve(&self, state: &DiagnosticState, thresholds: &Thresholds) -> Confidence {
        match *self {
            ConfidencePolicy::Fixed(confidence) => confidence,
            ConfidencePolicy::Escalating {
                base,
                escalated,
                when,
            } => {
                if when(state, thresholds) {
                    escalated
                } else {
                    base
                }
            }
        }
    }
}

/// One predicate -> match entry of the rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub scenario: Scenario,
    pub confidence: ConfidencePolicy,
    pub when: Predicate,
    pub evidence: EvidenceBuilder,
}

impl Rule {
    pub fn fires(&self, state: &DiagnosticState, thresholds: &Thresholds) -> bool {
        (self.when)(state, thresholds)
    }

    fn to_match(&self, state: &DiagnosticState, thresholds: &Thresholds) -> ScenarioMatch {
        ScenarioMatch::new(
            self.scenario,
            self.confidence.resolve(state, thresholds),
            (self.evidence)(state, thresholds),
        )
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("scenario", &self.scenario)
            .finish()
    }
}

/// Rule table in evaluation order.
pub const RULES: &[Rule] = &[
    Rule {
        id: "site_down",
        scenario: Scenario::SiteDown,
        confidence: ConfidencePolicy::Fixed(Confidence::Critical),
        when: |s, _| s.pods.all_down,
        evidence: site_down_evidence,
    },
    Rule {
        id: "quorum_loss",
        scenario: Scenario::QuorumLoss,
        confidence: ConfidencePolicy::Fixed(Confidence::Critical),
        when: |s, _| s.quorum.reachable && !s.quorum.has_quorum,
        evidence: quorum_loss_evidence,
    },
    Rule {
        id: "oom_killed",
        scenario: Scenario::MemoryExhaustion,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| s.pods.oom_killed_count > 0,
        evidence: |s, _| {
            vec![format!(
                "{} database container(s) terminated with OOMKilled",
                s.pods.oom_killed_count
            )]
        },
    },
    Rule {
        id: "node_memory_pressure",
        scenario: Scenario::MemoryExhaustion,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| s.nodes.memory_pressure > 0,
        evidence: |s, _| {
            let mut ev = vec![format!(
                "{} node(s) report MemoryPressure",
                s.nodes.memory_pressure
            )];
            ev.extend(named("pressured node", &s.nodes.pressured_nodes));
            ev
        },
    },
    Rule {
        id: "single_unit_failure",
        scenario: Scenario::SingleUnitFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        // Requires confirmed quorum so it never doubles as quorum loss
        when: |s, _| s.pods.crash_loop_count >= 1 && s.quorum.has_quorum && s.pods.running >= 2,
        evidence: |s, _| {
            vec![
                format!("{} pod(s) in CrashLoopBackOff", s.pods.crash_loop_count),
                format!("{}/{} database pods running", s.pods.running, s.pods.total),
                format!(
                    "cluster still Primary with size {}",
                    s.quorum.cluster_size
                ),
            ]
        },
    },
    Rule {
        id: "node_not_ready",
        scenario: Scenario::NodeFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| s.nodes.not_ready >= 1,
        evidence: |s, _| {
            let mut ev = vec![format!(
                "{}/{} nodes not Ready",
                s.nodes.not_ready, s.nodes.total
            )];
            ev.extend(named("not ready", &s.nodes.not_ready_nodes));
            ev
        },
    },
    Rule {
        id: "node_disk_pressure",
        scenario: Scenario::DiskExhaustion,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| s.nodes.disk_pressure > 0,
        evidence: |s, _| {
            let mut ev = vec![format!(
                "{} node(s) report DiskPressure",
                s.nodes.disk_pressure
            )];
            ev.extend(named("pressured node", &s.nodes.pressured_nodes));
            ev
        },
    },
    Rule {
        id: "volume_usage",
        scenario: Scenario::DiskExhaustion,
        confidence: ConfidencePolicy::Escalating {
            base: Confidence::High,
            escalated: Confidence::Critical,
            when: |s, t| {
                s.storage
                    .volumes
                    .iter()
                    .any(|v| v.used_percent > t.storage_critical_percent)
            },
        },
        when: |s, t| {
            s.storage
                .volumes
                .iter()
                .any(|v| v.used_percent > t.storage_high_percent)
        },
        evidence: volume_usage_evidence,
    },
    Rule {
        id: "storage_pending",
        scenario: Scenario::StorageProvisioningFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| s.storage.pending > 0,
        evidence: |s, _| {
            let mut ev = vec![format!(
                "{}/{} persistent volume claims Pending",
                s.storage.pending, s.storage.claims_total
            )];
            ev.extend(named("pending claim", &s.storage.pending_claims));
            ev
        },
    },
    Rule {
        id: "operator_down",
        scenario: Scenario::OperatorMisconfiguration,
        confidence: ConfidencePolicy::Fixed(Confidence::Medium),
        when: |s, _| !s.operator.running && s.pods.total > 0,
        evidence: operator_evidence,
    },
    Rule {
        id: "no_endpoints",
        scenario: Scenario::EndpointFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| !s.service.has_endpoints && s.pods.running > 0,
        evidence: endpoint_evidence,
    },
    Rule {
        id: "dns_failure",
        scenario: Scenario::DnsFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::Medium),
        when: |s, _| !s.dns_working,
        evidence: |s, _| {
            let mut ev = vec!["cluster DNS resolution not confirmed".to_string()];
            ev.extend(s.dns_errors.iter().cloned());
            ev
        },
    },
    Rule {
        id: "replication_broken",
        scenario: Scenario::ReplicationBroken,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| {
            s.replication.configured && (!s.replication.io_running || !s.replication.sql_running)
        },
        evidence: replication_broken_evidence,
    },
    Rule {
        id: "replication_lag",
        scenario: Scenario::ReplicationLag,
        confidence: ConfidencePolicy::Fixed(Confidence::Medium),
        // Only reachable with both threads running, so it excludes replication_broken
        when: |s, t| {
            s.replication.configured
                && s.replication.io_running
                && s.replication.sql_running
                && s
                    .replication
                    .seconds_behind
                    .is_some_and(|lag| lag > t.replication_lag_seconds)
        },
        evidence: |s, t| {
            vec![format!(
                "replica is {}s behind the source (threshold {}s)",
                s.replication.seconds_behind.unwrap_or_default(),
                t.replication_lag_seconds
            )]
        },
    },
    Rule {
        id: "backup_failed",
        scenario: Scenario::BackupFailure,
        confidence: ConfidencePolicy::Fixed(Confidence::Medium),
        when: |s, _| s.backup.most_recent_failed,
        evidence: backup_evidence,
    },
    Rule {
        id: "certificate_expired",
        scenario: Scenario::CertificateExpired,
        confidence: ConfidencePolicy::Fixed(Confidence::High),
        when: |s, _| !s.certificates.expired.is_empty(),
        evidence: |s, _| named("expired certificate", &s.certificates.expired),
    },
    Rule {
        id: "certificate_expiring",
        scenario: Scenario::CertificateExpiring,
        confidence: ConfidencePolicy::Fixed(Confidence::Low),
        when: |s, _| !s.certificates.expiring_soon.is_empty(),
        evidence: |s, t| {
            let mut ev = named("expiring certificate", &s.certificates.expiring_soon);
            ev.push(format!("warning window {} days", t.certificate_warning_days));
            ev
        },
    },
];

fn named(label: &str, names: &[String]) -> Vec<String> {
    names.iter().map(|n| format!("{}: {}", label, n)).collect()
}

fn site_down_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let pods = &s.pods;
    let mut ev = vec![format!("0/{} database pods running", pods.total)];
    if pods.pending_count > 0 {
        ev.push(format!("{} pod(s) Pending", pods.pending_count));
    }
    if pods.crash_loop_count > 0 {
        ev.push(format!("{} pod(s) in CrashLoopBackOff", pods.crash_loop_count));
    }
    if pods.evicted_count > 0 {
        ev.push(format!("{} pod(s) Evicted", pods.evicted_count));
    }
    if s.nodes.not_ready > 0 {
        ev.push(format!("{}/{} nodes not Ready", s.nodes.not_ready, s.nodes.total));
    }
    ev
}

fn quorum_loss_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let q = &s.quorum;
    let mut ev = vec![format!(
        "wsrep_cluster_status = {} on {}",
        q.status_label.as_str(),
        q.queried_pod.as_deref().unwrap_or("unknown pod")
    )];
    ev.push(format!("wsrep_cluster_size = {}", q.cluster_size));
    ev
}

fn volume_usage_evidence(s: &DiagnosticState, t: &Thresholds) -> Vec<String> {
    s.storage
        .volumes
        .iter()
        .filter(|v| v.used_percent > t.storage_high_percent)
        .map(|v| {
            let limit = if v.used_percent > t.storage_critical_percent {
                t.storage_critical_percent
            } else {
                t.storage_high_percent
            };
            format!("{} at {}% used (limit {}%)", v.name, v.used_percent, limit)
        })
        .collect()
}

fn operator_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let op = &s.operator;
    let mut ev = if op.found {
        vec![format!(
            "operator deployment has {}/{} replicas ready",
            op.ready_replicas, op.desired_replicas
        )]
    } else {
        vec!["no operator deployment found".to_string()]
    };
    ev.push(format!("{} database pod(s) exist without a running operator", s.pods.total));
    ev.extend(op.errors.iter().cloned());
    ev
}

fn endpoint_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let svc = &s.service;
    let name = svc.service_name.as_deref().unwrap_or("<unknown service>");
    let mut ev = if svc.found {
        vec![format!(
            "service {} has no ready endpoints ({} not ready)",
            name, svc.not_ready_addresses
        )]
    } else {
        vec![format!("endpoints for service {} not found", name)]
    };
    ev.push(format!("{} database pod(s) running", s.pods.running));
    ev.extend(svc.errors.iter().cloned());
    ev
}

fn replication_broken_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let r = &s.replication;
    let yes_no = |running: bool| if running { "Yes" } else { "No" };
    let mut ev = vec![
        format!("IO thread running: {}", yes_no(r.io_running)),
        format!("SQL thread running: {}", yes_no(r.sql_running)),
    ];
    if let Some(err) = &r.last_error {
        ev.push(format!("last error: {}", err));
    }
    ev
}

fn backup_evidence(s: &DiagnosticState, _: &Thresholds) -> Vec<String> {
    let b = &s.backup;
    let mut ev = Vec::new();
    if let Some(record) = &b.most_recent {
        let when = record
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown time".to_string());
        ev.push(format!("most recent backup {} failed (created {})", record.name, when));
    }
    if b.older_failures > 0 {
        ev.push(format!("{} older backup(s) also failed", b.older_failures));
    }
    ev
}

fn control_plane_evidence(s: &DiagnosticState) -> Vec<String> {
    let mut ev = vec!["control plane API did not answer; all other probes skipped".to_string()];
    ev.extend(s.control_plane_errors.iter().cloned());
    ev
}

/// Evaluates the rule table with a fixed set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    thresholds: Thresholds,
}

impl RuleEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn rules(&self) -> &'static [Rule] {
        RULES
    }

    /// Matches in rule-evaluation order. Total over every state.
    pub fn evaluate(&self, state: &DiagnosticState) -> Vec<ScenarioMatch> {
        if !state.control_plane_reachable {
            return vec![ScenarioMatch::new(
                Scenario::ControlPlaneUnreachable,
                Confidence::Critical,
                control_plane_evidence(state),
            )];
        }

        RULES
            .iter()
            .filter(|rule| rule.fires(state, &self.thresholds))
            .map(|rule| rule.to_match(state, &self.thresholds))
            .collect()
    }
}

/// Evaluate with default thresholds.
pub fn evaluate(state: &DiagnosticState) -> Vec<ScenarioMatch> {
    RuleEngine::default().evaluate(state)
}
