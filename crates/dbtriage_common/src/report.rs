//! Report rendering and exit status.
//!
//! Text output is ASCII-only; colour is applied with owo-colors and can be
//! switched off for pipes. JSON output carries the full snapshot.

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::config::Thresholds;
use crate::model::{DiagnosticRun, DiagnosticState, RunPhase};
use crate::scenario::{Confidence, ScenarioMatch};

pub const EXIT_NO_MATCH: i32 = 0;
pub const EXIT_MATCHED: i32 = 1;

const SEPARATOR: &str = "----------------------------------------";

/// Stable sort by confidence; equal confidences keep rule order.
pub fn sort_matches(matches: &mut [ScenarioMatch]) {
    matches.sort_by_key(|m| m.confidence);
}

/// 0 when nothing matched, 1 otherwise.
pub fn exit_code(matches: &[ScenarioMatch]) -> i32 {
    if matches.is_empty() {
        EXIT_NO_MATCH
    } else {
        EXIT_MATCHED
    }
}

#[derive(Debug, Serialize)]
struct JsonScenario<'a> {
    confidence: Confidence,
    scenario: &'a str,
    file: &'a str,
    indicators: &'a [String],
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    scenarios: Vec<JsonScenario<'a>>,
    run: RunPhase,
    state: &'a DiagnosticState,
}

/// Machine-readable report.
pub fn render_json(run: &DiagnosticRun, matches: &[ScenarioMatch]) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        scenarios: matches
            .iter()
            .map(|m| JsonScenario {
                confidence: m.confidence,
                scenario: &m.scenario_name,
                file: &m.reference_id,
                indicators: &m.evidence,
            })
            .collect(),
        run: run.phase,
        state: &run.state,
    };
    serde_json::to_string_pretty(&report)
}

fn paint_confidence(confidence: Confidence, color: bool) -> String {
    let label = format!("[{}]", confidence.as_str());
    if !color {
        return label;
    }
    match confidence {
        Confidence::Critical => label.bright_red().bold().to_string(),
        Confidence::High => label.red().to_string(),
        Confidence::Medium => label.yellow().to_string(),
        Confidence::Low => label.cyan().to_string(),
    }
}

/// Health of one probe dimension as shown in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionHealth {
    Healthy,
    Degraded,
    Unknown,
}

impl DimensionHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "ok",
            Self::Degraded => "degraded",
            Self::Unknown => "unknown",
        }
    }

    fn paint(&self, color: bool) -> String {
        let padded = format!("{:<9}", self.as_str());
        if !color {
            return padded;
        }
        match self {
            Self::Healthy => padded.green().to_string(),
            Self::Degraded => padded.red().to_string(),
            Self::Unknown => padded.yellow().to_string(),
        }
    }
}

/// One summary line per probe dimension, so "could not check" stays
/// distinguishable from "checked and healthy".
pub fn dimension_summary(
    state: &DiagnosticState,
    thresholds: &Thresholds,
) -> Vec<(&'static str, DimensionHealth, String)> {
    use DimensionHealth::{Degraded, Healthy, Unknown};

    let pods = &state.pods;
    let pods_line = if pods.total == 0 && !pods.errors.is_empty() {
        (Unknown, pods.errors.join("; "))
    } else if pods.total > 0 && pods.running == pods.total {
        (Healthy, format!("{}/{} running", pods.running, pods.total))
    } else {
        (Degraded, format!("{}/{} running", pods.running, pods.total))
    };

    let q = &state.quorum;
    let quorum_line = if !q.reachable {
        (Unknown, "no database pod answered".to_string())
    } else if q.has_quorum {
        (Healthy, format!("Primary, size {}", q.cluster_size))
    } else {
        (Degraded, format!("{}, size {}", q.status_label.as_str(), q.cluster_size))
    };

    let n = &state.nodes;
    let nodes_line = if n.total == 0 {
        (Unknown, n.errors.first().cloned().unwrap_or_else(|| "no nodes listed".to_string()))
    } else if n.not_ready == 0 && n.disk_pressure == 0 && n.memory_pressure == 0 {
        (Healthy, format!("{}/{} ready", n.ready, n.total))
    } else {
        (
            Degraded,
            format!(
                "{}/{} ready, {} disk / {} memory pressure",
                n.ready, n.total, n.disk_pressure, n.memory_pressure
            ),
        )
    };

    let op = &state.operator;
    let operator_line = if !op.found && !op.errors.is_empty() {
        (Unknown, op.errors.join("; "))
    } else if op.running {
        (Healthy, format!("{}/{} replicas ready", op.ready_replicas, op.desired_replicas))
    } else {
        (Degraded, "not running".to_string())
    };

    let svc = &state.service;
    let service_line = if !svc.found {
        (Unknown, "endpoints not found".to_string())
    } else if svc.has_endpoints {
        (Healthy, format!("{} ready endpoint(s)", svc.ready_addresses))
    } else {
        (Degraded, "no ready endpoints".to_string())
    };

    let st = &state.storage;
    let storage_line = match st.max_used_percent() {
        _ if st.pending > 0 => (Degraded, format!("{} claim(s) pending", st.pending)),
        Some(max) if max > thresholds.storage_high_percent => (
            Degraded,
            format!("{} bound, max usage {}% (limit {}%)", st.bound, max, thresholds.storage_high_percent),
        ),
        Some(max) => (Healthy, format!("{} bound, max usage {}%", st.bound, max)),
        None if st.claims_total > 0 => (Unknown, format!("{} bound, usage unknown", st.bound)),
        None => (Unknown, "no claims listed".to_string()),
    };

    let r = &state.replication;
    let replication_line = if !r.errors.is_empty() && !r.configured {
        (Unknown, r.errors.join("; "))
    } else if !r.configured {
        (Healthy, "not configured".to_string())
    } else if r.io_running
        && r.sql_running
        && r.seconds_behind.is_some_and(|lag| lag > thresholds.replication_lag_seconds)
    {
        (
            Degraded,
            format!(
                "running, {}s behind (limit {}s)",
                r.seconds_behind.unwrap_or_default(),
                thresholds.replication_lag_seconds
            ),
        )
    } else if r.io_running && r.sql_running {
        let lag = r
            .seconds_behind
            .map(|s| format!("{}s behind", s))
            .unwrap_or_else(|| "lag unknown".to_string());
        (Healthy, format!("running, {}", lag))
    } else {
        (Degraded, "thread stopped".to_string())
    };

    let c = &state.certificates;
    let cert_line = if !c.checked {
        (Unknown, "not checked".to_string())
    } else if c.expired.is_empty() && c.expiring_soon.is_empty() {
        (Healthy, format!("{} valid", c.total))
    } else {
        (
            Degraded,
            format!("{} expired, {} expiring", c.expired.len(), c.expiring_soon.len()),
        )
    };

    let b = &state.backup;
    let backup_line = match &b.most_recent {
        None => (Unknown, "no backup records".to_string()),
        Some(record) if b.most_recent_failed => (Degraded, format!("{} failed", record.name)),
        Some(record) => (Healthy, format!("{} {}", record.name, record.outcome.as_str())),
    };

    let dns_line = if state.dns_working {
        (Healthy, "resolving".to_string())
    } else {
        (Unknown, "not confirmed".to_string())
    };

    vec![
        ("pods", pods_line.0, pods_line.1),
        ("quorum", quorum_line.0, quorum_line.1),
        ("nodes", nodes_line.0, nodes_line.1),
        ("operator", operator_line.0, operator_line.1),
        ("service", service_line.0, service_line.1),
        ("storage", storage_line.0, storage_line.1),
        ("replication", replication_line.0, replication_line.1),
        ("certificates", cert_line.0, cert_line.1),
        ("backup", backup_line.0, backup_line.1),
        ("dns", dns_line.0, dns_line.1),
    ]
}

/// Human-readable report. `matches` is expected to be sorted already.
pub fn render_text(
    run: &DiagnosticRun,
    matches: &[ScenarioMatch],
    thresholds: &Thresholds,
    color: bool,
) -> String {
    let state = &run.state;
    let mut out = String::new();

    let title = "dbtriage - disaster scenario triage";
    out.push_str(&if color { title.bold().to_string() } else { title.to_string() });
    out.push('\n');
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!("  Namespace:    {}\n", state.namespace));
    out.push_str(&format!(
        "  Cluster:      {}\n",
        state.cluster.as_deref().unwrap_or("(not detected)")
    ));
    out.push_str(&format!("  Environment:  {}\n", state.environment));
    out.push('\n');

    if run.phase == RunPhase::FullEvaluation {
        out.push_str("[PROBES]\n");
        for (name, health, detail) in dimension_summary(state, thresholds) {
            out.push_str(&format!("  {:<13} {} {}\n", name, health.paint(color), detail));
        }
        out.push('\n');
    }

    if matches.is_empty() {
        out.push_str("[SCENARIOS]\n  none matched\n");
    } else {
        out.push_str("[SCENARIOS]\n");
        for m in matches {
            out.push_str(&format!(
                "  {} {} -> {}\n",
                paint_confidence(m.confidence, color),
                m.scenario_name,
                m.reference_id
            ));
            for line in &m.evidence {
                out.push_str(&format!("      * {}\n", line));
            }
        }
    }

    out.push_str(SEPARATOR);
    out.push('\n');
    let summary = if matches.is_empty() {
        "No disaster scenario matched.".to_string()
    } else {
        format!("{} scenario match(es); start with the first runbook listed.", matches.len())
    };
    out.push_str(&summary);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VolumeUsage;
    use crate::scenario::Scenario;

    fn m(scenario: Scenario, confidence: Confidence) -> ScenarioMatch {
        ScenarioMatch::new(scenario, confidence, vec![format!("{} evidence", scenario.name())])
    }

    fn run(phase: RunPhase) -> DiagnosticRun {
        DiagnosticRun {
            phase,
            state: DiagnosticState {
                namespace: "db".to_string(),
                cluster: Some("galera".to_string()),
                control_plane_reachable: phase == RunPhase::FullEvaluation,
                ..DiagnosticState::default()
            },
        }
    }

    #[test]
    fn test_sort_is_stable_within_confidence() {
        let mut matches = vec![
            m(Scenario::DnsFailure, Confidence::Medium),
            m(Scenario::NodeFailure, Confidence::High),
            m(Scenario::BackupFailure, Confidence::Medium),
            m(Scenario::SiteDown, Confidence::Critical),
            m(Scenario::CertificateExpiring, Confidence::Low),
            m(Scenario::EndpointFailure, Confidence::High),
        ];
        sort_matches(&mut matches);
        let names: Vec<_> = matches.iter().map(|m| m.scenario_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Site/DC down",
                "Node failure",
                "Service endpoint failure",
                "DNS failure",
                "Silent backup failure",
                "TLS certificate expiring soon",
            ]
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&[]), 0);
        assert_eq!(exit_code(&[m(Scenario::DnsFailure, Confidence::Medium)]), 1);
    }

    #[test]
    fn test_json_schema() {
        let matches = vec![m(Scenario::QuorumLoss, Confidence::Critical)];
        let json = render_json(&run(RunPhase::FullEvaluation), &matches).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let scenario = &value["scenarios"][0];
        assert_eq!(scenario["confidence"], "CRITICAL");
        assert_eq!(scenario["scenario"], "Quorum loss");
        assert_eq!(scenario["file"], "runbooks/quorum-loss.md");
        assert_eq!(scenario["indicators"][0], "Quorum loss evidence");
        assert_eq!(value["run"], "full_evaluation");

        for key in [
            "pods",
            "quorum",
            "nodes",
            "operator",
            "service",
            "storage",
            "replication",
            "certificates",
            "backup",
        ] {
            assert!(value["state"].get(key).is_some(), "missing state.{}", key);
        }
    }

    #[test]
    fn test_text_lists_every_match() {
        let matches = vec![
            m(Scenario::DiskExhaustion, Confidence::High),
            m(Scenario::DiskExhaustion, Confidence::High),
        ];
        let text = render_text(&run(RunPhase::FullEvaluation), &matches, &Thresholds::default(), false);
        assert_eq!(text.matches("[HIGH] Disk exhaustion").count(), 2);
        assert!(text.contains("runbooks/disk-exhaustion.md"));
        assert!(text.contains("[PROBES]"));
        assert!(text.contains("2 scenario match(es)"));
    }

    #[test]
    fn test_text_short_circuit_skips_dimension_summary() {
        let matches = vec![m(Scenario::ControlPlaneUnreachable, Confidence::Critical)];
        let text = render_text(&run(RunPhase::ShortCircuited), &matches, &Thresholds::default(), false);
        assert!(!text.contains("[PROBES]"));
        assert!(text.contains("[CRITICAL] Control plane unreachable"));
    }

    #[test]
    fn test_unconfirmed_dimensions_show_unknown() {
        let state = DiagnosticState::default();
        let summary = dimension_summary(&state, &Thresholds::default());
        let quorum = summary.iter().find(|(n, _, _)| *n == "quorum").unwrap();
        assert_eq!(quorum.1, DimensionHealth::Unknown);
        let dns = summary.iter().find(|(n, _, _)| *n == "dns").unwrap();
        assert_eq!(dns.1, DimensionHealth::Unknown);
    }

    #[test]
    fn test_plain_text_has_no_escape_codes() {
        let matches = vec![m(Scenario::SiteDown, Confidence::Critical)];
        let text = render_text(&run(RunPhase::FullEvaluation), &matches, &Thresholds::default(), false);
        assert!(!text.contains('\u{1b}'));
    }

    fn line(state: &DiagnosticState, name: &str) -> (DimensionHealth, String) {
        dimension_summary(state, &Thresholds::default())
            .into_iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, health, detail)| (health, detail))
            .unwrap()
    }

    #[test]
    fn test_full_volume_is_degraded() {
        let mut state = DiagnosticState::default();
        state.storage.bound = 1;
        state.storage.volumes = vec![VolumeUsage {
            name: "galera-0:/var/lib/mysql".to_string(),
            used_percent: 97,
        }];
        let (health, detail) = line(&state, "storage");
        assert_eq!(health, DimensionHealth::Degraded);
        assert!(detail.contains("97%"));

        state.storage.volumes[0].used_percent = 85;
        assert_eq!(line(&state, "storage").0, DimensionHealth::Healthy);
    }

    #[test]
    fn test_lagging_replica_is_degraded() {
        let mut state = DiagnosticState::default();
        state.replication.configured = true;
        state.replication.io_running = true;
        state.replication.sql_running = true;
        state.replication.seconds_behind = Some(400);
        let (health, detail) = line(&state, "replication");
        assert_eq!(health, DimensionHealth::Degraded);
        assert!(detail.contains("400s behind"));

        state.replication.seconds_behind = Some(300);
        assert_eq!(line(&state, "replication").0, DimensionHealth::Healthy);

        let strict = Thresholds {
            replication_lag_seconds: 60,
            ..Thresholds::default()
        };
        let summary = dimension_summary(&state, &strict);
        let replication = summary.iter().find(|(n, _, _)| *n == "replication").unwrap();
        assert_eq!(replication.1, DimensionHealth::Degraded);
    }
}
