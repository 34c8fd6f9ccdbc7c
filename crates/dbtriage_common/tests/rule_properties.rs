//! Property tests for the rule engine.
//!
//! Randomised states come from a small xorshift generator instead of an
//! external crate.
//!
//! Properties:
//! - unreachable control plane yields exactly one CRITICAL match
//! - reachable quorum without Primary always yields CRITICAL quorum loss
//! - replication broken and replication lag never fire together
//! - evaluation is idempotent and order-stable
//! - sorted output is non-decreasing in confidence

use dbtriage_common::report::{exit_code, sort_matches};
use dbtriage_common::{
    evaluate, BackupOutcome, BackupRecord, ClusterStatusLabel, Confidence, DiagnosticState,
    Environment, Scenario, VolumeUsage,
};

const ITERATIONS: u64 = 2_000;

struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    fn flag(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

fn random_state(rng: &mut TestRng) -> DiagnosticState {
    let mut s = DiagnosticState {
        namespace: "db".to_string(),
        cluster: Some("galera".to_string()),
        control_plane_reachable: rng.below(8) != 0,
        dns_working: rng.flag(),
        environment: Environment::Generic,
        ..DiagnosticState::default()
    };

    s.pods.total = rng.below(6) as u32;
    s.pods.running = rng.below(s.pods.total as u64 + 1) as u32;
    s.pods.crash_loop_count = rng.below(3) as u32;
    s.pods.pending_count = rng.below(2) as u32;
    s.pods.oom_killed_count = rng.below(2) as u32;
    s.pods.all_down = s.pods.running == 0 && s.pods.total > 0;

    s.quorum.reachable = rng.flag();
    s.quorum.has_quorum = s.quorum.reachable && rng.flag();
    s.quorum.cluster_size = rng.below(4) as u32;
    s.quorum.status_label = if s.quorum.has_quorum {
        ClusterStatusLabel::Primary
    } else {
        ClusterStatusLabel::NonPrimary
    };

    s.nodes.total = rng.below(5) as u32;
    s.nodes.ready = rng.below(s.nodes.total as u64 + 1) as u32;
    s.nodes.not_ready = s.nodes.total - s.nodes.ready;
    s.nodes.disk_pressure = rng.below(2) as u32;
    s.nodes.memory_pressure = rng.below(2) as u32;

    s.operator.found = rng.flag();
    s.operator.running = s.operator.found && rng.flag();
    s.service.found = rng.flag();
    s.service.has_endpoints = s.service.found && rng.flag();

    for i in 0..rng.below(4) {
        s.storage.volumes.push(VolumeUsage {
            name: format!("galera-{}:/var/lib/mysql", i),
            used_percent: rng.below(101) as u8,
        });
    }
    s.storage.pending = rng.below(2) as u32;

    s.replication.configured = rng.flag();
    s.replication.io_running = rng.flag();
    s.replication.sql_running = rng.flag();
    s.replication.seconds_behind = if rng.flag() {
        Some(rng.below(1_000))
    } else {
        None
    };

    if rng.flag() {
        s.backup.checked = true;
        s.backup.most_recent_failed = rng.flag();
        s.backup.most_recent = Some(BackupRecord {
            name: "nightly".to_string(),
            created_at: None,
            outcome: if s.backup.most_recent_failed {
                BackupOutcome::Failed
            } else {
                BackupOutcome::Succeeded
            },
        });
    }

    if rng.flag() {
        s.certificates.checked = true;
        if rng.flag() {
            s.certificates.expired.push("server-tls".to_string());
        } else if rng.flag() {
            s.certificates.expiring_soon.push("client-tls".to_string());
        }
    }

    s
}

fn nominal() -> DiagnosticState {
    let mut s = DiagnosticState {
        namespace: "db".to_string(),
        cluster: Some("galera".to_string()),
        control_plane_reachable: true,
        dns_working: true,
        environment: Environment::Kind,
        ..DiagnosticState::default()
    };
    s.pods.total = 3;
    s.pods.running = 3;
    s.quorum.reachable = true;
    s.quorum.has_quorum = true;
    s.quorum.cluster_size = 3;
    s.quorum.status_label = ClusterStatusLabel::Primary;
    s.nodes.total = 3;
    s.nodes.ready = 3;
    s.operator.found = true;
    s.operator.running = true;
    s.service.found = true;
    s.service.has_endpoints = true;
    s
}

#[test]
fn prop_short_circuit_is_total() {
    let mut rng = TestRng::new(0xD1A6);
    for _ in 0..ITERATIONS {
        let mut s = random_state(&mut rng);
        s.control_plane_reachable = false;
        let matches = evaluate(&s);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, Confidence::Critical);
        assert!(matches[0].is(Scenario::ControlPlaneUnreachable));
    }
}

#[test]
fn prop_quorum_loss_always_reported() {
    let mut rng = TestRng::new(42);
    for _ in 0..ITERATIONS {
        let mut s = random_state(&mut rng);
        s.control_plane_reachable = true;
        s.quorum.reachable = true;
        s.quorum.has_quorum = false;
        let matches = evaluate(&s);
        assert!(matches
            .iter()
            .any(|m| m.is(Scenario::QuorumLoss) && m.confidence == Confidence::Critical));
    }
}

#[test]
fn prop_replication_rules_exclusive() {
    let mut rng = TestRng::new(7);
    for _ in 0..ITERATIONS {
        let s = random_state(&mut rng);
        let matches = evaluate(&s);
        let broken = matches.iter().any(|m| m.is(Scenario::ReplicationBroken));
        let lag = matches.iter().any(|m| m.is(Scenario::ReplicationLag));
        assert!(!(broken && lag), "both replication rules fired for {:?}", s.replication);
    }
}

#[test]
fn prop_evaluation_idempotent() {
    let mut rng = TestRng::new(99);
    for _ in 0..ITERATIONS {
        let s = random_state(&mut rng);
        assert_eq!(evaluate(&s), evaluate(&s));
    }
}

#[test]
fn prop_sorted_confidence_non_decreasing() {
    let mut rng = TestRng::new(1234);
    for _ in 0..ITERATIONS {
        let s = random_state(&mut rng);
        let mut matches = evaluate(&s);
        sort_matches(&mut matches);
        for pair in matches.windows(2) {
            assert!(pair[0].confidence <= pair[1].confidence);
        }
    }
}

#[test]
fn scenario_single_pod_failure() {
    let mut s = DiagnosticState {
        control_plane_reachable: true,
        ..DiagnosticState::default()
    };
    s.pods.total = 3;
    s.pods.running = 2;
    s.pods.crash_loop_count = 1;
    s.pods.oom_killed_count = 0;
    s.quorum.reachable = true;
    s.quorum.has_quorum = true;

    let matches = evaluate(&s);
    let single: Vec<_> = matches
        .iter()
        .filter(|m| m.is(Scenario::SingleUnitFailure))
        .collect();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].confidence, Confidence::High);
    assert!(!matches.iter().any(|m| m.is(Scenario::QuorumLoss)));
}

#[test]
fn scenario_all_pods_down() {
    let mut s = DiagnosticState {
        control_plane_reachable: true,
        ..DiagnosticState::default()
    };
    s.pods.total = 3;
    s.pods.running = 0;
    s.pods.all_down = true;

    let matches = evaluate(&s);
    let site: Vec<_> = matches.iter().filter(|m| m.is(Scenario::SiteDown)).collect();
    assert_eq!(site.len(), 1);
    assert_eq!(site[0].confidence, Confidence::Critical);
}

#[test]
fn scenario_replication_lag() {
    let mut s = nominal();
    s.replication.configured = true;
    s.replication.io_running = true;
    s.replication.sql_running = true;
    s.replication.seconds_behind = Some(400);

    let matches = evaluate(&s);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].is(Scenario::ReplicationLag));
    assert_eq!(matches[0].confidence, Confidence::Medium);
    assert!(matches[0].evidence.iter().any(|e| e.contains("400")));
}

#[test]
fn scenario_volume_at_97_percent() {
    let mut s = nominal();
    s.storage.volumes.push(VolumeUsage {
        name: "x".to_string(),
        used_percent: 97,
    });

    let matches = evaluate(&s);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].is(Scenario::DiskExhaustion));
    assert_eq!(matches[0].confidence, Confidence::Critical);
    assert!(matches[0].evidence[0].contains("x at 97%"));
}

#[test]
fn scenario_all_nominal() {
    let matches = evaluate(&nominal());
    assert!(matches.is_empty());
    assert_eq!(exit_code(&matches), 0);
}
