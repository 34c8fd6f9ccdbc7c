//! Galera membership queried from the first running database unit.

use dbtriage_common::{ClusterStatusLabel, QuorumStatus};
use tracing::{debug, warn};

use crate::client::ClusterClient;

use super::{describe, sql_script, ProbeContext};

const STATUS_QUERY: &str =
    "SHOW GLOBAL STATUS WHERE Variable_name IN ('wsrep_cluster_status','wsrep_cluster_size')";

/// Parse tab-separated `Variable_name  Value` rows.
///
/// A recognised label makes the unit reachable. A missing or unrecognised
/// label leaves quorum unknown.
pub fn parse_status(output: &str) -> QuorumStatus {
    let mut label = None;
    let mut size = 0;

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(key), Some(value)) if key.eq_ignore_ascii_case("wsrep_cluster_status") => {
                label = Some(ClusterStatusLabel::parse(value));
            }
            (Some(key), Some(value)) if key.eq_ignore_ascii_case("wsrep_cluster_size") => {
                size = value.parse().unwrap_or(0);
            }
            _ => {}
        }
    }

    match label {
        Some(ClusterStatusLabel::Unknown) | None => QuorumStatus {
            cluster_size: size,
            errors: vec![format!(
                "wsrep_cluster_status missing or unrecognised in {:?}",
                output.trim()
            )],
            ..QuorumStatus::default()
        },
        Some(label) => QuorumStatus {
            reachable: true,
            has_quorum: label == ClusterStatusLabel::Primary,
            cluster_size: size,
            status_label: label,
            ..QuorumStatus::default()
        },
    }
}

pub async fn probe(
    client: &dyn ClusterClient,
    ctx: &ProbeContext<'_>,
    first_running: Option<&str>,
) -> QuorumStatus {
    let Some(pod) = first_running else {
        debug!("no running unit, quorum unknown");
        return QuorumStatus {
            errors: vec!["no running database pod to query".to_string()],
            ..QuorumStatus::default()
        };
    };

    let script = sql_script(STATUS_QUERY, false);
    let mut status = match client
        .exec(ctx.namespace, pod, ctx.database_container(), &script, ctx.query_timeout())
        .await
    {
        Ok(output) => parse_status(&output),
        Err(e) => {
            warn!("quorum query on {} failed: {}", pod, e);
            QuorumStatus {
                errors: vec![describe(&format!("wsrep status on {}", pod), &e)],
                ..QuorumStatus::default()
            }
        }
    };
    status.queried_pod = Some(pod.to_string());
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FakeClusterClient, ProbeError};
    use dbtriage_common::TriageConfig;

    #[test]
    fn test_primary() {
        let s = parse_status("wsrep_cluster_size\t3\nwsrep_cluster_status\tPrimary\n");
        assert!(s.reachable);
        assert!(s.has_quorum);
        assert_eq!(s.cluster_size, 3);
        assert_eq!(s.status_label, ClusterStatusLabel::Primary);
    }

    #[test]
    fn test_non_primary() {
        let s = parse_status("wsrep_cluster_size\t1\nwsrep_cluster_status\tnon-Primary\n");
        assert!(s.reachable);
        assert!(!s.has_quorum);
        assert_eq!(s.status_label, ClusterStatusLabel::NonPrimary);
    }

    #[test]
    fn test_missing_label_is_unknown() {
        let s = parse_status("");
        assert!(!s.reachable);
        assert!(!s.has_quorum);
        assert_eq!(s.status_label, ClusterStatusLabel::Unknown);
        assert_eq!(s.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_no_running_unit() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let fake = FakeClusterClient::new();
        let s = probe(&fake, &ctx, None).await;
        assert!(!s.reachable);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_exec_failure_is_unknown() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let fake = FakeClusterClient::new().fail(
            "exec -n db galera-0",
            ProbeError::CommandFailed {
                code: 1,
                stderr: "container not found".to_string(),
            },
        );
        let s = probe(&fake, &ctx, Some("galera-0")).await;
        assert!(!s.reachable);
        assert_eq!(s.queried_pod.as_deref(), Some("galera-0"));
        assert!(s.errors[0].contains("container not found"));
    }
}
