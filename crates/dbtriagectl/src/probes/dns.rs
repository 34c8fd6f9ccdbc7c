//! In-cluster name resolution, checked from inside a running database pod.

use std::net::IpAddr;
use tracing::{debug, warn};

use crate::client::ClusterClient;

use super::{describe, items, pods, ProbeContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsCheck {
    pub working: bool,
    pub errors: Vec<String>,
}

/// `getent hosts` resolved when any line starts with an address.
pub fn resolved(output: &str) -> bool {
    output.lines().any(|line| {
        line.split_whitespace()
            .next()
            .map(|token| token.parse::<IpAddr>().is_ok())
            .unwrap_or(false)
    })
}

async fn first_running_pod(
    client: &dyn ClusterClient,
    ctx: &ProbeContext<'_>,
) -> Result<Option<String>, String> {
    let selector = ctx.pod_selector();
    let list = client
        .get_json(
            &[
                "pods",
                "-n",
                ctx.namespace,
                "-l",
                selector.as_str(),
                "--field-selector",
                "status.phase=Running",
            ],
            ctx.query_timeout(),
        )
        .await
        .map_err(|e| describe("running pod lookup", &e))?;
    items(&list).map_err(|e| describe("running pod lookup", &e))?;
    // Phase Running alone still admits crash-looping members.
    Ok(pods::first_serving(&list, ctx.database_container()))
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> DnsCheck {
    let pod = match first_running_pod(client, ctx).await {
        Ok(Some(pod)) => pod,
        Ok(None) => {
            return DnsCheck {
                working: false,
                errors: vec!["no running database pod to resolve names from".to_string()],
            }
        }
        Err(e) => {
            return DnsCheck {
                working: false,
                errors: vec![e],
            }
        }
    };

    let name = ctx.config.cluster.dns_probe_name.as_str();
    let script = format!("getent hosts {}", name);
    debug!("resolving {} from {}", name, pod);

    match client
        .exec(ctx.namespace, &pod, ctx.database_container(), &script, ctx.dns_timeout())
        .await
    {
        Ok(output) if resolved(&output) => DnsCheck {
            working: true,
            errors: Vec::new(),
        },
        Ok(_) => DnsCheck {
            working: false,
            errors: vec![format!("{} did not resolve from {}", name, pod)],
        },
        Err(e) => {
            warn!("dns lookup from {} failed: {}", pod, e);
            DnsCheck {
                working: false,
                errors: vec![describe(&format!("getent hosts {} in {}", name, pod), &e)],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FakeClusterClient, ProbeError};
    use dbtriage_common::TriageConfig;

    const RUNNING: &str =
        r#"{"items": [{"metadata": {"name": "galera-1"}, "status": {"phase": "Running"}}]}"#;

    #[test]
    fn test_resolved_output() {
        assert!(resolved("10.96.0.1       kubernetes.default.svc.cluster.local\n"));
        assert!(resolved("fd00::1 kubernetes.default.svc.cluster.local"));
        assert!(!resolved(""));
        assert!(!resolved("getent: not found"));
    }

    #[tokio::test]
    async fn test_resolves_from_first_running_pod() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let fake = FakeClusterClient::new()
            .respond("status.phase=Running", RUNNING)
            .respond("getent hosts", "10.96.0.1 kubernetes.default.svc.cluster.local\n");
        let check = probe(&fake, &ctx).await;
        assert!(check.working);
        assert!(fake.calls()[1].starts_with("exec -n db galera-1 -c mariadb"));
    }

    #[tokio::test]
    async fn test_skips_crash_looping_pod() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let listing = r#"{"items": [
            {"metadata": {"name": "galera-0"}, "status": {"phase": "Running", "containerStatuses": [
                {"name": "mariadb", "state": {"waiting": {"reason": "CrashLoopBackOff"}}}]}},
            {"metadata": {"name": "galera-1"}, "status": {"phase": "Running", "containerStatuses": [
                {"name": "mariadb", "state": {"running": {}}}]}}
        ]}"#;
        let fake = FakeClusterClient::new()
            .respond("status.phase=Running", listing)
            .fail("exec -n db galera-0", ProbeError::Timeout(15))
            .respond("exec -n db galera-1", "10.96.0.1 kubernetes.default.svc.cluster.local\n");
        let check = probe(&fake, &ctx).await;
        assert!(check.working, "{:?}", check.errors);
        assert!(!fake.calls().iter().any(|c| c.contains("galera-0")));
    }

    #[tokio::test]
    async fn test_lookup_timeout() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let fake = FakeClusterClient::new()
            .respond("status.phase=Running", RUNNING)
            .fail("getent hosts", ProbeError::Timeout(15));
        let check = probe(&fake, &ctx).await;
        assert!(!check.working);
        assert!(check.errors[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_no_running_pod() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", Some("galera"), &config);
        let fake = FakeClusterClient::new().respond("status.phase=Running", r#"{"items": []}"#);
        let check = probe(&fake, &ctx).await;
        assert!(!check.working);
        assert_eq!(check.errors.len(), 1);
    }
}
