//! Persistent volume claims and data volume usage.

use dbtriage_common::{StorageStatus, VolumeUsage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ClusterClient;

use super::{describe, items, str_at, ProbeContext};

/// Count claims by phase into `status`.
pub fn claims_from_json(list: &Value, status: &mut StorageStatus) {
    let claims = match items(list) {
        Ok(claims) => claims,
        Err(e) => {
            status.errors.push(describe("claim listing", &e));
            return;
        }
    };

    status.claims_total = claims.len() as u32;
    for claim in claims {
        match str_at(claim, "/status/phase") {
            Some("Bound") => status.bound += 1,
            Some("Pending") => {
                status.pending += 1;
                let name = str_at(claim, "/metadata/name").unwrap_or("<unnamed>");
                status.pending_claims.push(name.to_string());
            }
            _ => {}
        }
    }
}

/// Use% column of POSIX `df -P` output for a single mount.
pub fn parse_df(output: &str) -> Option<u8> {
    let last = output.lines().rev().find(|l| !l.trim().is_empty())?;
    last.split_whitespace()
        .find_map(|field| field.strip_suffix('%'))
        .and_then(|n| n.parse::<u8>().ok())
        .map(|n| n.min(100))
}

pub async fn probe(
    client: &dyn ClusterClient,
    ctx: &ProbeContext<'_>,
    running_pods: &[String],
) -> StorageStatus {
    let mut status = StorageStatus::default();
    let timeout = ctx.query_timeout();
    let selector = ctx.pod_selector();

    match client
        .get_json(&["pvc", "-n", ctx.namespace, "-l", selector.as_str()], timeout)
        .await
    {
        Ok(list) => claims_from_json(&list, &mut status),
        Err(e) => {
            warn!("claim listing failed: {}", e);
            status.errors.push(describe("get pvc", &e));
        }
    }

    let data_dir = ctx.config.cluster.data_dir.as_str();
    let script = format!("df -P {}", data_dir);
    for pod in running_pods {
        match client
            .exec(ctx.namespace, pod, ctx.database_container(), &script, timeout)
            .await
        {
            Ok(output) => match parse_df(&output) {
                Some(used) => {
                    debug!("{}:{} at {}%", pod, data_dir, used);
                    status.volumes.push(VolumeUsage {
                        name: format!("{}:{}", pod, data_dir),
                        used_percent: used,
                    });
                }
                None => status
                    .errors
                    .push(format!("df on {} returned no usage: {:?}", pod, output.trim())),
            },
            Err(e) => status.errors.push(describe(&format!("df on {}", pod), &e)),
        }
    }

    status
}
