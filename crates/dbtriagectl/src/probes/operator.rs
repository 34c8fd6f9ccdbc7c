//! Database operator deployment health, searched across all namespaces.

use dbtriage_common::OperatorStatus;
use serde_json::Value;
use tracing::warn;

use crate::client::ClusterClient;

use super::{describe, items, str_at, u32_at, ProbeContext};

pub fn from_json(list: &Value) -> OperatorStatus {
    let deployments = match items(list) {
        Ok(deployments) => deployments,
        Err(e) => {
            return OperatorStatus {
                errors: vec![describe("operator deployment listing", &e)],
                ..OperatorStatus::default()
            }
        }
    };

    let mut status = OperatorStatus {
        found: !deployments.is_empty(),
        ..OperatorStatus::default()
    };

    for deployment in deployments {
        let namespace = str_at(deployment, "/metadata/namespace").unwrap_or("");
        let name = str_at(deployment, "/metadata/name").unwrap_or("<unnamed>");
        status.deployments.push(if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", namespace, name)
        });

        let desired = u32_at(deployment, "/spec/replicas").unwrap_or(1);
        let ready = u32_at(deployment, "/status/readyReplicas")
            .or_else(|| u32_at(deployment, "/status/availableReplicas"))
            .unwrap_or(0);
        status.desired_replicas += desired;
        status.ready_replicas += ready;
        if ready >= 1 {
            status.running = true;
        }
    }

    status
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> OperatorStatus {
    let selector = ctx.config.cluster.operator_selector.as_str();
    match client
        .get_json(&["deployments", "-A", "-l", selector], ctx.query_timeout())
        .await
    {
        Ok(list) => from_json(&list),
        Err(e) => {
            warn!("operator probe failed: {}", e);
            OperatorStatus {
                errors: vec![describe("get deployments", &e)],
                ..OperatorStatus::default()
            }
        }
    }
}
