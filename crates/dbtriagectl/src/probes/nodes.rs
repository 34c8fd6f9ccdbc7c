//! Node readiness and resource pressure.

use dbtriage_common::NodeStatus;
use serde_json::Value;
use tracing::warn;

use crate::client::ClusterClient;

use super::{condition_true, describe, items, str_at, ProbeContext};

pub fn from_json(list: &Value) -> NodeStatus {
    let nodes = match items(list) {
        Ok(nodes) => nodes,
        Err(e) => {
            return NodeStatus {
                errors: vec![describe("node listing", &e)],
                ..NodeStatus::default()
            }
        }
    };

    let mut status = NodeStatus {
        total: nodes.len() as u32,
        ..NodeStatus::default()
    };

    for node in nodes {
        let name = str_at(node, "/metadata/name").unwrap_or("<unnamed>").to_string();
        let conditions = node.pointer("/status/conditions");

        if condition_true(conditions, "Ready") {
            status.ready += 1;
        } else {
            status.not_ready_nodes.push(name.clone());
        }

        let mut pressured = false;
        if condition_true(conditions, "DiskPressure") {
            status.disk_pressure += 1;
            pressured = true;
        }
        if condition_true(conditions, "MemoryPressure") {
            status.memory_pressure += 1;
            pressured = true;
        }
        if condition_true(conditions, "PIDPressure") {
            status.pid_pressure += 1;
            pressured = true;
        }
        if pressured {
            status.pressured_nodes.push(name);
        }
    }

    // A node without a Ready condition counts as not ready.
    status.not_ready = status.total - status.ready;
    status
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> NodeStatus {
    match client.get_json(&["nodes"], ctx.query_timeout()).await {
        Ok(list) => from_json(&list),
        Err(e) => {
            warn!("node probe failed: {}", e);
            NodeStatus {
                errors: vec![describe("get nodes", &e)],
                ..NodeStatus::default()
            }
        }
    }
}
