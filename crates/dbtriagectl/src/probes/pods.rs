//! Database unit health from the pod listing.

use dbtriage_common::PodStatus;
use serde_json::Value;
use tracing::warn;

use crate::client::ClusterClient;

use super::{describe, items, str_at, ProbeContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Evicted,
    CrashLoop,
    Running,
    Pending,
    Other,
}

fn container_statuses(pod: &Value) -> impl Iterator<Item = &Value> {
    ["/status/containerStatuses", "/status/initContainerStatuses"]
        .into_iter()
        .filter_map(move |p| pod.pointer(p).and_then(Value::as_array))
        .flatten()
}

/// Each pod lands in exactly one bucket, checked in this order.
fn classify(pod: &Value) -> Bucket {
    let phase = str_at(pod, "/status/phase").unwrap_or("");
    if phase == "Failed" && str_at(pod, "/status/reason") == Some("Evicted") {
        return Bucket::Evicted;
    }
    if container_statuses(pod)
        .any(|c| str_at(c, "/state/waiting/reason") == Some("CrashLoopBackOff"))
    {
        return Bucket::CrashLoop;
    }
    match phase {
        "Running" => Bucket::Running,
        "Pending" => Bucket::Pending,
        _ => Bucket::Other,
    }
}

/// OOM kills are counted apart from the phase buckets.
fn oom_killed(pod: &Value) -> bool {
    container_statuses(pod).any(|c| {
        str_at(c, "/state/terminated/reason") == Some("OOMKilled")
            || str_at(c, "/lastState/terminated/reason") == Some("OOMKilled")
    })
}

/// First pod in the running bucket whose `container` is itself running.
///
/// Pods that do not report the container at all are accepted.
pub fn first_serving(list: &Value, container: &str) -> Option<String> {
    items(list).ok()?.iter().find_map(|pod| {
        if classify(pod) != Bucket::Running {
            return None;
        }
        let status = container_statuses(pod)
            .find(|c| c.get("name").and_then(Value::as_str) == Some(container));
        match status {
            Some(c) if c.pointer("/state/running").is_none() => None,
            _ => str_at(pod, "/metadata/name").map(str::to_string),
        }
    })
}

pub fn from_json(list: &Value) -> PodStatus {
    let pods = match items(list) {
        Ok(pods) => pods,
        Err(e) => {
            return PodStatus {
                errors: vec![describe("pod listing", &e)],
                ..PodStatus::default()
            }
        }
    };

    let mut status = PodStatus {
        total: pods.len() as u32,
        ..PodStatus::default()
    };

    for pod in pods {
        let name = str_at(pod, "/metadata/name").unwrap_or("<unnamed>");
        match classify(pod) {
            Bucket::Evicted => status.evicted_count += 1,
            Bucket::CrashLoop => status.crash_loop_count += 1,
            Bucket::Running => {
                status.running += 1;
                status.running_pods.push(name.to_string());
            }
            Bucket::Pending => status.pending_count += 1,
            Bucket::Other => {}
        }
        if oom_killed(pod) {
            status.oom_killed_count += 1;
        }
    }

    status.all_down = status.running == 0 && status.total > 0;
    status
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> PodStatus {
    let selector = ctx.pod_selector();
    match client
        .get_json(&["pods", "-n", ctx.namespace, "-l", selector.as_str()], ctx.query_timeout())
        .await
    {
        Ok(list) => {
            let status = from_json(&list);
            if status.total == 0 {
                warn!("no database pods match {} in {}", selector, ctx.namespace);
            }
            status
        }
        Err(e) => {
            warn!("pod probe failed: {}", e);
            PodStatus {
                errors: vec![describe("get pods", &e)],
                ..PodStatus::default()
            }
        }
    }
}
