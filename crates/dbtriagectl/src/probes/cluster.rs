//! Database cluster name auto-detection.
//!
//! Used when no `--cluster` is given. The first database custom resource in
//! the namespace wins; without one, the instance label of the first database
//! pod is used.

use serde_json::Value;
use tracing::{debug, info};

use crate::client::ClusterClient;

use super::{items, str_at, ProbeContext};

const INSTANCE_LABEL: &str = "/metadata/labels/app.kubernetes.io~1instance";

/// Name of the first listed object.
pub fn first_resource_name(list: &Value) -> Option<String> {
    items(list)
        .ok()?
        .iter()
        .find_map(|item| str_at(item, "/metadata/name"))
        .map(str::to_string)
}

/// Instance label of the first pod that carries one.
pub fn first_instance_label(list: &Value) -> Option<String> {
    items(list)
        .ok()?
        .iter()
        .find_map(|pod| str_at(pod, INSTANCE_LABEL))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub async fn detect(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> Option<String> {
    let timeout = ctx.query_timeout();
    let resource = ctx.config.cluster.cluster_resource.as_str();

    match client.get_json(&[resource, "-n", ctx.namespace], timeout).await {
        Ok(list) => {
            if let Some(name) = first_resource_name(&list) {
                info!("detected cluster {} from {}", name, resource);
                return Some(name);
            }
        }
        Err(e) => debug!("{} not listable: {}", resource, e),
    }

    let selector = ctx.config.cluster.pod_selector_for(None);
    match client
        .get_json(&["pods", "-n", ctx.namespace, "-l", selector.as_str()], timeout)
        .await
    {
        Ok(list) => {
            let name = first_instance_label(&list);
            if let Some(name) = &name {
                info!("detected cluster {} from pod labels", name);
            }
            name
        }
        Err(e) => {
            debug!("pod listing for cluster detection failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FakeClusterClient;
    use dbtriage_common::TriageConfig;
    use serde_json::json;

    #[test]
    fn test_first_resource_name() {
        let list = json!({"items": [{"metadata": {"name": "galera"}}, {"metadata": {"name": "other"}}]});
        assert_eq!(first_resource_name(&list).as_deref(), Some("galera"));
        assert_eq!(first_resource_name(&json!({"items": []})), None);
    }

    #[test]
    fn test_instance_label() {
        let list = json!({"items": [
            {"metadata": {"name": "x", "labels": {}}},
            {"metadata": {"name": "galera-0", "labels": {"app.kubernetes.io/instance": "galera"}}}
        ]});
        assert_eq!(first_instance_label(&list).as_deref(), Some("galera"));
    }

    #[tokio::test]
    async fn test_falls_back_to_pod_labels() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", None, &config);
        let fake = FakeClusterClient::new()
            .respond("get mariadbs.k8s.mariadb.com -n db", r#"{"items": []}"#)
            .respond(
                "get pods -n db -l app.kubernetes.io/name=mariadb",
                r#"{"items": [{"metadata": {"name": "g-0", "labels": {"app.kubernetes.io/instance": "g"}}}]}"#,
            );
        assert_eq!(detect(&fake, &ctx).await.as_deref(), Some("g"));
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let config = TriageConfig::default();
        let ctx = ProbeContext::new("db", None, &config);
        let fake = FakeClusterClient::new();
        assert_eq!(detect(&fake, &ctx).await, None);
    }
}
