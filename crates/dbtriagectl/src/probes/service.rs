//! Client-facing service endpoints.

use dbtriage_common::ServiceStatus;
use serde_json::Value;
use tracing::warn;

use crate::client::{ClusterClient, ProbeError};

use super::{describe, ProbeContext};

fn count(subsets: &[Value], field: &str) -> u32 {
    subsets
        .iter()
        .filter_map(|s| s.get(field).and_then(Value::as_array))
        .map(|a| a.len() as u32)
        .sum()
}

/// Parse one `Endpoints` object.
pub fn from_json(name: &str, endpoints: &Value) -> ServiceStatus {
    let subsets = endpoints
        .get("subsets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let ready = count(subsets, "addresses");
    ServiceStatus {
        service_name: Some(name.to_string()),
        found: true,
        has_endpoints: ready > 0,
        ready_addresses: ready,
        not_ready_addresses: count(subsets, "notReadyAddresses"),
        errors: Vec::new(),
    }
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> ServiceStatus {
    let Some(name) = ctx.config.cluster.service_name_for(ctx.cluster) else {
        return ServiceStatus {
            errors: vec!["no cluster name or service name to look up".to_string()],
            ..ServiceStatus::default()
        };
    };

    match client
        .get_json(&["endpoints", name.as_str(), "-n", ctx.namespace], ctx.query_timeout())
        .await
    {
        Ok(endpoints) => from_json(&name, &endpoints),
        Err(e) => {
            // NotFound means the service itself is missing.
            let missing = matches!(&e, ProbeError::CommandFailed { stderr, .. } if stderr.contains("NotFound"));
            if !missing {
                warn!("endpoint probe for {} failed: {}", name, e);
            }
            ServiceStatus {
                service_name: Some(name.clone()),
                errors: vec![describe(&format!("get endpoints {}", name), &e)],
                ..ServiceStatus::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_addresses() {
        let ep = json!({"subsets": [{
            "addresses": [{"ip": "10.0.0.1"}, {"ip": "10.0.0.2"}],
            "notReadyAddresses": [{"ip": "10.0.0.3"}]
        }]});
        let s = from_json("galera", &ep);
        assert!(s.found);
        assert!(s.has_endpoints);
        assert_eq!(s.ready_addresses, 2);
        assert_eq!(s.not_ready_addresses, 1);
    }

    #[test]
    fn test_only_not_ready() {
        let ep = json!({"subsets": [{"notReadyAddresses": [{"ip": "10.0.0.3"}]}]});
        let s = from_json("galera", &ep);
        assert!(s.found);
        assert!(!s.has_endpoints);
    }

    #[test]
    fn test_no_subsets() {
        let s = from_json("galera", &json!({"metadata": {"name": "galera"}}));
        assert!(!s.has_endpoints);
        assert_eq!(s.ready_addresses, 0);
    }
}
