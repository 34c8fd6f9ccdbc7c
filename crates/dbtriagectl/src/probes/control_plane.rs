//! Control-plane reachability. Always runs first and gates every other probe.

use std::time::Duration;
use tracing::warn;

use crate::client::ClusterClient;

use super::describe;

const READYZ: &str = "/readyz";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlPlaneCheck {
    pub reachable: bool,
    pub errors: Vec<String>,
}

/// Any answer from the API server counts as reachable; a body other than
/// "ok" is kept as evidence.
pub async fn probe(client: &dyn ClusterClient, timeout: Duration) -> ControlPlaneCheck {
    match client.get_raw(READYZ, timeout).await {
        Ok(body) => {
            let body = body.trim();
            let mut errors = Vec::new();
            if body != "ok" {
                errors.push(format!("{} answered: {}", READYZ, body));
            }
            ControlPlaneCheck {
                reachable: true,
                errors,
            }
        }
        Err(e) => {
            warn!("control plane unreachable: {}", e);
            ControlPlaneCheck {
                reachable: false,
                errors: vec![describe("get --raw /readyz", &e)],
            }
        }
    }
}
