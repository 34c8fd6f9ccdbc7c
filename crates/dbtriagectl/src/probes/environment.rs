//! Deployment environment detection from the active context.

use dbtriage_common::Environment;
use std::time::Duration;
use tracing::debug;

use crate::client::ClusterClient;

/// Unknown when the context cannot be read. Never fatal.
pub async fn probe(client: &dyn ClusterClient, timeout: Duration) -> Environment {
    match client.current_context(timeout).await {
        Ok(context) => {
            let env = Environment::from_context(&context);
            debug!("context {:?} classified as {}", context, env);
            env
        }
        Err(e) => {
            debug!("could not read current context: {}", e);
            Environment::Unknown
        }
    }
}
