//! State aggregation - runs every probe once and assembles the snapshot.
//!
//! The control-plane probe always runs first. When it fails the run is
//! short-circuited and every other dimension stays at its default. Otherwise
//! the probes run sequentially in a fixed order.

use dbtriage_common::{DiagnosticRun, DiagnosticState, RunPhase, TriageConfig};
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::probes::{self, ProbeContext};

pub struct Aggregator<'a> {
    client: &'a dyn ClusterClient,
    config: &'a TriageConfig,
    namespace: String,
    cluster: Option<String>,
}

fn note_degraded(dimension: &str, errors: &[String]) {
    if errors.is_empty() {
        debug!("{} probe done", dimension);
    } else {
        warn!("{} probe degraded: {}", dimension, errors.join("; "));
    }
}

impl<'a> Aggregator<'a> {
    pub fn new(
        client: &'a dyn ClusterClient,
        config: &'a TriageConfig,
        namespace: impl Into<String>,
        cluster: Option<String>,
    ) -> Self {
        Self {
            client,
            config,
            namespace: namespace.into(),
            cluster,
        }
    }

    pub async fn run(&self) -> DiagnosticRun {
        let control_plane =
            probes::control_plane::probe(self.client, self.config.timeouts.query()).await;
        if !control_plane.reachable {
            info!("control plane unreachable, skipping remaining probes");
            return DiagnosticRun {
                phase: RunPhase::ShortCircuited,
                state: DiagnosticState::unreachable(self.namespace.clone(), control_plane.errors),
            };
        }
        info!("control plane reachable, probing namespace {}", self.namespace);

        let environment =
            probes::environment::probe(self.client, self.config.timeouts.query()).await;

        let cluster = match &self.cluster {
            Some(name) => Some(name.clone()),
            None => {
                let ctx = ProbeContext::new(&self.namespace, None, self.config);
                probes::cluster::detect(self.client, &ctx).await
            }
        };
        if cluster.is_none() {
            warn!("no database cluster found in {}", self.namespace);
        }
        let ctx = ProbeContext::new(&self.namespace, cluster.as_deref(), self.config);

        let dns = probes::dns::probe(self.client, &ctx).await;
        note_degraded("dns", &dns.errors);

        let pods = probes::pods::probe(self.client, &ctx).await;
        note_degraded("pods", &pods.errors);
        let first_running = pods.first_running().map(str::to_string);

        let quorum = probes::quorum::probe(self.client, &ctx, first_running.as_deref()).await;
        note_degraded("quorum", &quorum.errors);

        let nodes = probes::nodes::probe(self.client, &ctx).await;
        note_degraded("nodes", &nodes.errors);

        let operator = probes::operator::probe(self.client, &ctx).await;
        note_degraded("operator", &operator.errors);

        let service = probes::service::probe(self.client, &ctx).await;
        note_degraded("service", &service.errors);

        let storage = probes::storage::probe(self.client, &ctx, &pods.running_pods).await;
        note_degraded("storage", &storage.errors);

        let replication =
            probes::replication::probe(self.client, &ctx, first_running.as_deref()).await;
        note_degraded("replication", &replication.errors);

        let certificates = probes::certificate::probe(self.client, &ctx).await;
        note_degraded("certificates", &certificates.errors);

        let backup = probes::backup::probe(self.client, &ctx).await;
        note_degraded("backup", &backup.errors);

        info!("all probes finished");
        DiagnosticRun {
            phase: RunPhase::FullEvaluation,
            state: DiagnosticState {
                namespace: self.namespace.clone(),
                cluster,
                control_plane_reachable: true,
                dns_working: dns.working,
                environment,
                control_plane_errors: control_plane.errors,
                dns_errors: dns.errors,
                pods,
                quorum,
                nodes,
                operator,
                service,
                storage,
                replication,
                certificates,
                backup,
            },
        }
    }
}
