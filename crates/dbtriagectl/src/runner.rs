//! One diagnostic run: configuration, credentials, probes, rules, report.

use anyhow::{Context, Result};
use dbtriage_common::report::{exit_code, render_json, render_text, sort_matches};
use dbtriage_common::{
    DiagnosticRun, RuleEngine, ScenarioMatch, Thresholds, TriageConfig, TriageError,
};
use std::io::{IsTerminal, Write};
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::cli::Cli;
use crate::client::{ClusterClient, KubectlClient};
use crate::credentials::CredentialSources;

/// Probe the target and rank the matching scenarios.
pub async fn diagnose(
    client: &dyn ClusterClient,
    config: &TriageConfig,
    namespace: &str,
    cluster: Option<String>,
) -> (DiagnosticRun, Vec<ScenarioMatch>) {
    let run = Aggregator::new(client, config, namespace, cluster).run().await;
    let engine = RuleEngine::new(config.thresholds.clone());
    let mut matches = engine.evaluate(&run.state);
    sort_matches(&mut matches);
    info!("{} scenario(s) matched", matches.len());
    (run, matches)
}

pub fn render(
    run: &DiagnosticRun,
    matches: &[ScenarioMatch],
    thresholds: &Thresholds,
    json: bool,
    color: bool,
) -> Result<String, TriageError> {
    if json {
        Ok(render_json(run, matches)?)
    } else {
        Ok(render_text(run, matches, thresholds, color))
    }
}

/// Execute the CLI and return the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    if cli.namespace.trim().is_empty() {
        return Err(TriageError::InvalidArgument("namespace must not be empty".to_string()).into());
    }

    let config = TriageConfig::resolve(cli.config.as_deref())?;
    let credentials = CredentialSources::from_env(cli.kubeconfig.clone()).resolve()?;
    debug!("credentials: {:?}", credentials);

    let client = KubectlClient::new(config.cluster.cli, credentials.kubeconfig(), cli.verbose);
    let (run, matches) = diagnose(&client, &config, &cli.namespace, cli.cluster.clone()).await;

    let color = !cli.no_color && !cli.json && std::io::stdout().is_terminal();
    let output = render(&run, &matches, &config.thresholds, cli.json, color)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output).context("failed to write report")?;
    stdout.flush().context("failed to write report")?;

    Ok(exit_code(&matches))
}
