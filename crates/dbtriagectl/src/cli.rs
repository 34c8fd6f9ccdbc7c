//! CLI - command-line argument parsing
//!
//! Kept apart from execution so the runner can be driven from tests.

use clap::Parser;
use std::path::PathBuf;

/// Disaster-scenario triage for a clustered MariaDB deployment
#[derive(Parser, Debug, Clone)]
#[command(name = "dbtriagectl")]
#[command(about = "Infer which disaster scenario a database cluster is in", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Namespace the database cluster runs in
    pub namespace: String,

    /// Database cluster name (auto-detected when omitted)
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Echo every control-plane command and its output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit a JSON report instead of text
    #[arg(long)]
    pub json: bool,

    /// Configuration file (default: ~/.config/dbtriage/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kubeconfig to use instead of the default lookup
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}
