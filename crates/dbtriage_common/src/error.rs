//! Error types for dbtriage.
//!
//! Only configuration and argument problems are errors. Collaborator
//! failures during a run are recorded as data inside the probe records.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("No kubeconfig found. Pass --kubeconfig, set KUBECONFIG, or create ~/.kube/config.")]
    MissingKubeconfig,

    #[error("Kubeconfig not found: {}", .0.display())]
    KubeconfigNotFound(PathBuf),

    #[error("Cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
