//! Control-plane credential discovery.
//!
//! Resolved once before any probe runs. Lookup order:
//! 1. `--kubeconfig PATH` (must exist)
//! 2. first existing entry of `$KUBECONFIG`
//! 3. `~/.kube/config`
//! 4. in-cluster service-account token

use dbtriage_common::TriageError;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const IN_CLUSTER_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Where the client takes its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Kubeconfig(PathBuf),
    InCluster,
}

impl Credentials {
    /// Path to pass as `--kubeconfig`; in-cluster mode passes none.
    pub fn kubeconfig(&self) -> Option<PathBuf> {
        match self {
            Credentials::Kubeconfig(path) => Some(path.clone()),
            Credentials::InCluster => None,
        }
    }
}

/// Inputs to credential discovery, gathered from the process environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub explicit: Option<PathBuf>,
    pub kubeconfig_env: Option<OsString>,
    pub home: Option<PathBuf>,
    pub token_path: PathBuf,
}

impl CredentialSources {
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            kubeconfig_env: env::var_os("KUBECONFIG"),
            home: dirs::home_dir(),
            token_path: PathBuf::from(IN_CLUSTER_TOKEN),
        }
    }

    pub fn resolve(&self) -> Result<Credentials, TriageError> {
        if let Some(path) = &self.explicit {
            if path.is_file() {
                return Ok(Credentials::Kubeconfig(path.clone()));
            }
            return Err(TriageError::KubeconfigNotFound(path.clone()));
        }

        if let Some(list) = &self.kubeconfig_env {
            if let Some(path) = env::split_paths(list).find(|p| is_file(p)) {
                debug!("using kubeconfig from KUBECONFIG: {}", path.display());
                return Ok(Credentials::Kubeconfig(path));
            }
        }

        if let Some(home) = &self.home {
            let path = home.join(".kube").join("config");
            if path.is_file() {
                debug!("using kubeconfig {}", path.display());
                return Ok(Credentials::Kubeconfig(path));
            }
        }

        if self.token_path.is_file() {
            debug!("using in-cluster service account");
            return Ok(Credentials::InCluster);
        }

        Err(TriageError::MissingKubeconfig)
    }
}

fn is_file(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file()
}
