//! Control-plane client abstraction.
//!
//! Production code uses `KubectlClient`, which shells out to `kubectl` (or
//! `oc`) with a bounded timeout per call. Tests use `FakeClusterClient` with
//! canned responses, so no cluster is needed.
//!
//! Every call is read-only.

use async_trait::async_trait;
use dbtriage_common::ClusterCli;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Output echoed in verbose mode is cut at this many bytes
const MAX_ECHO_BYTES: usize = 2048;

/// Failure of a single collaborator call. Probes turn it into data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("exit code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("unexpected output: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Run one control-plane CLI invocation and return its stdout.
    async fn run(&self, args: &[String], timeout: Duration) -> Result<String, ProbeError>;

    /// `get ... -o json`, parsed.
    async fn get_json(&self, args: &[&str], timeout: Duration) -> Result<Value, ProbeError> {
        let mut full: Vec<String> = Vec::with_capacity(args.len() + 3);
        full.push("get".to_string());
        full.extend(args.iter().map(|a| a.to_string()));
        full.push("-o".to_string());
        full.push("json".to_string());

        let stdout = self.run(&full, timeout).await?;
        serde_json::from_str(&stdout).map_err(|e| ProbeError::Malformed(e.to_string()))
    }

    /// `get --raw PATH` against the API server.
    async fn get_raw(&self, path: &str, timeout: Duration) -> Result<String, ProbeError> {
        let args = vec!["get".to_string(), "--raw".to_string(), path.to_string()];
        self.run(&args, timeout).await
    }

    /// Run a shell snippet inside one container of a pod.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<String, ProbeError> {
        let args: Vec<String> = [
            "exec", "-n", namespace, pod, "-c", container, "--", "sh", "-c", script,
        ]
        .iter()
        .map(|a| a.to_string())
        .collect();
        self.run(&args, timeout).await
    }

    /// Name of the active kubeconfig context.
    async fn current_context(&self, timeout: Duration) -> Result<String, ProbeError> {
        let args = vec!["config".to_string(), "current-context".to_string()];
        self.run(&args, timeout).await.map(|s| s.trim().to_string())
    }
}

/// Runs the real `kubectl`/`oc` binary.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    kubeconfig: Option<PathBuf>,
    verbose: bool,
}

impl KubectlClient {
    pub fn new(cli: ClusterCli, kubeconfig: Option<PathBuf>, verbose: bool) -> Self {
        Self {
            binary: cli.binary().to_string(),
            kubeconfig,
            verbose,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Global flags go first so they never land after an `exec --`.
    fn command_line(&self, args: &[String], timeout: Duration) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(path) = &self.kubeconfig {
            full.push(format!("--kubeconfig={}", path.display()));
        }
        full.push(format!("--request-timeout={}s", timeout.as_secs().max(1)));
        full.extend(args.iter().cloned());
        full
    }
}

fn truncate_for_echo(text: &str) -> &str {
    if text.len() <= MAX_ECHO_BYTES {
        return text;
    }
    let mut end = MAX_ECHO_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<String, ProbeError> {
        let full = self.command_line(args, timeout);
        if self.verbose {
            debug!("$ {} {}", self.binary, full.join(" "));
        }

        let child = Command::new(&self.binary)
            .args(&full)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ProbeError::Spawn {
                    program: self.binary.clone(),
                    message: e.to_string(),
                })
            }
            Err(_) => return Err(ProbeError::Timeout(timeout.as_secs())),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if self.verbose {
            debug!(
                "  exit={} stdout={:?} stderr={:?}",
                output.status.code().unwrap_or(-1),
                truncate_for_echo(&stdout),
                truncate_for_echo(&stderr)
            );
        }

        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(stdout)
    }
}

/// Canned-response client for tests.
///
/// A command line is matched against registered keys: an exact match wins,
/// otherwise the longest key contained in the command line. Unmatched
/// commands fail like a `kubectl` error would.
#[derive(Debug, Default)]
pub struct FakeClusterClient {
    responses: HashMap<String, Result<String, ProbeError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `key` with `stdout`.
    pub fn respond(mut self, key: &str, stdout: &str) -> Self {
        self.responses.insert(key.to_string(), Ok(stdout.to_string()));
        self
    }

    /// Answer commands containing `key` with an error.
    pub fn fail(mut self, key: &str, error: ProbeError) -> Self {
        self.responses.insert(key.to_string(), Err(error));
        self
    }

    /// Every command line seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn lookup(&self, line: &str) -> Option<&Result<String, ProbeError>> {
        if let Some(exact) = self.responses.get(line) {
            return Some(exact);
        }
        self.responses
            .iter()
            .filter(|(key, _)| line.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, response)| response)
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn run(&self, args: &[String], _timeout: Duration) -> Result<String, ProbeError> {
        let line = args.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        match self.lookup(&line) {
            Some(response) => response.clone(),
            None => Err(ProbeError::CommandFailed {
                code: 1,
                stderr: format!("no canned response for `{}`", line),
            }),
        }
    }
}
