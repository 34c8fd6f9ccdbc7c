//! Probes - read-only health checks, one per dimension.
//!
//! Each probe issues its queries through a `ClusterClient`, parses the output
//! into a typed record and returns it. A probe never returns an error: any
//! failure degrades the record to its conservative default and adds an
//! evidence line to the record's `errors`.

pub mod backup;
pub mod certificate;
pub mod cluster;
pub mod control_plane;
pub mod dns;
pub mod environment;
pub mod nodes;
pub mod operator;
pub mod pods;
pub mod quorum;
pub mod replication;
pub mod service;
pub mod storage;

use dbtriage_common::TriageConfig;
use serde_json::Value;
use std::time::Duration;

use crate::client::ProbeError;

/// What a probe needs to know about the target.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext<'a> {
    pub namespace: &'a str,
    pub cluster: Option<&'a str>,
    pub config: &'a TriageConfig,
}

impl<'a> ProbeContext<'a> {
    pub fn new(namespace: &'a str, cluster: Option<&'a str>, config: &'a TriageConfig) -> Self {
        Self {
            namespace,
            cluster,
            config,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.config.timeouts.query()
    }

    pub fn dns_timeout(&self) -> Duration {
        self.config.timeouts.dns()
    }

    pub fn pod_selector(&self) -> String {
        self.config.cluster.pod_selector_for(self.cluster)
    }

    pub fn database_container(&self) -> &str {
        &self.config.cluster.database_container
    }
}

/// Evidence line for a failed collaborator call.
pub(crate) fn describe(what: &str, err: &ProbeError) -> String {
    format!("{}: {}", what, err)
}

/// Shell snippet running one SQL statement with the root credentials the
/// operator injects into the database container. Tries the `mariadb` client
/// first and falls back to `mysql`.
pub(crate) fn sql_script(query: &str, vertical: bool) -> String {
    let format = if vertical { "-E" } else { "-N -B" };
    let client = |bin: &str| {
        format!(
            "{} -uroot -p\"${{MARIADB_ROOT_PASSWORD}}\" {} -e \"{}\"",
            bin, format, query
        )
    };
    format!("{} 2>/dev/null || {}", client("mariadb"), client("mysql"))
}

/// `.items` of a list response; a missing array is malformed.
pub(crate) fn items(list: &Value) -> Result<&Vec<Value>, ProbeError> {
    list.get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ProbeError::Malformed("response has no items array".to_string()))
}

pub(crate) fn str_at<'v>(value: &'v Value, pointer: &str) -> Option<&'v str> {
    value.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
}

/// Whether `conditions` has an entry of `kind` with status "True".
pub(crate) fn condition_true(conditions: Option<&Value>, kind: &str) -> bool {
    conditions
        .and_then(Value::as_array)
        .map(|list| {
            list.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some(kind)
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        })
        .unwrap_or(false)
}
