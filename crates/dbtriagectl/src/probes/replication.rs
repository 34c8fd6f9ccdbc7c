//! Asynchronous replica channel status.
//!
//! Reads `SHOW SLAVE STATUS` in vertical format. Both the legacy `Slave_*` /
//! `*_Master` and the newer `Replica_*` / `*_Source` field names are
//! accepted. A unit with several channels reports one row per channel.

use dbtriage_common::ReplicationStatus;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::client::ClusterClient;

use super::{describe, sql_script, ProbeContext};

const REPLICA_QUERY: &str = "SHOW SLAVE STATUS";

fn rows(output: &str) -> Vec<HashMap<String, String>> {
    let mut rows = Vec::new();
    let mut current: Option<HashMap<String, String>> = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("***") {
            if let Some(row) = current.take() {
                rows.push(row);
            }
            current = Some(HashMap::new());
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            current
                .get_or_insert_with(HashMap::new)
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    if let Some(row) = current {
        if !row.is_empty() {
            rows.push(row);
        }
    }
    rows
}

fn field<'r>(row: &'r HashMap<String, String>, names: &[&str]) -> Option<&'r str> {
    names.iter().find_map(|n| row.get(*n)).map(String::as_str)
}

/// Interpret replica status output.
///
/// Thread and lag fields are only read once their presence confirms that a
/// channel is configured; empty output means "not configured".
pub fn parse_status(output: &str) -> ReplicationStatus {
    let rows = rows(output);
    let mut status = ReplicationStatus::default();

    let mut io_all = true;
    let mut sql_all = true;
    for row in &rows {
        let io = field(row, &["Slave_IO_Running", "Replica_IO_Running"]);
        let sql = field(row, &["Slave_SQL_Running", "Replica_SQL_Running"]);
        if io.is_none() && sql.is_none() {
            continue;
        }
        status.configured = true;
        io_all &= io.map(|v| v.eq_ignore_ascii_case("yes")).unwrap_or(false);
        sql_all &= sql.map(|v| v.eq_ignore_ascii_case("yes")).unwrap_or(false);

        let lag = field(row, &["Seconds_Behind_Master", "Seconds_Behind_Source"])
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(lag) = lag {
            status.seconds_behind = Some(status.seconds_behind.map_or(lag, |cur| cur.max(lag)));
        }

        if status.last_error.is_none() {
            status.last_error = ["Last_IO_Error", "Last_SQL_Error", "Last_Error"]
                .iter()
                .filter_map(|n| row.get(*n))
                .find(|v| !v.is_empty())
                .cloned();
        }
    }

    if status.configured {
        status.io_running = io_all;
        status.sql_running = sql_all;
    }
    status
}

pub async fn probe(
    client: &dyn ClusterClient,
    ctx: &ProbeContext<'_>,
    first_running: Option<&str>,
) -> ReplicationStatus {
    let Some(pod) = first_running else {
        return ReplicationStatus {
            errors: vec!["no running database pod to query".to_string()],
            ..ReplicationStatus::default()
        };
    };

    let script = sql_script(REPLICA_QUERY, true);
    let mut status = match client
        .exec(ctx.namespace, pod, ctx.database_container(), &script, ctx.query_timeout())
        .await
    {
        Ok(output) => {
            let status = parse_status(&output);
            if !status.configured {
                debug!("no replica channel on {}", pod);
            }
            status
        }
        Err(e) => {
            warn!("replica status on {} failed: {}", pod, e);
            ReplicationStatus {
                errors: vec![describe(&format!("replica status on {}", pod), &e)],
                ..ReplicationStatus::default()
            }
        }
    };
    status.queried_pod = Some(pod.to_string());
    status
}
