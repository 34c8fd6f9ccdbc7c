//! Backup completion from the operator's `Backup` resources.
//!
//! Only the most recent backup decides whether the backup is failing; older
//! failures are kept as evidence.

use chrono::{DateTime, Utc};
use dbtriage_common::{BackupOutcome, BackupRecord, BackupStatus};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ClusterClient;

use super::{describe, items, str_at, u32_at, ProbeContext};

fn condition<'v>(item: &'v Value, kind: &str) -> Option<&'v Value> {
    item.pointer("/status/conditions")
        .and_then(Value::as_array)?
        .iter()
        .find(|c| str_at(c, "/type") == Some(kind))
}

pub fn outcome_of(item: &Value) -> BackupOutcome {
    for kind in ["Complete", "Succeeded"] {
        if let Some(c) = condition(item, kind) {
            match str_at(c, "/status") {
                Some("True") => return BackupOutcome::Succeeded,
                Some("False") => {
                    let reason = str_at(c, "/reason").unwrap_or("");
                    if reason.contains("Fail") || reason.contains("Error") {
                        return BackupOutcome::Failed;
                    }
                }
                _ => {}
            }
        }
    }
    if condition(item, "Failed").and_then(|c| str_at(c, "/status")) == Some("True") {
        return BackupOutcome::Failed;
    }

    match str_at(item, "/status/phase").map(str::to_ascii_lowercase).as_deref() {
        Some("succeeded" | "complete" | "completed") => return BackupOutcome::Succeeded,
        Some("failed" | "error") => return BackupOutcome::Failed,
        Some("running" | "pending") => return BackupOutcome::Running,
        _ => {}
    }

    // Batch Job status shape
    if u32_at(item, "/status/failed").unwrap_or(0) > 0 {
        BackupOutcome::Failed
    } else if u32_at(item, "/status/succeeded").unwrap_or(0) > 0 {
        BackupOutcome::Succeeded
    } else if u32_at(item, "/status/active").unwrap_or(0) > 0 {
        BackupOutcome::Running
    } else {
        BackupOutcome::Unknown
    }
}

fn created_at(item: &Value) -> Option<DateTime<Utc>> {
    str_at(item, "/metadata/creationTimestamp")
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Build the backup status for `cluster`. Backups referencing another
/// cluster are ignored.
pub fn from_json(list: &Value, cluster: Option<&str>) -> BackupStatus {
    let backups = match items(list) {
        Ok(backups) => backups,
        Err(e) => {
            return BackupStatus {
                errors: vec![describe("backup listing", &e)],
                ..BackupStatus::default()
            }
        }
    };

    let mut records: Vec<BackupRecord> = backups
        .iter()
        .filter(|item| match (cluster, str_at(item, "/spec/mariaDbRef/name")) {
            (Some(wanted), Some(target)) => wanted == target,
            _ => true,
        })
        .map(|item| BackupRecord {
            name: str_at(item, "/metadata/name").unwrap_or("<unnamed>").to_string(),
            created_at: created_at(item),
            outcome: outcome_of(item),
        })
        .collect();

    // Newest first, undated last.
    records.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let total = records.len() as u32;
    let older_failures = records
        .iter()
        .skip(1)
        .filter(|r| r.outcome == BackupOutcome::Failed)
        .count() as u32;
    let most_recent = records.into_iter().next();

    BackupStatus {
        checked: true,
        total,
        most_recent_failed: most_recent
            .as_ref()
            .map(|r| r.outcome == BackupOutcome::Failed)
            .unwrap_or(false),
        most_recent,
        older_failures,
        errors: Vec::new(),
    }
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> BackupStatus {
    let resource = ctx.config.cluster.backup_resource.as_str();
    match client
        .get_json(&[resource, "-n", ctx.namespace], ctx.query_timeout())
        .await
    {
        Ok(list) => {
            let status = from_json(&list, ctx.cluster);
            match &status.most_recent {
                Some(r) => debug!("most recent backup {} is {}", r.name, r.outcome.as_str()),
                None => debug!("no backups for this cluster"),
            }
            status
        }
        Err(e) => {
            warn!("backup probe failed: {}", e);
            BackupStatus {
                errors: vec![describe(&format!("get {}", resource), &e)],
                ..BackupStatus::default()
            }
        }
    }
}
