//! TLS certificate expiry from cert-manager `Certificate` resources.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dbtriage_common::CertificateStatus;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ClusterClient, ProbeError};

use super::{describe, items, str_at, ProbeContext};

/// Classify every certificate in the namespace against `now`.
///
/// An expired certificate never also counts as expiring soon.
pub fn from_json(list: &Value, now: DateTime<Utc>, warning_days: i64) -> CertificateStatus {
    let certificates = match items(list) {
        Ok(certificates) => certificates,
        Err(e) => {
            return CertificateStatus {
                errors: vec![describe("certificate listing", &e)],
                ..CertificateStatus::default()
            }
        }
    };

    let mut status = CertificateStatus {
        checked: true,
        total: certificates.len() as u32,
        ..CertificateStatus::default()
    };
    // Out-of-range windows only disable the expiring-soon check.
    let horizon = ChronoDuration::try_days(warning_days).and_then(|d| now.checked_add_signed(d));
    if horizon.is_none() {
        status
            .errors
            .push(format!("warning window of {} days is out of range", warning_days));
    }

    for cert in certificates {
        let name = str_at(cert, "/metadata/name").unwrap_or("<unnamed>").to_string();
        let Some(raw) = str_at(cert, "/status/notAfter") else {
            debug!("certificate {} has not been issued yet", name);
            continue;
        };
        match DateTime::parse_from_rfc3339(raw) {
            Ok(not_after) => {
                let not_after = not_after.with_timezone(&Utc);
                if not_after <= now {
                    status.expired.push(name);
                } else if horizon.is_some_and(|h| not_after <= h) {
                    status.expiring_soon.push(name);
                }
            }
            Err(e) => status
                .errors
                .push(format!("certificate {} notAfter {:?}: {}", name, raw, e)),
        }
    }

    status
}

pub async fn probe(client: &dyn ClusterClient, ctx: &ProbeContext<'_>) -> CertificateStatus {
    let resource = ctx.config.cluster.certificate_resource.as_str();
    match client
        .get_json(&[resource, "-n", ctx.namespace], ctx.query_timeout())
        .await
    {
        Ok(list) => from_json(
            &list,
            Utc::now(),
            ctx.config.thresholds.certificate_warning_days,
        ),
        Err(e) => {
            // Without cert-manager the resource type does not exist.
            if matches!(e, ProbeError::CommandFailed { .. }) {
                debug!("certificate listing unavailable: {}", e);
            } else {
                warn!("certificate probe failed: {}", e);
            }
            CertificateStatus {
                errors: vec![describe(&format!("get {}", resource), &e)],
                ..CertificateStatus::default()
            }
        }
    }
}
