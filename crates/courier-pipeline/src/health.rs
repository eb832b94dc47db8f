// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health monitor: periodic composite probe over the queue store.
//!
//! Three probes per invocation: store reachability (latency), queue depth
//! against configured thresholds, and a single consistency aggregate. Each
//! invocation persists one sample per probe and raises a deduplicated
//! alert when the overall state is critical.

use std::time::Instant;

use courier_config::model::HealthConfig;
use courier_core::types::{
    now_iso, Alert, AlertSeverity, HealthReport, HealthSample, HealthState, ProbeResult,
};
use courier_core::CourierError;
use courier_storage::queries::{health as health_queries, queue};
use courier_storage::Database;
use tracing::{error, info, warn};

use crate::metrics;

/// Alert deduplication key used for critical pipeline health.
pub const ALERT_TYPE_PIPELINE_CRITICAL: &str = "pipeline_critical";

pub const METRIC_STORE_LATENCY: &str = "store_latency";
pub const METRIC_QUEUE_DEPTH: &str = "queue_depth";
pub const METRIC_CONSISTENCY: &str = "consistency";

/// The composite health prober.
pub struct HealthMonitor {
    db: Database,
    config: HealthConfig,
    processing_ttl_secs: u64,
}

impl HealthMonitor {
    pub fn new(db: Database, config: HealthConfig, processing_ttl_secs: u64) -> Self {
        Self {
            db,
            config,
            processing_ttl_secs,
        }
    }

    /// Run one composite probe.
    ///
    /// Always yields a report, even when the store is unreachable -- that
    /// is precisely the state worth reporting. Samples and alerts are only
    /// persisted when the store answered the reachability probe.
    pub async fn probe(&self) -> Result<HealthReport, CourierError> {
        let store_probe = self.probe_store().await;
        let store_reachable = store_probe.status != HealthState::Critical;
        let depth_probe = self.probe_queue_depth().await;
        let consistency_probe = self.probe_consistency().await;

        let probes = vec![store_probe, depth_probe, consistency_probe];
        let overall = probes
            .iter()
            .map(|p| p.status)
            .max()
            .unwrap_or(HealthState::Healthy);

        let report = HealthReport {
            overall,
            probes,
        };

        info!(
            overall = %report.overall,
            store = %report.probes[0].status,
            queue_depth = report.probes[1].value,
            consistency = %report.probes[2].status,
            "health probe complete"
        );

        if store_reachable {
            self.persist_samples(&report).await?;
            if report.overall == HealthState::Critical {
                self.raise_alert(&report).await?;
            }
        } else {
            error!("queue store unreachable, skipping sample persistence");
        }

        Ok(report)
    }

    /// Probe A: trivial read with measured latency.
    async fn probe_store(&self) -> ProbeResult {
        let started = Instant::now();
        match self.db.ping().await {
            Ok(()) => ProbeResult {
                metric_type: METRIC_STORE_LATENCY.to_string(),
                value: started.elapsed().as_secs_f64() * 1000.0,
                status: HealthState::Healthy,
                detail: None,
            },
            Err(error) => ProbeResult {
                metric_type: METRIC_STORE_LATENCY.to_string(),
                value: started.elapsed().as_secs_f64() * 1000.0,
                status: HealthState::Critical,
                detail: Some(format!("store unreachable: {error}")),
            },
        }
    }

    /// Probe B: backlog depth against the configured thresholds.
    async fn probe_queue_depth(&self) -> ProbeResult {
        match queue::backlog_depth(&self.db).await {
            Ok(depth) => {
                metrics::set_queue_depth(depth as f64);
                ProbeResult {
                    metric_type: METRIC_QUEUE_DEPTH.to_string(),
                    value: depth as f64,
                    status: classify_depth(depth, &self.config),
                    detail: None,
                }
            }
            Err(error) => ProbeResult {
                metric_type: METRIC_QUEUE_DEPTH.to_string(),
                value: 0.0,
                status: HealthState::Critical,
                detail: Some(format!("depth query failed: {error}")),
            },
        }
    }

    /// Probe C: the single consistency aggregate (stuck processing rows,
    /// attempt-count invariant violations). Any non-zero count is a warning.
    async fn probe_consistency(&self) -> ProbeResult {
        match queue::consistency_counts(&self.db, self.processing_ttl_secs).await {
            Ok(counts) => {
                let total = counts.stuck_processing + counts.attempt_overflow;
                let status = if total > 0 {
                    HealthState::Warning
                } else {
                    HealthState::Healthy
                };
                ProbeResult {
                    metric_type: METRIC_CONSISTENCY.to_string(),
                    value: total as f64,
                    status,
                    detail: serde_json::to_string(&counts).ok(),
                }
            }
            Err(error) => ProbeResult {
                metric_type: METRIC_CONSISTENCY.to_string(),
                value: 0.0,
                status: HealthState::Critical,
                detail: Some(format!("consistency query failed: {error}")),
            },
        }
    }

    async fn persist_samples(&self, report: &HealthReport) -> Result<(), CourierError> {
        for probe in &report.probes {
            health_queries::insert_sample(
                &self.db,
                &HealthSample {
                    id: uuid::Uuid::new_v4().to_string(),
                    service_name: self.config.service_name.clone(),
                    metric_type: probe.metric_type.clone(),
                    value: probe.value,
                    status: probe.status,
                    metadata: probe.detail.clone(),
                    observed_at: now_iso(),
                },
            )
            .await?;
        }
        Ok(())
    }

    /// Raise a critical alert unless an unresolved one of the same type
    /// already exists.
    async fn raise_alert(&self, report: &HealthReport) -> Result<(), CourierError> {
        if health_queries::has_unresolved_alert(&self.db, ALERT_TYPE_PIPELINE_CRITICAL).await? {
            warn!("critical state persists, unresolved alert already open");
            return Ok(());
        }

        let critical: Vec<&str> = report
            .probes
            .iter()
            .filter(|p| p.status == HealthState::Critical)
            .map(|p| p.metric_type.as_str())
            .collect();

        let alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: ALERT_TYPE_PIPELINE_CRITICAL.to_string(),
            severity: AlertSeverity::Critical,
            title: "Notification pipeline critical".to_string(),
            message: format!("critical probes: {}", critical.join(", ")),
            context: serde_json::to_string(&report.probes).ok(),
            resolved: false,
            created_at: now_iso(),
        };
        health_queries::insert_alert(&self.db, &alert).await?;
        warn!(alert_id = %alert.id, message = %alert.message, "alert raised");
        Ok(())
    }
}

/// Classify backlog depth against the configured thresholds.
fn classify_depth(depth: i64, config: &HealthConfig) -> HealthState {
    if depth > i64::from(config.queue_critical_threshold) {
        HealthState::Critical
    } else if depth > i64::from(config.queue_warning_threshold) {
        HealthState::Warning
    } else {
        HealthState::Healthy
    }
}
