// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health sample and alert persistence.
//!
//! Samples and alerts are append-only facts. The only mutation is flipping
//! an alert's `resolved` flag, which is an administrative act.

use courier_core::CourierError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Alert, HealthSample};

/// Persist one health sample.
pub async fn insert_sample(db: &Database, sample: &HealthSample) -> Result<(), CourierError> {
    let sample = sample.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO health_samples
                 (id, service_name, metric_type, value, status, metadata, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    sample.id,
                    sample.service_name,
                    sample.metric_type,
                    sample.value,
                    sample.status.to_string(),
                    sample.metadata,
                    sample.observed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist one alert.
pub async fn insert_alert(db: &Database, alert: &Alert) -> Result<(), CourierError> {
    let alert = alert.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO alerts
                 (id, alert_type, severity, title, message, context, resolved, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    alert.id,
                    alert.alert_type,
                    alert.severity.to_string(),
                    alert.title,
                    alert.message,
                    alert.context,
                    alert.resolved,
                    alert.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether an unresolved alert of the given type already exists.
///
/// The health monitor checks this before inserting so that a sustained
/// outage raises one alert, not one per probe cycle.
pub async fn has_unresolved_alert(db: &Database, alert_type: &str) -> Result<bool, CourierError> {
    let alert_type = alert_type.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM alerts WHERE alert_type = ?1 AND resolved = 0",
                params![alert_type],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark all unresolved alerts of the given type resolved. Returns how many
/// were flipped.
pub async fn resolve_alerts(db: &Database, alert_type: &str) -> Result<u32, CourierError> {
    let alert_type = alert_type.to_string();
    db.connection()
        .call(move |conn| {
            let resolved = conn.execute(
                "UPDATE alerts SET resolved = 1 WHERE alert_type = ?1 AND resolved = 0",
                params![alert_type],
            )?;
            Ok(resolved as u32)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent samples, newest first.
pub async fn recent_samples(db: &Database, limit: u32) -> Result<Vec<HealthSample>, CourierError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, service_name, metric_type, value, status, metadata, observed_at
                 FROM health_samples ORDER BY observed_at DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let status: String = row.get(4)?;
                Ok(HealthSample {
                    id: row.get(0)?,
                    service_name: row.get(1)?,
                    metric_type: row.get(2)?,
                    value: row.get(3)?,
                    status: status.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    metadata: row.get(5)?,
                    observed_at: row.get(6)?,
                })
            })?;
            let mut samples = Vec::new();
            for row in rows {
                samples.push(row?);
            }
            Ok(samples)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, HealthState};
    use courier_core::types::now_iso;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = courier_config::model::StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();
        (db, dir)
    }

    fn sample(metric_type: &str, value: f64, status: HealthState) -> HealthSample {
        HealthSample {
            id: uuid::Uuid::new_v4().to_string(),
            service_name: "courier".to_string(),
            metric_type: metric_type.to_string(),
            value,
            status,
            metadata: None,
            observed_at: now_iso(),
        }
    }

    fn critical_alert(alert_type: &str) -> Alert {
        Alert {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: alert_type.to_string(),
            severity: AlertSeverity::Critical,
            title: "Queue backlog critical".to_string(),
            message: "backlog depth 612 exceeds critical threshold 500".to_string(),
            context: None,
            resolved: false,
            created_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn samples_round_trip_newest_first() {
        let (db, _dir) = setup_db().await;

        let mut first = sample("queue_depth", 12.0, HealthState::Healthy);
        first.observed_at = "2026-01-01T00:00:01.000Z".to_string();
        let mut second = sample("store_latency", 3.5, HealthState::Healthy);
        second.observed_at = "2026-01-01T00:00:02.000Z".to_string();

        insert_sample(&db, &first).await.unwrap();
        insert_sample(&db, &second).await.unwrap();

        let samples = recent_samples(&db, 10).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].metric_type, "store_latency");
        assert_eq!(samples[1].metric_type, "queue_depth");
        assert_eq!(samples[1].status, HealthState::Healthy);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unresolved_alert_detection_and_resolution() {
        let (db, _dir) = setup_db().await;

        assert!(!has_unresolved_alert(&db, "pipeline_critical").await.unwrap());

        insert_alert(&db, &critical_alert("pipeline_critical"))
            .await
            .unwrap();
        assert!(has_unresolved_alert(&db, "pipeline_critical").await.unwrap());

        // A different type is unaffected.
        assert!(!has_unresolved_alert(&db, "other_type").await.unwrap());

        let resolved = resolve_alerts(&db, "pipeline_critical").await.unwrap();
        assert_eq!(resolved, 1);
        assert!(!has_unresolved_alert(&db, "pipeline_critical").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolve_is_noop_without_matching_alerts() {
        let (db, _dir) = setup_db().await;
        assert_eq!(resolve_alerts(&db, "nothing_here").await.unwrap(), 0);
        db.close().await.unwrap();
    }
}
