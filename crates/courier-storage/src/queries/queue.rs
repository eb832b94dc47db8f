// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for at-least-once notification delivery.
//!
//! The claim is a single conditional `UPDATE ... RETURNING`: selection and
//! the transition to `processing` happen in one statement, so overlapping
//! dispatch invocations can never claim the same row. Terminal transitions
//! re-check `status` in their `WHERE` clause, which makes them idempotent.

use courier_core::CourierError;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::database::Database;
use crate::models::{NewQueueEntry, NotificationPayload, QueueEntry, QueueEntryId, QueueStatus};

/// Per-status row counts for operator visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub processing: i64,
    pub sent: i64,
    pub retrying: i64,
    pub failed: i64,
}

/// Inconsistency counters returned by the single health aggregate query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyCounts {
    /// `processing` entries older than the reclaim TTL: an invocation died
    /// mid-batch.
    pub stuck_processing: i64,
    /// Rows violating `attempt_count <= max_attempts`.
    pub attempt_overflow: i64,
}

/// Reject malformed input before anything touches the table.
fn validate_new_entry(entry: &NewQueueEntry) -> Result<(), CourierError> {
    if entry.recipient.trim().is_empty() {
        return Err(CourierError::Validation(
            "recipient must not be empty".to_string(),
        ));
    }
    match &entry.payload {
        NotificationPayload::Template { name, .. } if name.trim().is_empty() => {
            Err(CourierError::Validation(
                "template name must not be empty".to_string(),
            ))
        }
        NotificationPayload::Push { title, .. } if title.trim().is_empty() => {
            Err(CourierError::Validation(
                "push title must not be empty".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// Insert a new entry with `status = 'pending'` and `attempt_count = 0`.
///
/// `scheduled_for` defaults to now unless the caller supplies a future
/// time (scheduled reminders). Returns the generated entry id.
pub async fn enqueue(
    db: &Database,
    entry: NewQueueEntry,
    default_max_attempts: u32,
) -> Result<QueueEntryId, CourierError> {
    validate_new_entry(&entry)?;

    let id = uuid::Uuid::new_v4().to_string();
    let payload = serde_json::to_string(&entry.payload)
        .map_err(|e| CourierError::Internal(format!("failed to serialize payload: {e}")))?;
    let max_attempts = entry.max_attempts.unwrap_or(default_max_attempts);

    let id_for_insert = id.clone();
    db.connection()
        .call(move |conn| {
            match entry.scheduled_for {
                Some(when) => {
                    conn.execute(
                        "INSERT INTO queue (id, recipient, channel, payload, max_attempts, scheduled_for)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            id_for_insert,
                            entry.recipient,
                            entry.channel.to_string(),
                            payload,
                            max_attempts,
                            when,
                        ],
                    )?;
                }
                None => {
                    conn.execute(
                        "INSERT INTO queue (id, recipient, channel, payload, max_attempts)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            id_for_insert,
                            entry.recipient,
                            entry.channel.to_string(),
                            payload,
                            max_attempts,
                        ],
                    )?;
                }
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok(QueueEntryId(id))
}

/// Atomically claim up to `limit` due entries.
///
/// Selects entries with `status IN ('pending', 'retrying')` and
/// `scheduled_for <= now`, oldest due first, transitions them to
/// `processing`, and increments `attempt_count` -- all in one conditional
/// UPDATE. The returned entries already carry the incremented count.
pub async fn claim_batch(db: &Database, limit: u32) -> Result<Vec<QueueEntry>, CourierError> {
    let mut claimed = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "UPDATE queue
                 SET status = 'processing',
                     attempt_count = attempt_count + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id IN (
                     SELECT id FROM queue
                     WHERE status IN ('pending', 'retrying')
                       AND scheduled_for <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     ORDER BY scheduled_for ASC
                     LIMIT ?1
                 )
                 RETURNING id, recipient, channel, payload, status, attempt_count,
                           max_attempts, scheduled_for, last_error, created_at, updated_at",
            )?;
            let rows = stmt.query_map(params![limit], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    // RETURNING does not guarantee subquery order.
    claimed.sort_by(|a, b| a.scheduled_for.cmp(&b.scheduled_for));
    Ok(claimed)
}

/// Terminal success transition. No-op if the entry is already terminal.
pub async fn mark_sent(db: &Database, id: &str) -> Result<(), CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'sent',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status NOT IN ('sent', 'failed')",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Interim retry transition: records the failure and when the entry next
/// becomes eligible. No-op if the entry is already terminal.
pub async fn mark_retrying(
    db: &Database,
    id: &str,
    error: &str,
    next_attempt_at: &str,
) -> Result<(), CourierError> {
    let id = id.to_string();
    let error = error.to_string();
    let next_attempt_at = next_attempt_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'retrying',
                 last_error = ?2,
                 scheduled_for = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status NOT IN ('sent', 'failed')",
                params![id, error, next_attempt_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Terminal failure transition. No-op if the entry is already terminal.
pub async fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), CourierError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'failed',
                 last_error = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status NOT IN ('sent', 'failed')",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Administrative reset used by the requeue operator.
///
/// Resets any non-`sent` entry to `pending` with `attempt_count = 0` and a
/// cleared error. Returns the status the entry had before the reset.
/// Signals `NotFound` for unknown ids and `InvalidTransition` for `sent`
/// entries: a delivered notification must not be delivered again.
pub async fn reset_to_pending(db: &Database, id: &str) -> Result<QueueStatus, CourierError> {
    let id_owned = id.to_string();
    let prior: Option<String> = db
        .connection()
        .call(move |conn| {
            let prior: Option<String> = conn
                .query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id_owned],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(ref status) = prior
                && status != "sent"
            {
                conn.execute(
                    "UPDATE queue SET status = 'pending',
                     attempt_count = 0,
                     last_error = NULL,
                     scheduled_for = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![id_owned],
                )?;
            }
            Ok(prior)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match prior {
        None => Err(CourierError::NotFound { id: id.to_string() }),
        Some(status) if status == "sent" => Err(CourierError::InvalidTransition {
            id: id.to_string(),
            status: QueueStatus::Sent,
        }),
        Some(status) => status
            .parse()
            .map_err(|_| CourierError::Internal(format!("unknown queue status `{status}`"))),
    }
}

/// Fetch one entry by id.
pub async fn get_entry(db: &Database, id: &str) -> Result<Option<QueueEntry>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let entry = conn
                .query_row(
                    "SELECT id, recipient, channel, payload, status, attempt_count,
                            max_attempts, scheduled_for, last_error, created_at, updated_at
                     FROM queue WHERE id = ?1",
                    params![id],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count of entries awaiting delivery (`pending` or `retrying`).
pub async fn backlog_depth(db: &Database) -> Result<i64, CourierError> {
    db.connection()
        .call(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE status IN ('pending', 'retrying')",
                [],
                |row| row.get(0),
            )?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-status row counts.
pub async fn status_counts(db: &Database) -> Result<QueueCounts, CourierError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM queue GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = QueueCounts::default();
            for row in rows {
                let (status, count) = row?;
                match status.as_str() {
                    "pending" => counts.pending = count,
                    "processing" => counts.processing = count,
                    "sent" => counts.sent = count,
                    "retrying" => counts.retrying = count,
                    "failed" => counts.failed = count,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The single aggregate query backing the health monitor's consistency probe.
pub async fn consistency_counts(
    db: &Database,
    processing_ttl_secs: u64,
) -> Result<ConsistencyCounts, CourierError> {
    let cutoff_modifier = format!("-{processing_ttl_secs} seconds");
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                "SELECT
                     (SELECT COUNT(*) FROM queue
                      WHERE status = 'processing'
                        AND updated_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)),
                     (SELECT COUNT(*) FROM queue WHERE attempt_count > max_attempts)",
                params![cutoff_modifier],
                |row| {
                    Ok(ConsistencyCounts {
                        stuck_processing: row.get(0)?,
                        attempt_overflow: row.get(1)?,
                    })
                },
            )?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return `processing` entries stuck past the TTL to `retrying`.
///
/// Recovers entries orphaned by an invocation that died mid-batch. Returns
/// the number of reclaimed entries.
pub async fn reclaim_stuck(db: &Database, processing_ttl_secs: u64) -> Result<u32, CourierError> {
    let cutoff_modifier = format!("-{processing_ttl_secs} seconds");
    db.connection()
        .call(move |conn| {
            let reclaimed = conn.execute(
                "UPDATE queue SET status = 'retrying',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'processing'
                   AND updated_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                params![cutoff_modifier],
            )?;
            Ok(reclaimed as u32)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Map one `queue` row to a [`QueueEntry`].
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    let channel: String = row.get(2)?;
    let payload: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(QueueEntry {
        id: row.get(0)?,
        recipient: row.get(1)?,
        channel: parse_column(2, &channel)?,
        payload: serde_json::from_str(&payload).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        status: parse_column(4, &status)?,
        attempt_count: row.get(5)?,
        max_attempts: row.get(6)?,
        scheduled_for: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Parse a TEXT column into a typed enum, surfacing bad data as a
/// conversion failure on the offending column.
fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelKind;
    use courier_core::types::now_iso;
    use std::collections::BTreeMap;
    use std::collections::HashSet;
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

    fn push_entry(recipient: &str) -> NewQueueEntry {
        NewQueueEntry {
            recipient: recipient.to_string(),
            channel: ChannelKind::Push,
            payload: NotificationPayload::Push {
                title: "New appointment".to_string(),
                body: "Ana booked a haircut".to_string(),
                data: BTreeMap::new(),
            },
            scheduled_for: None,
            max_attempts: None,
        }
    }

    #[tokio::test]
    async fn enqueue_and_claim_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();

        let batch = claim_batch(&db, 10).await.unwrap();
        assert_eq!(batch.len(), 1);
        let entry = &batch[0];
        assert_eq!(entry.id, id.0);
        assert_eq!(entry.status, QueueStatus::Processing);
        assert_eq!(entry.attempt_count, 1);
        assert_eq!(entry.max_attempts, 3);
        assert_eq!(entry.recipient, "device-1");

        // Nothing eligible remains.
        let next = claim_batch(&db, 10).await.unwrap();
        assert!(next.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_skips_future_scheduled_entries() {
        let (db, _dir) = setup_db().await;

        let future = (chrono::Utc::now() + chrono::Duration::hours(1))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let mut entry = push_entry("device-1");
        entry.scheduled_for = Some(future);
        enqueue(&db, entry, 3).await.unwrap();

        let batch = claim_batch(&db, 10).await.unwrap();
        assert!(batch.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_orders_by_scheduled_for_and_respects_limit() {
        let (db, _dir) = setup_db().await;

        let older = (chrono::Utc::now() - chrono::Duration::minutes(10))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let newer = (chrono::Utc::now() - chrono::Duration::minutes(5))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();

        let mut late = push_entry("late");
        late.scheduled_for = Some(newer);
        let mut early = push_entry("early");
        early.scheduled_for = Some(older);

        enqueue(&db, late, 3).await.unwrap();
        enqueue(&db, early, 3).await.unwrap();

        let batch = claim_batch(&db, 1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, "early");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn terminal_transitions_are_idempotent() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();

        mark_sent(&db, &id.0).await.unwrap();
        let entry = get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Sent);

        // Re-applying a transition to a terminal row changes nothing.
        mark_sent(&db, &id.0).await.unwrap();
        mark_failed(&db, &id.0, "late failure").await.unwrap();
        mark_retrying(&db, &id.0, "late retry", &now_iso())
            .await
            .unwrap();

        let entry = get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Sent);
        assert_eq!(entry.last_error, None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_retrying_records_error_and_schedule() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();

        let next = (chrono::Utc::now() + chrono::Duration::minutes(2))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        mark_retrying(&db, &id.0, "provider 503", &next).await.unwrap();

        let entry = get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Retrying);
        assert_eq!(entry.last_error.as_deref(), Some("provider 503"));
        assert_eq!(entry.scheduled_for, next);

        // Not yet due, so not claimable.
        let batch = claim_batch(&db, 10).await.unwrap();
        assert!(batch.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_to_pending_clears_attempts_and_error() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();
        mark_failed(&db, &id.0, "provider down").await.unwrap();

        let prior = reset_to_pending(&db, &id.0).await.unwrap();
        assert_eq!(prior, QueueStatus::Failed);

        let entry = get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.attempt_count, 0);
        assert_eq!(entry.last_error, None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_to_pending_rejects_sent_entries() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();
        mark_sent(&db, &id.0).await.unwrap();

        let err = reset_to_pending(&db, &id.0).await.unwrap_err();
        assert!(matches!(err, CourierError::InvalidTransition { .. }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_to_pending_signals_not_found() {
        let (db, _dir) = setup_db().await;
        let err = reset_to_pending(&db, "no-such-id").await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound { .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_recipient_without_writing() {
        let (db, _dir) = setup_db().await;

        let err = enqueue(&db, push_entry("   "), 3).await.unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));

        let counts = status_counts(&db).await.unwrap();
        assert_eq!(counts, QueueCounts::default());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_template_name() {
        let (db, _dir) = setup_db().await;

        let entry = NewQueueEntry {
            recipient: "+4915112345678".to_string(),
            channel: ChannelKind::Whatsapp,
            payload: NotificationPayload::Template {
                name: "".to_string(),
                params: BTreeMap::new(),
            },
            scheduled_for: None,
            max_attempts: None,
        };
        let err = enqueue(&db, entry, 3).await.unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn backlog_counts_pending_and_retrying_only() {
        let (db, _dir) = setup_db().await;

        let a = enqueue(&db, push_entry("a"), 3).await.unwrap();
        enqueue(&db, push_entry("b"), 3).await.unwrap();
        let c = enqueue(&db, push_entry("c"), 3).await.unwrap();

        claim_batch(&db, 10).await.unwrap();
        mark_sent(&db, &a.0).await.unwrap();
        mark_retrying(&db, &c.0, "oops", &now_iso()).await.unwrap();

        // b is processing, a is sent, c is retrying.
        assert_eq!(backlog_depth(&db).await.unwrap(), 1);

        let counts = status_counts(&db).await.unwrap();
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.retrying, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reclaim_stuck_returns_old_processing_entries() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, push_entry("device-1"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();

        // Backdate the claim far past the TTL.
        let stuck_id = id.0.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE queue SET updated_at =
                     strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-3600 seconds')
                     WHERE id = ?1",
                    params![stuck_id],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();

        let consistency = consistency_counts(&db, 600).await.unwrap();
        assert_eq!(consistency.stuck_processing, 1);
        assert_eq!(consistency.attempt_overflow, 0);

        let reclaimed = reclaim_stuck(&db, 600).await.unwrap();
        assert_eq!(reclaimed, 1);

        let entry = get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Retrying);

        // Fresh processing entries are left alone.
        enqueue(&db, push_entry("device-2"), 3).await.unwrap();
        claim_batch(&db, 10).await.unwrap();
        let reclaimed = reclaim_stuck(&db, 600).await.unwrap();
        assert_eq!(reclaimed, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_never_overlap() {
        let (db, _dir) = setup_db().await;

        for i in 0..20 {
            enqueue(&db, push_entry(&format!("device-{i}")), 3)
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..5 {
            let db = db.clone();
            handles.push(tokio::spawn(
                async move { claim_batch(&db, 10).await },
            ));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            let batch = handle.await.unwrap().unwrap();
            total += batch.len();
            for entry in batch {
                assert!(
                    seen.insert(entry.id.clone()),
                    "entry {} claimed twice",
                    entry.id
                );
            }
        }
        assert_eq!(total, 20);

        db.close().await.unwrap();
    }
}
