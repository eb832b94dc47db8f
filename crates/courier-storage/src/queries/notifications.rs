// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-app notification records.
//!
//! Written by the enqueuer alongside each push/queue send so the owning
//! application can show an audit trail of what was delivered and why.

use courier_core::CourierError;
use rusqlite::params;

use crate::database::Database;
use crate::models::NotificationRecord;

/// Insert one in-app notification record.
pub async fn insert_notification(
    db: &Database,
    record: &NotificationRecord,
) -> Result<(), CourierError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, kind, title, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.recipient_id,
                    record.kind.to_string(),
                    record.title,
                    record.body,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Records for one recipient, newest first.
pub async fn notifications_for_recipient(
    db: &Database,
    recipient_id: &str,
    limit: u32,
) -> Result<Vec<NotificationRecord>, CourierError> {
    let recipient_id = recipient_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipient_id, kind, title, body, created_at
                 FROM notifications WHERE recipient_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![recipient_id, limit], |row| {
                let kind: String = row.get(2)?;
                Ok(NotificationRecord {
                    id: row.get(0)?,
                    recipient_id: row.get(1)?,
                    kind: kind.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    title: row.get(3)?,
                    body: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
