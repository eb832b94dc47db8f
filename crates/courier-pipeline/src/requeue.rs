// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Requeue operator: administrative reset of a failed or stuck entry.

use courier_core::types::QueueEntry;
use courier_core::CourierError;
use courier_storage::queries::queue;
use courier_storage::Database;
use tracing::info;

/// Reset a non-`sent` entry to `pending` with a cleared attempt counter.
///
/// Signals `NotFound` for unknown ids and `InvalidTransition` when the
/// entry was already delivered. Emits an audit log line recording who
/// requeued what, and from which state.
pub async fn requeue(db: &Database, id: &str, actor: &str) -> Result<QueueEntry, CourierError> {
    let prior = queue::reset_to_pending(db, id).await?;

    let entry = queue::get_entry(db, id)
        .await?
        .ok_or_else(|| CourierError::NotFound { id: id.to_string() })?;

    info!(
        target: "audit",
        entry_id = %id,
        actor = %actor,
        prior_status = %prior,
        "queue entry requeued"
    );
    Ok(entry)
}
