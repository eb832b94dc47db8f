// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch worker: claims due queue entries and drives them to a
//! terminal or retry state.
//!
//! One invocation is one bounded cycle, safe to overlap with concurrent
//! invocations: exclusivity comes entirely from the storage layer's atomic
//! claim. Per-entry failures become state transitions and never abort the
//! batch; only a storage failure is fatal to the cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_config::model::DispatchConfig;
use courier_core::error::ChannelError;
use courier_core::traits::ChannelSender;
use courier_core::types::{BatchResult, ChannelKind, EntryError, QueueEntry};
use courier_core::CourierError;
use courier_storage::queries::queue;
use courier_storage::Database;
use tracing::{info, warn};

use crate::metrics;

/// The dispatch worker. Holds the sender registry and retry policy.
pub struct Dispatcher {
    db: Database,
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(db: Database, config: DispatchConfig) -> Self {
        Self {
            db,
            senders: HashMap::new(),
            config,
        }
    }

    /// Register a sender under its channel. A channel without a sender
    /// fails its entries permanently -- a misconfiguration, not a
    /// retryable condition.
    pub fn register_sender(&mut self, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(sender.channel(), sender);
    }

    /// Run one dispatch cycle: reclaim stuck entries, claim a batch, send
    /// each entry, and record the outcome transitions.
    pub async fn dispatch_cycle(&self) -> Result<BatchResult, CourierError> {
        let reclaimed = queue::reclaim_stuck(&self.db, self.config.processing_ttl_secs).await?;
        if reclaimed > 0 {
            warn!(count = reclaimed, "reclaimed stuck processing entries");
        }

        let batch = queue::claim_batch(&self.db, self.config.batch_size).await?;
        let mut result = BatchResult::default();

        for entry in batch {
            result.processed += 1;
            let started = Instant::now();
            let outcome = self.send_one(&entry).await;
            metrics::record_send_latency(
                &entry.channel.to_string(),
                started.elapsed().as_secs_f64(),
            );

            match outcome {
                Ok(()) => {
                    queue::mark_sent(&self.db, &entry.id).await?;
                    result.sent += 1;
                    metrics::record_dispatch_outcome(&entry.channel.to_string(), "sent");
                    info!(
                        entry_id = %entry.id,
                        channel = %entry.channel,
                        attempt = entry.attempt_count,
                        "notification sent"
                    );
                }
                Err(error) => {
                    self.handle_failure(&entry, error, &mut result).await?;
                }
            }
        }

        if let Ok(depth) = queue::backlog_depth(&self.db).await {
            metrics::set_queue_depth(depth as f64);
        }

        info!(
            processed = result.processed,
            sent = result.sent,
            retried = result.retried,
            failed = result.failed,
            "dispatch cycle complete"
        );
        Ok(result)
    }

    /// Route one failed send into the retry state machine.
    ///
    /// Permanent errors go straight to `failed` without consuming the
    /// remaining attempt budget. Transient errors retry with exponential
    /// backoff until `max_attempts` is reached.
    async fn handle_failure(
        &self,
        entry: &QueueEntry,
        error: ChannelError,
        result: &mut BatchResult,
    ) -> Result<(), CourierError> {
        let message = error.message().to_string();
        result.errors.push(EntryError {
            id: entry.id.clone(),
            error: message.clone(),
        });

        let exhausted = entry.attempt_count >= entry.max_attempts;
        if error.is_permanent() || exhausted {
            queue::mark_failed(&self.db, &entry.id, &message).await?;
            result.failed += 1;
            metrics::record_dispatch_outcome(&entry.channel.to_string(), "failed");
            warn!(
                entry_id = %entry.id,
                channel = %entry.channel,
                attempt = entry.attempt_count,
                permanent = error.is_permanent(),
                error = %message,
                "notification failed"
            );
        } else {
            let next_attempt_at = next_attempt_time(entry.attempt_count, &self.config);
            queue::mark_retrying(&self.db, &entry.id, &message, &next_attempt_at).await?;
            result.retried += 1;
            metrics::record_dispatch_outcome(&entry.channel.to_string(), "retried");
            warn!(
                entry_id = %entry.id,
                channel = %entry.channel,
                attempt = entry.attempt_count,
                next_attempt_at = %next_attempt_at,
                error = %message,
                "notification send failed, will retry"
            );
        }
        Ok(())
    }

    /// Look up the sender and send with the per-send timeout applied.
    async fn send_one(&self, entry: &QueueEntry) -> Result<(), ChannelError> {
        let sender = self.senders.get(&entry.channel).ok_or_else(|| {
            ChannelError::permanent(format!(
                "no sender configured for channel {}",
                entry.channel
            ))
        })?;

        let timeout = Duration::from_secs(self.config.send_timeout_secs);
        match tokio::time::timeout(timeout, sender.send(&entry.recipient, &entry.payload)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError::transient(format!(
                "send timed out after {}s",
                self.config.send_timeout_secs
            ))),
        }
    }
}

/// Backoff delay before attempt `attempt_count + 1`, without jitter:
/// `base * 2^(attempt_count - 1)`, capped.
fn retry_delay_secs(attempt_count: u32, config: &DispatchConfig) -> u64 {
    let exponent = attempt_count.saturating_sub(1).min(31);
    let delay = config
        .retry_base_delay_secs
        .saturating_mul(1u64 << exponent);
    delay.min(config.retry_max_delay_secs)
}

/// Next eligibility time for a retried entry: capped exponential backoff
/// plus 0-25% jitter so a burst of failures does not retry in lockstep.
fn next_attempt_time(attempt_count: u32, config: &DispatchConfig) -> String {
    let delay = retry_delay_secs(attempt_count, config);
    let jitter = (delay as f64 * 0.25 * rand::random::<f64>()) as u64;
    (chrono::Utc::now() + chrono::Duration::seconds((delay + jitter) as i64))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
