// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel sender for deterministic testing.
//!
//! `MockSender` implements `ChannelSender` with per-recipient scripted
//! failures and captured send attempts for assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::error::ChannelError;
use courier_core::traits::ChannelSender;
use courier_core::types::{ChannelKind, NotificationPayload};

/// One captured send attempt.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub payload: NotificationPayload,
}

/// A mock channel sender for testing.
///
/// Every attempt is captured (including failing ones). Outcomes are
/// scripted per recipient: queued errors are popped one per attempt, and
/// once a recipient's queue is empty its sends succeed.
pub struct MockSender {
    channel: ChannelKind,
    failures: Arc<Mutex<HashMap<String, VecDeque<ChannelError>>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockSender {
    /// Create a mock sender for the given channel with no scripted failures.
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            failures: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Script `count` transient failures for a recipient; subsequent
    /// attempts succeed.
    pub async fn fail_times(&self, recipient: &str, count: usize, message: &str) {
        let mut failures = self.failures.lock().await;
        let queue = failures.entry(recipient.to_string()).or_default();
        for _ in 0..count {
            queue.push_back(ChannelError::transient(message));
        }
    }

    /// Script a single permanent failure for a recipient.
    pub async fn fail_permanently(&self, recipient: &str, message: &str) {
        let mut failures = self.failures.lock().await;
        failures
            .entry(recipient.to_string())
            .or_default()
            .push_back(ChannelError::permanent(message));
    }

    /// Make every send sleep for `delay` before completing; used to
    /// exercise the dispatcher's per-send timeout.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// All captured attempts, in order.
    pub async fn attempts(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Number of captured attempts.
    pub async fn attempt_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Attempts for one recipient.
    pub async fn attempts_for(&self, recipient: &str) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.recipient == recipient)
            .count()
    }
}

#[async_trait]
impl ChannelSender for MockSender {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.sent.lock().await.push(SentMessage {
            recipient: recipient.to_string(),
            payload: payload.clone(),
        });

        let mut failures = self.failures.lock().await;
        if let Some(queue) = failures.get_mut(recipient)
            && let Some(error) = queue.pop_front()
        {
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn payload() -> NotificationPayload {
        NotificationPayload::Push {
            title: "t".into(),
            body: "b".into(),
            data: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn unscripted_sends_succeed_and_are_captured() {
        let sender = MockSender::new(ChannelKind::Push);
        sender.send("device-1", &payload()).await.unwrap();
        sender.send("device-2", &payload()).await.unwrap();

        assert_eq!(sender.attempt_count().await, 2);
        assert_eq!(sender.attempts_for("device-1").await, 1);
    }

    #[tokio::test]
    async fn scripted_failures_pop_in_order() {
        let sender = MockSender::new(ChannelKind::Push);
        sender.fail_times("device-1", 2, "provider 503").await;

        assert!(sender.send("device-1", &payload()).await.is_err());
        assert!(sender.send("device-1", &payload()).await.is_err());
        assert!(sender.send("device-1", &payload()).await.is_ok());

        // Other recipients are unaffected.
        assert!(sender.send("device-2", &payload()).await.is_ok());
        assert_eq!(sender.attempt_count().await, 4);
    }

    #[tokio::test]
    async fn permanent_failures_are_flagged() {
        let sender = MockSender::new(ChannelKind::Push);
        sender.fail_permanently("device-1", "subscription gone").await;

        let err = sender.send("device-1", &payload()).await.unwrap_err();
        assert!(err.is_permanent());
    }
}
