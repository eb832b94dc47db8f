// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel sender trait implemented by the per-channel adapter crates.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::types::{ChannelKind, NotificationPayload};

/// Adapter that performs the actual transmission for one channel.
///
/// Senders are treated as unreliable, possibly slow, I/O: the dispatch
/// worker wraps every call in a timeout and converts the typed error into
/// a queue state transition. Implementations must not retry internally --
/// retry policy belongs to the worker.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender handles; used as the registry key.
    fn channel(&self) -> ChannelKind;

    /// Transmit one message to `recipient`.
    ///
    /// `recipient` is the channel-specific address (email address, phone
    /// number, push subscription target). Return [`ChannelError::Permanent`]
    /// only when retrying the identical send cannot succeed.
    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError>;
}
