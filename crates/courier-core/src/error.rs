// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier notification pipeline.

use thiserror::Error;

use crate::types::QueueStatus;

/// The primary error type used across all Courier crates.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel sender errors surfaced outside the dispatch loop.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referenced queue entry does not exist.
    #[error("queue entry not found: {id}")]
    NotFound { id: String },

    /// A state transition was rejected by the queue state machine.
    #[error("invalid transition for entry {id}: status is {status}")]
    InvalidTransition { id: String, status: QueueStatus },

    /// Malformed input rejected at the enqueue boundary. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error returned by a [`crate::traits::ChannelSender`].
///
/// The distinction drives the dispatch worker's retry routing: `Transient`
/// failures consume an attempt and are retried with backoff, `Permanent`
/// failures (invalid recipient, provider rejecting the content) move the
/// entry straight to `failed` without burning the remaining attempts.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Recoverable failure: network error, provider 5xx, timeout.
    #[error("transient channel failure: {message}")]
    Transient { message: String },

    /// Unrecoverable failure: invalid recipient, provider 4xx.
    #[error("permanent channel failure: {message}")]
    Permanent { message: String },
}

impl ChannelError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Map an HTTP provider response status to the transient/permanent split.
    ///
    /// 4xx means the provider understood and rejected the request, so
    /// retrying the identical payload cannot succeed. Everything else
    /// (5xx, unexpected codes) is worth another attempt.
    pub fn from_http_status(status: u16, detail: impl Into<String>) -> Self {
        let message = format!("provider returned {status}: {}", detail.into());
        if (400..500).contains(&status) {
            Self::Permanent { message }
        } else {
            Self::Transient { message }
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient { message } | Self::Permanent { message } => message,
        }
    }
}
