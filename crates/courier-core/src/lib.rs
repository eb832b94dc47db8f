// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier notification pipeline.
//!
//! This crate provides the error types, canonical domain types, and the
//! trait seams (channel senders, recipient resolution) shared by the rest
//! of the workspace. It holds no I/O of its own.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ChannelError, CourierError};
pub use traits::{ChannelSender, RecipientResolver};
pub use types::{
    BatchResult, ChannelKind, HealthState, NewQueueEntry, NotificationPayload, QueueEntry,
    QueueEntryId, QueueStatus,
};
