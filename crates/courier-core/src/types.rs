// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical domain types shared across the Courier workspace.
//!
//! These are the types that cross crate boundaries: queue entries and their
//! state machine, channel identifiers, health observations, and the
//! appointment events the enqueuer consumes. The storage crate re-exports
//! them for convenience.
//!
//! Timestamps are ISO-8601 UTC text with millisecond precision
//! (`2026-01-01T00:00:00.000Z`), the same representation the storage layer
//! writes via SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`. Text in
//! this format compares correctly with `<=` both in SQL and in Rust.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntryId(pub String);

impl std::fmt::Display for QueueEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery channel for a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Whatsapp,
    Sms,
    Push,
}

/// Lifecycle state of a queue entry.
///
/// `pending -> processing -> {sent | retrying | failed}`; `retrying`
/// becomes eligible again once its `scheduled_for` passes and returns to
/// `processing` on the next claim. `sent` and `failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Sent,
    Retrying,
    Failed,
}

impl QueueStatus {
    /// Terminal states are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

/// Channel-appropriate notification content, stored as JSON in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationPayload {
    /// A provider-side template with named parameters (email, WhatsApp, SMS).
    Template {
        name: String,
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
    /// Title/body/data content for push delivery.
    Push {
        title: String,
        body: String,
        #[serde(default)]
        data: BTreeMap<String, String>,
    },
}

/// One notification job and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    /// Opaque address; interpretation is channel-specific.
    pub recipient: String,
    pub channel: ChannelKind,
    pub payload: NotificationPayload,
    pub status: QueueStatus,
    pub attempt_count: u32,
    pub max_attempts: u32,
    /// Entry is eligible for dispatch only once `now >= scheduled_for`.
    pub scheduled_for: String,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input to `enqueue`. Everything not supplied defaults at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQueueEntry {
    pub recipient: String,
    pub channel: ChannelKind,
    pub payload: NotificationPayload,
    /// Defaults to now; set a future time for scheduled reminders.
    #[serde(default)]
    pub scheduled_for: Option<String>,
    /// Defaults to the configured dispatch policy.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Classification of a health probe or of the overall system.
///
/// Ordered so that `max()` yields the worst observed state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Warning,
    Critical,
}

/// Point-in-time observation persisted by the health monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub id: String,
    pub service_name: String,
    pub metric_type: String,
    pub value: f64,
    pub status: HealthState,
    /// Free-form JSON context.
    pub metadata: Option<String>,
    pub observed_at: String,
}

/// Severity of a raised alert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Alert raised when a probe crosses the critical threshold.
///
/// Alerts are append-only facts; resolution flips the `resolved` flag and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    /// Deduplication key: a new alert is suppressed while an unresolved
    /// alert with the same type exists.
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub context: Option<String>,
    pub resolved: bool,
    pub created_at: String,
}

/// Result of one probe inside a composite health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub metric_type: String,
    pub value: f64,
    pub status: HealthState,
    pub detail: Option<String>,
}

/// Composite outcome of one health monitor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: HealthState,
    pub probes: Vec<ProbeResult>,
}

/// Per-entry failure captured in a [`BatchResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryError {
    pub id: String,
    pub error: String,
}

/// Summary of one dispatch worker invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: u32,
    pub sent: u32,
    pub retried: u32,
    pub failed: u32,
    pub errors: Vec<EntryError>,
}

/// Lifecycle state of an appointment in the owning application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// The appointment fields the enqueuer needs to build a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub business_id: String,
    pub client_name: String,
    pub service_name: String,
    /// ISO-8601 start time, rendered verbatim into message bodies.
    pub starts_at: String,
    pub status: AppointmentStatus,
}

/// Domain event consumed by the event enqueuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AppointmentEvent {
    Created {
        appointment: Appointment,
    },
    Updated {
        appointment: Appointment,
        previous_status: AppointmentStatus,
    },
}

/// Semantic type shared by a push message and its in-app counterpart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentCreated,
    AppointmentConfirmed,
    AppointmentCancelled,
    AppointmentCompleted,
}

/// Contact details returned by the recipient resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub business_id: String,
    pub push_target: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// In-app notification record written alongside each queued/pushed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

/// Current UTC time in the canonical timestamp format.
///
/// Matches what the storage layer writes via
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`.
pub fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
