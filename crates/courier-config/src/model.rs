// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; a channel section left unconfigured simply disables that channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Dispatch worker policy: batch size, retries, timeouts.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Health monitor thresholds.
    #[serde(default)]
    pub health: HealthConfig,

    /// SMTP email channel settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// WhatsApp Business Cloud API channel settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// SMS gateway channel settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Push gateway channel settings.
    #[serde(default)]
    pub push: PushConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Dispatch worker policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum entries claimed per dispatch cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Delivery attempts before an entry is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-send timeout in seconds; a stuck sender cannot consume the batch window.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Base delay for exponential retry backoff, in seconds.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,

    /// Cap applied to the backoff delay, in seconds.
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,

    /// Age after which a `processing` entry is considered stuck and
    /// reclaimed to `retrying`. Must be well above `send_timeout_secs`.
    #[serde(default = "default_processing_ttl_secs")]
    pub processing_ttl_secs: u64,

    /// Attempt a synchronous push before enqueueing, for latency-sensitive
    /// events. The queue remains the durable fallback path.
    #[serde(default)]
    pub direct_push: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            send_timeout_secs: default_send_timeout_secs(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
            processing_ttl_secs: default_processing_ttl_secs(),
            direct_push: false,
        }
    }
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_retry_base_delay_secs() -> u64 {
    60
}

fn default_retry_max_delay_secs() -> u64 {
    3600
}

fn default_processing_ttl_secs() -> u64 {
    600
}

/// Health monitor thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Service name recorded on every health sample.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Backlog depth above which queue health degrades to warning.
    #[serde(default = "default_queue_warning_threshold")]
    pub queue_warning_threshold: u32,

    /// Backlog depth above which queue health degrades to critical.
    #[serde(default = "default_queue_critical_threshold")]
    pub queue_critical_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            queue_warning_threshold: default_queue_warning_threshold(),
            queue_critical_threshold: default_queue_critical_threshold(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_queue_warning_threshold() -> u32 {
    100
}

fn default_queue_critical_threshold() -> u32 {
    500
}

/// SMTP email channel configuration. `None` host disables the channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay hostname. `None` disables email delivery.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP submission port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username; paired with `smtp_password`.
    #[serde(default)]
    pub smtp_username: Option<String>,

    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// From address on outgoing mail. Required when the channel is enabled.
    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// WhatsApp Business Cloud API configuration. `None` token disables the channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Cloud API access token. `None` disables WhatsApp delivery.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sending phone number id registered with the Cloud API.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Cloud API base URL; overridable for testing.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            api_base: default_whatsapp_api_base(),
        }
    }
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

/// SMS gateway configuration. `None` url disables the channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Gateway endpoint URL. `None` disables SMS delivery.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the gateway.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Sender id shown to recipients.
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// Push gateway configuration. `None` url disables the channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Push gateway endpoint URL. `None` disables push delivery.
    #[serde(default)]
    pub api_url: Option<String>,

    /// API key for the gateway.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
