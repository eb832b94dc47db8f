// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! a deployment installs can collect these metrics. Without a recorder
//! the calls are no-ops.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Courier metric descriptions.
///
/// Called once at startup after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "courier_dispatch_total",
        "Dispatch outcomes by terminal state per attempt"
    );
    describe_gauge!("courier_queue_depth", "Entries awaiting delivery");
    describe_histogram!(
        "courier_send_seconds",
        "Channel sender latency in seconds"
    );
}

/// Record one dispatch attempt outcome (`sent`, `retried`, `failed`).
pub fn record_dispatch_outcome(channel: &str, outcome: &str) {
    metrics::counter!(
        "courier_dispatch_total",
        "channel" => channel.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Set the current backlog depth.
pub fn set_queue_depth(depth: f64) {
    metrics::gauge!("courier_queue_depth").set(depth);
}

/// Record one channel send's latency.
pub fn record_send_latency(channel: &str, seconds: f64) {
    metrics::histogram!("courier_send_seconds", "channel" => channel.to_string())
        .record(seconds);
}
