// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier status` command implementation.
//!
//! Shows per-status queue counts and the most recent health samples.
//! With `--json`, outputs structured JSON for scripting.

use std::io::IsTerminal;

use courier_core::types::HealthSample;
use courier_core::CourierError;
use courier_storage::queries::{health, queue};
use courier_storage::Database;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub queue: queue::QueueCounts,
    pub backlog_depth: i64,
    pub recent_samples: Vec<HealthSample>,
}

/// Run the `courier status` command.
pub async fn run_status(db: &Database, json: bool, plain: bool) -> Result<(), CourierError> {
    let counts = queue::status_counts(db).await?;
    let depth = queue::backlog_depth(db).await?;
    let samples = health::recent_samples(db, 6).await?;

    if json {
        let response = StatusResponse {
            queue: counts,
            backlog_depth: depth,
            recent_samples: samples,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();

    println!();
    println!("  courier status");
    println!("  {}", "-".repeat(40));
    println!("    pending:    {}", counts.pending);
    println!("    processing: {}", counts.processing);
    println!("    retrying:   {}", counts.retrying);
    println!("    sent:       {}", counts.sent);
    println!("    failed:     {}", counts.failed);
    println!("    backlog:    {depth}");

    if !samples.is_empty() {
        println!();
        println!("  recent health samples");
        println!("  {}", "-".repeat(40));
        for sample in &samples {
            let line = format!(
                "    {:<14} {:>10.1}  {} ({})",
                sample.metric_type, sample.value, sample.status, sample.observed_at
            );
            if use_color {
                use colored::Colorize;
                match sample.status {
                    courier_core::types::HealthState::Healthy => println!("{}", line.green()),
                    courier_core::types::HealthState::Warning => println!("{}", line.yellow()),
                    courier_core::types::HealthState::Critical => println!("{}", line.red()),
                }
            } else {
                println!("{line}");
            }
        }
    }
    println!();

    Ok(())
}
