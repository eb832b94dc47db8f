// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier health` command implementation.
//!
//! Runs one composite probe and renders the per-probe results. With
//! `--plain`, disables colored output.

use std::io::IsTerminal;

use courier_core::types::{HealthReport, HealthState};
use courier_core::CourierError;
use courier_pipeline::HealthMonitor;

/// Run the `courier health` command. Returns the overall state so the
/// caller can map it to an exit code.
pub async fn run_health(monitor: &HealthMonitor, plain: bool) -> Result<HealthState, CourierError> {
    let report = monitor.probe().await?;
    print_report(&report, plain);
    Ok(report.overall)
}

fn print_report(report: &HealthReport, plain: bool) {
    let use_color = !plain && std::io::stdout().is_terminal();

    println!();
    println!("  courier health");
    println!("  {}", "-".repeat(50));

    for probe in &report.probes {
        let detail = probe.detail.as_deref().unwrap_or("");
        let line = format!(
            "{:<14} {:>10.1}  {} {}",
            probe.metric_type, probe.value, probe.status, detail
        );
        if use_color {
            use colored::Colorize;
            match probe.status {
                HealthState::Healthy => println!("    {} {}", "✓".green(), line),
                HealthState::Warning => println!("    {} {}", "!".yellow(), line.yellow()),
                HealthState::Critical => println!("    {} {}", "✗".red(), line.red()),
            }
        } else {
            let tag = match probe.status {
                HealthState::Healthy => "[OK]  ",
                HealthState::Warning => "[WARN]",
                HealthState::Critical => "[CRIT]",
            };
            println!("    {tag} {line}");
        }
    }

    println!();
    println!("  overall: {}", report.overall);
    println!();
}
