// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - asynchronous notification delivery pipeline.
//!
//! This binary exposes the pipeline's scheduler-invoked operations as
//! subcommands: an external cron triggers `dispatch` and `health`, the
//! administrative surface calls `requeue`, and event producers pipe
//! appointment events into `ingest`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod health;
mod senders;
mod status;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use courier_config::CourierConfig;
use courier_core::types::{
    AppointmentEvent, ChannelKind, Contact, HealthState, NewQueueEntry, NotificationPayload,
};
use courier_core::CourierError;
use courier_pipeline::{Dispatcher, EventEnqueuer, HealthMonitor, StoreResolver};
use courier_storage::queries::{contacts, queue};
use courier_storage::Database;
use tokio::io::AsyncReadExt;
use tracing::info;

/// Courier - asynchronous notification delivery pipeline.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one dispatch cycle over the queue.
    Dispatch,
    /// Run one composite health probe.
    Health {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Reset a failed or stuck entry back to pending.
    Requeue {
        /// Queue entry id.
        id: String,
        /// Recorded in the audit log.
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Read one appointment event as JSON from stdin and enqueue it.
    Ingest,
    /// Enqueue a notification directly.
    Enqueue {
        /// Delivery channel: email, whatsapp, sms, or push.
        #[arg(long)]
        channel: String,
        /// Channel-specific recipient address.
        #[arg(long)]
        recipient: String,
        /// Payload JSON (template or push form).
        #[arg(long)]
        payload: String,
        /// Optional future delivery time (ISO-8601 UTC).
        #[arg(long)]
        scheduled_for: Option<String>,
    },
    /// Show queue counts and recent health samples.
    Status {
        /// Output structured JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Set contact details for a business.
    Contact {
        /// Business id the contact belongs to.
        business_id: String,
        #[arg(long)]
        push_target: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match courier_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);
    // Metric descriptions registered up front; recording is a no-op until
    // a deployment installs a recorder.
    courier_pipeline::metrics::register_metrics();

    let Some(command) = cli.command else {
        println!("courier: use --help for available commands");
        return;
    };

    match run(command, &config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(error) => {
            eprintln!("courier: {error}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: &CourierConfig) -> Result<i32, CourierError> {
    let db = Database::open(&config.storage).await?;

    let exit_code = match command {
        Commands::Dispatch => {
            let mut dispatcher = Dispatcher::new(db.clone(), config.dispatch.clone());
            for sender in senders::build_senders(config)? {
                dispatcher.register_sender(sender);
            }
            let result = dispatcher.dispatch_cycle().await?;
            println!(
                "dispatch: processed={} sent={} retried={} failed={}",
                result.processed, result.sent, result.retried, result.failed
            );
            for error in &result.errors {
                eprintln!("  {}: {}", error.id, error.error);
            }
            0
        }
        Commands::Health { plain } => {
            let monitor = HealthMonitor::new(
                db.clone(),
                config.health.clone(),
                config.dispatch.processing_ttl_secs,
            );
            let overall = health::run_health(&monitor, plain).await?;
            if overall == HealthState::Critical {
                1
            } else {
                0
            }
        }
        Commands::Requeue { id, actor } => {
            let entry = courier_pipeline::requeue(&db, &id, &actor).await?;
            println!(
                "requeued {} (channel {}, attempts reset from max {})",
                entry.id, entry.channel, entry.max_attempts
            );
            0
        }
        Commands::Ingest => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .map_err(|e| CourierError::Validation(format!("failed to read stdin: {e}")))?;
            let event: AppointmentEvent = serde_json::from_str(&input)
                .map_err(|e| CourierError::Validation(format!("invalid event JSON: {e}")))?;

            let mut enqueuer = EventEnqueuer::new(
                db.clone(),
                Arc::new(StoreResolver::new(db.clone())),
                &config.dispatch,
            );
            if config.dispatch.direct_push
                && let Some(push) = senders::build_push_sender(config)?
            {
                enqueuer = enqueuer.with_direct_push(push);
            }

            match enqueuer.handle_event(&event).await? {
                Some(id) => println!("enqueued {id}"),
                None => println!("no notification produced"),
            }
            0
        }
        Commands::Enqueue {
            channel,
            recipient,
            payload,
            scheduled_for,
        } => {
            let channel: ChannelKind = channel
                .parse()
                .map_err(|_| CourierError::Validation(format!("unknown channel `{channel}`")))?;
            let payload: NotificationPayload = serde_json::from_str(&payload)
                .map_err(|e| CourierError::Validation(format!("invalid payload JSON: {e}")))?;

            let id = queue::enqueue(
                &db,
                NewQueueEntry {
                    recipient,
                    channel,
                    payload,
                    scheduled_for,
                    max_attempts: None,
                },
                config.dispatch.max_attempts,
            )
            .await?;
            println!("enqueued {id}");
            0
        }
        Commands::Status { json, plain } => {
            status::run_status(&db, json, plain).await?;
            0
        }
        Commands::Contact {
            business_id,
            push_target,
            email,
            phone,
        } => {
            contacts::upsert_contact(
                &db,
                &Contact {
                    business_id: business_id.clone(),
                    push_target,
                    email,
                    phone,
                },
            )
            .await?;
            info!(business_id = %business_id, "contact updated");
            println!("contact {business_id} updated");
            0
        }
    };

    db.close().await?;
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_is_valid() {
        // The binary must start with no config file present.
        let config = courier_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.dispatch.batch_size, 10);
    }
}
