// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Courier pipeline components.
//!
//! Four scheduler-invoked operations over the shared queue store:
//!
//! - [`EventEnqueuer::handle_event`] -- domain event in, zero or one queue
//!   entries out
//! - [`Dispatcher::dispatch_cycle`] -- claim a batch, send, transition;
//!   idempotent per call and safe to overlap
//! - [`requeue::requeue`] -- administrative reset of a failed entry
//! - [`HealthMonitor::probe`] -- composite health probe with persisted
//!   samples and deduplicated alerts
//!
//! All components are short-lived invocations with no process-lifetime
//! state; the queue store is the only shared mutable resource.

pub mod dispatcher;
pub mod enqueuer;
pub mod health;
pub mod metrics;
pub mod requeue;
pub mod resolver;

pub use dispatcher::Dispatcher;
pub use enqueuer::EventEnqueuer;
pub use health::HealthMonitor;
pub use requeue::requeue;
pub use resolver::StoreResolver;
