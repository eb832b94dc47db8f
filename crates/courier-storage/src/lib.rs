// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier notification pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! operations for the notification queue, health samples, alerts, in-app
//! notifications, and the contact directory.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use database::Database;
pub use models::*;
