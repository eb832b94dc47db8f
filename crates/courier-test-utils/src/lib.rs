// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Courier workspace.
//!
//! Deterministic doubles for the pipeline's external collaborators: a
//! scriptable channel sender and a canned recipient resolver.

pub mod mock_resolver;
pub mod mock_sender;

pub use mock_resolver::MockResolver;
pub use mock_sender::{MockSender, SentMessage};
