// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its external collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod resolver;
pub mod sender;

pub use resolver::RecipientResolver;
pub use sender::ChannelSender;
