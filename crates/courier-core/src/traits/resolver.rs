// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient resolution trait over the identity store.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::Contact;

/// Resolves a business id to contact details.
///
/// Resolution failures are non-fatal to callers: the enqueuer drops the
/// single notification and lets the triggering event flow continue. A
/// notification with no resolvable recipient is worse than a missing one.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Look up the owning business's contact details.
    ///
    /// `Ok(None)` means the business exists nowhere in the directory;
    /// `Err` means the lookup itself failed.
    async fn business_contact(&self, business_id: &str)
        -> Result<Option<Contact>, CourierError>;
}
