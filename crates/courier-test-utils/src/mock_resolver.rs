// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock recipient resolver with canned contact details.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::error::CourierError;
use courier_core::traits::RecipientResolver;
use courier_core::types::Contact;

/// A mock identity resolver for testing.
///
/// Returns canned contacts inserted via [`insert_contact`], `Ok(None)` for
/// unknown ids, and an error for every lookup after [`set_failing`].
///
/// [`insert_contact`]: MockResolver::insert_contact
/// [`set_failing`]: MockResolver::set_failing
#[derive(Default)]
pub struct MockResolver {
    contacts: Arc<Mutex<HashMap<String, Contact>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a canned contact.
    pub async fn insert_contact(&self, contact: Contact) {
        self.contacts
            .lock()
            .await
            .insert(contact.business_id.clone(), contact);
    }

    /// Make every subsequent lookup fail, simulating an unreachable
    /// identity store.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

#[async_trait]
impl RecipientResolver for MockResolver {
    async fn business_contact(
        &self,
        business_id: &str,
    ) -> Result<Option<Contact>, CourierError> {
        if *self.failing.lock().await {
            return Err(CourierError::Internal(
                "identity store unreachable".to_string(),
            ));
        }
        Ok(self.contacts.lock().await.get(business_id).cloned())
    }
}
