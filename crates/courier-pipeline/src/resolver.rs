// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-backed recipient resolver.
//!
//! Resolves business contact details from the `contacts` table in the
//! relational store. Deployments integrating a separate identity service
//! supply their own [`RecipientResolver`] instead.

use async_trait::async_trait;
use courier_core::traits::RecipientResolver;
use courier_core::types::Contact;
use courier_core::CourierError;
use courier_storage::queries::contacts;
use courier_storage::Database;

/// [`RecipientResolver`] over the contact directory in the queue store.
pub struct StoreResolver {
    db: Database,
}

impl StoreResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipientResolver for StoreResolver {
    async fn business_contact(
        &self,
        business_id: &str,
    ) -> Result<Option<Contact>, CourierError> {
        contacts::get_contact(&self.db, business_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn resolves_contacts_from_the_store() {
        let dir = tempdir().unwrap();
        let config = courier_config::model::StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();

        contacts::upsert_contact(
            &db,
            &Contact {
                business_id: "biz-1".to_string(),
                push_target: Some("device-token-1".to_string()),
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap();

        let resolver = StoreResolver::new(db.clone());
        let found = resolver.business_contact("biz-1").await.unwrap().unwrap();
        assert_eq!(found.push_target.as_deref(), Some("device-token-1"));
        assert!(resolver.business_contact("biz-2").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
