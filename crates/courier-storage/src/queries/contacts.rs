// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact directory backing the store-based recipient resolver.

use courier_core::CourierError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::Contact;

/// Insert or replace the contact details for a business.
pub async fn upsert_contact(db: &Database, contact: &Contact) -> Result<(), CourierError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (business_id, push_target, email, phone)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(business_id) DO UPDATE SET
                     push_target = excluded.push_target,
                     email = excluded.email,
                     phone = excluded.phone,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    contact.business_id,
                    contact.push_target,
                    contact.email,
                    contact.phone,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch contact details by business id.
pub async fn get_contact(db: &Database, business_id: &str) -> Result<Option<Contact>, CourierError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    "SELECT business_id, push_target, email, phone
                     FROM contacts WHERE business_id = ?1",
                    params![business_id],
                    |row| {
                        Ok(Contact {
                            business_id: row.get(0)?,
                            push_target: row.get(1)?,
                            email: row.get(2)?,
                            phone: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
