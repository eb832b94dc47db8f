// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event enqueuer: turns appointment lifecycle events into zero or one
//! queued notifications.
//!
//! Only status *changes* produce notifications -- a no-op update or an
//! unrelated field edit produces nothing, which is what keeps bulk edits
//! from becoming notification storms. Recipient resolution failures drop
//! the single notification and let the event flow continue.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_config::model::DispatchConfig;
use courier_core::traits::{ChannelSender, RecipientResolver};
use courier_core::types::{
    now_iso, Appointment, AppointmentEvent, AppointmentStatus, ChannelKind, NewQueueEntry,
    NotificationKind, NotificationPayload, NotificationRecord, QueueEntryId,
};
use courier_core::CourierError;
use courier_storage::queries::{notifications, queue};
use courier_storage::Database;
use tracing::{info, warn};

/// Translates domain events into queue entries and in-app records.
pub struct EventEnqueuer {
    db: Database,
    resolver: Arc<dyn RecipientResolver>,
    direct_push: Option<Arc<dyn ChannelSender>>,
    max_attempts: u32,
}

impl EventEnqueuer {
    pub fn new(
        db: Database,
        resolver: Arc<dyn RecipientResolver>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            db,
            resolver,
            direct_push: None,
            max_attempts: config.max_attempts,
        }
    }

    /// Wire in a push sender for the latency-sensitive direct path. On any
    /// direct-send failure the notification falls back to the queue, which
    /// remains the durable path.
    pub fn with_direct_push(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.direct_push = Some(sender);
        self
    }

    /// Handle one appointment event.
    ///
    /// Returns the id of the enqueued entry, or `None` when the event
    /// warranted no notification, the recipient could not be resolved, or
    /// the direct push already delivered it.
    pub async fn handle_event(
        &self,
        event: &AppointmentEvent,
    ) -> Result<Option<QueueEntryId>, CourierError> {
        let Some((kind, appointment)) = classify(event) else {
            return Ok(None);
        };

        let contact = match self.resolver.business_contact(&appointment.business_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(
                    business_id = %appointment.business_id,
                    kind = %kind,
                    "no contact for business, dropping notification"
                );
                return Ok(None);
            }
            Err(error) => {
                warn!(
                    business_id = %appointment.business_id,
                    kind = %kind,
                    error = %error,
                    "recipient resolution failed, dropping notification"
                );
                return Ok(None);
            }
        };

        let Some(push_target) = contact.push_target else {
            warn!(
                business_id = %appointment.business_id,
                kind = %kind,
                "contact has no push target, dropping notification"
            );
            return Ok(None);
        };

        let (title, body) = message_for(kind, appointment);

        // In-app record first: it is the audit trail for the send that
        // follows, whichever path delivers it.
        notifications::insert_notification(
            &self.db,
            &NotificationRecord {
                id: uuid::Uuid::new_v4().to_string(),
                recipient_id: appointment.business_id.clone(),
                kind,
                title: title.clone(),
                body: body.clone(),
                created_at: now_iso(),
            },
        )
        .await?;

        let mut data = BTreeMap::new();
        data.insert("appointment_id".to_string(), appointment.id.clone());
        data.insert("kind".to_string(), kind.to_string());
        let payload = NotificationPayload::Push {
            title,
            body,
            data,
        };

        if let Some(ref sender) = self.direct_push {
            match sender.send(&push_target, &payload).await {
                Ok(()) => {
                    info!(
                        business_id = %appointment.business_id,
                        kind = %kind,
                        "notification delivered via direct push"
                    );
                    return Ok(None);
                }
                Err(error) => {
                    warn!(
                        business_id = %appointment.business_id,
                        error = %error,
                        "direct push failed, falling back to queue"
                    );
                }
            }
        }

        let id = queue::enqueue(
            &self.db,
            NewQueueEntry {
                recipient: push_target,
                channel: ChannelKind::Push,
                payload,
                scheduled_for: None,
                max_attempts: None,
            },
            self.max_attempts,
        )
        .await?;

        info!(
            entry_id = %id,
            business_id = %appointment.business_id,
            kind = %kind,
            "notification enqueued"
        );
        Ok(Some(id))
    }
}

/// Decide whether an event warrants a notification, and of which kind.
///
/// Creation always notifies. Updates notify only on a status change, and
/// only for transitions that mean something to the business owner.
fn classify(event: &AppointmentEvent) -> Option<(NotificationKind, &Appointment)> {
    match event {
        AppointmentEvent::Created { appointment } => {
            Some((NotificationKind::AppointmentCreated, appointment))
        }
        AppointmentEvent::Updated {
            appointment,
            previous_status,
        } => {
            if *previous_status == appointment.status {
                return None;
            }
            let kind = match appointment.status {
                AppointmentStatus::Confirmed => NotificationKind::AppointmentConfirmed,
                AppointmentStatus::Cancelled => NotificationKind::AppointmentCancelled,
                AppointmentStatus::Completed => NotificationKind::AppointmentCompleted,
                AppointmentStatus::Pending => return None,
            };
            Some((kind, appointment))
        }
    }
}

/// Message content for each notification kind, built from the client
/// name, service name, and start time.
fn message_for(kind: NotificationKind, appointment: &Appointment) -> (String, String) {
    let Appointment {
        client_name,
        service_name,
        starts_at,
        ..
    } = appointment;
    match kind {
        NotificationKind::AppointmentCreated => (
            "New appointment".to_string(),
            format!("{client_name} booked {service_name} for {starts_at}"),
        ),
        NotificationKind::AppointmentConfirmed => (
            "Appointment confirmed".to_string(),
            format!("{service_name} for {client_name} on {starts_at} is confirmed"),
        ),
        NotificationKind::AppointmentCancelled => (
            "Appointment cancelled".to_string(),
            format!("{client_name} cancelled {service_name} on {starts_at}"),
        ),
        NotificationKind::AppointmentCompleted => (
            "Appointment completed".to_string(),
            format!("{service_name} for {client_name} on {starts_at} is completed"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::types::{Contact, QueueStatus};
    use courier_test_utils::{MockResolver, MockSender};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = courier_config::model::StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();
        (db, dir)
    }

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "apt-1".to_string(),
            business_id: "biz-1".to_string(),
            client_name: "Ana".to_string(),
            service_name: "Haircut".to_string(),
            starts_at: "2026-08-10T09:00:00.000Z".to_string(),
            status,
        }
    }

    async fn resolver_with_contact() -> Arc<MockResolver> {
        let resolver = Arc::new(MockResolver::new());
        resolver
            .insert_contact(Contact {
                business_id: "biz-1".to_string(),
                push_target: Some("device-token-1".to_string()),
                email: None,
                phone: None,
            })
            .await;
        resolver
    }

    #[tokio::test]
    async fn creation_enqueues_a_push_notification() {
        let (db, _dir) = setup_db().await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        );

        let event = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        let id = enqueuer.handle_event(&event).await.unwrap().unwrap();

        let entry = queue::get_entry(&db, &id.0).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.channel, ChannelKind::Push);
        assert_eq!(entry.recipient, "device-token-1");
        match entry.payload {
            NotificationPayload::Push { title, body, data } => {
                assert_eq!(title, "New appointment");
                assert!(body.contains("Ana"));
                assert!(body.contains("Haircut"));
                assert_eq!(data.get("appointment_id").unwrap(), "apt-1");
            }
            _ => panic!("expected push payload"),
        }

        // The in-app record carries the same semantic kind.
        let records = notifications::notifications_for_recipient(&db, "biz-1", 10)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::AppointmentCreated);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unchanged_status_produces_nothing() {
        let (db, _dir) = setup_db().await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        );

        let event = AppointmentEvent::Updated {
            appointment: appointment(AppointmentStatus::Confirmed),
            previous_status: AppointmentStatus::Confirmed,
        };
        assert!(enqueuer.handle_event(&event).await.unwrap().is_none());

        let counts = queue::status_counts(&db).await.unwrap();
        assert_eq!(counts.pending, 0);
        let records = notifications::notifications_for_recipient(&db, "biz-1", 10)
            .await
            .unwrap();
        assert!(records.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_produces_exactly_one_entry() {
        let (db, _dir) = setup_db().await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        );

        let event = AppointmentEvent::Updated {
            appointment: appointment(AppointmentStatus::Cancelled),
            previous_status: AppointmentStatus::Confirmed,
        };
        let id = enqueuer.handle_event(&event).await.unwrap().unwrap();

        let counts = queue::status_counts(&db).await.unwrap();
        assert_eq!(counts.pending, 1);

        let entry = queue::get_entry(&db, &id.0).await.unwrap().unwrap();
        match entry.payload {
            NotificationPayload::Push { title, body, .. } => {
                assert_eq!(title, "Appointment cancelled");
                assert!(body.contains("cancelled"));
            }
            _ => panic!("expected push payload"),
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transition_to_pending_produces_nothing() {
        let (db, _dir) = setup_db().await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        );

        let event = AppointmentEvent::Updated {
            appointment: appointment(AppointmentStatus::Pending),
            previous_status: AppointmentStatus::Confirmed,
        };
        assert!(enqueuer.handle_event(&event).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolution_failure_drops_notification_without_error() {
        let (db, _dir) = setup_db().await;
        let resolver = Arc::new(MockResolver::new());
        resolver.set_failing(true).await;
        let enqueuer = EventEnqueuer::new(db.clone(), resolver, &DispatchConfig::default());

        let event = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        assert!(enqueuer.handle_event(&event).await.unwrap().is_none());

        let counts = queue::status_counts(&db).await.unwrap();
        assert_eq!(counts.pending, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_business_drops_notification() {
        let (db, _dir) = setup_db().await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            Arc::new(MockResolver::new()),
            &DispatchConfig::default(),
        );

        let event = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        assert!(enqueuer.handle_event(&event).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn direct_push_success_skips_the_queue() {
        let (db, _dir) = setup_db().await;
        let sender = Arc::new(MockSender::new(ChannelKind::Push));
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        )
        .with_direct_push(sender.clone());

        let event = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        assert!(enqueuer.handle_event(&event).await.unwrap().is_none());

        assert_eq!(sender.attempts_for("device-token-1").await, 1);
        let counts = queue::status_counts(&db).await.unwrap();
        assert_eq!(counts.pending, 0);

        // The in-app record is still written.
        let records = notifications::notifications_for_recipient(&db, "biz-1", 10)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn direct_push_failure_falls_back_to_queue() {
        let (db, _dir) = setup_db().await;
        let sender = Arc::new(MockSender::new(ChannelKind::Push));
        sender.fail_times("device-token-1", 1, "gateway 502").await;
        let enqueuer = EventEnqueuer::new(
            db.clone(),
            resolver_with_contact().await,
            &DispatchConfig::default(),
        )
        .with_direct_push(sender);

        let event = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        let id = enqueuer.handle_event(&event).await.unwrap();
        assert!(id.is_some());

        let counts = queue::status_counts(&db).await.unwrap();
        assert_eq!(counts.pending, 1);

        db.close().await.unwrap();
    }

    #[test]
    fn classify_maps_status_transitions() {
        let created = AppointmentEvent::Created {
            appointment: appointment(AppointmentStatus::Pending),
        };
        assert_eq!(
            classify(&created).unwrap().0,
            NotificationKind::AppointmentCreated
        );

        let completed = AppointmentEvent::Updated {
            appointment: appointment(AppointmentStatus::Completed),
            previous_status: AppointmentStatus::Confirmed,
        };
        assert_eq!(
            classify(&completed).unwrap().0,
            NotificationKind::AppointmentCompleted
        );
    }
}
