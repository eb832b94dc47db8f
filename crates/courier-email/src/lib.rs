// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email channel sender for the Courier notification pipeline.
//!
//! Implements [`ChannelSender`] over SMTP via lettre's async transport.
//! Address parse failures are permanent; whether an SMTP failure is
//! permanent follows the server's own response code classification.

use async_trait::async_trait;
use courier_config::model::EmailConfig;
use courier_core::error::{ChannelError, CourierError};
use courier_core::traits::ChannelSender;
use courier_core::types::{ChannelKind, NotificationPayload};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// SMTP email sender implementing [`ChannelSender`].
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Creates a new email sender.
    ///
    /// Requires `config.smtp_host` and `config.from_address` to be set;
    /// credentials are optional for unauthenticated relays.
    pub fn new(config: &EmailConfig) -> Result<Self, CourierError> {
        let host = config.smtp_host.as_deref().ok_or_else(|| {
            CourierError::Config("email.smtp_host is required for the email sender".into())
        })?;
        let from_address = config.from_address.as_deref().ok_or_else(|| {
            CourierError::Config("email.from_address is required for the email sender".into())
        })?;

        let from: Mailbox = from_address.parse().map_err(|e| {
            CourierError::Config(format!("email.from_address is not a valid mailbox: {e}"))
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| CourierError::Config(format!("invalid SMTP relay `{host}`: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) =
            (config.smtp_username.as_ref(), config.smtp_password.as_ref())
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Derive subject and body text from the payload.
    fn render(payload: &NotificationPayload) -> (String, String) {
        match payload {
            NotificationPayload::Template { name, params } => {
                let subject = params
                    .get("subject")
                    .cloned()
                    .unwrap_or_else(|| name.replace('_', " "));
                let body = params.get("message").cloned().unwrap_or_else(|| {
                    params
                        .iter()
                        .filter(|(key, _)| *key != "subject")
                        .map(|(key, value)| format!("{key}: {value}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                });
                (subject, body)
            }
            NotificationPayload::Push { title, body, .. } => (title.clone(), body.clone()),
        }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError> {
        let to: Mailbox = recipient.parse().map_err(|e| {
            ChannelError::permanent(format!("invalid recipient address `{recipient}`: {e}"))
        })?;

        let (subject, body) = Self::render(payload);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject.as_str())
            .body(body)
            .map_err(|e| ChannelError::permanent(format!("failed to build message: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => {
                debug!(recipient, subject = %subject, "email accepted by relay");
                Ok(())
            }
            Err(e) if e.is_permanent() => {
                Err(ChannelError::permanent(format!("smtp rejected message: {e}")))
            }
            Err(e) => Err(ChannelError::transient(format!("smtp send failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: 587,
            smtp_username: Some("mailer".into()),
            smtp_password: Some("hunter2".into()),
            from_address: Some("Courier <noreply@example.com>".into()),
        }
    }

    #[test]
    fn new_requires_smtp_host() {
        let mut config = config();
        config.smtp_host = None;
        assert!(EmailSender::new(&config).is_err());
    }

    #[test]
    fn new_requires_from_address() {
        let mut config = config();
        config.from_address = None;
        assert!(EmailSender::new(&config).is_err());
    }

    #[test]
    fn new_rejects_invalid_from_address() {
        let mut config = config();
        config.from_address = Some("not an address".into());
        assert!(EmailSender::new(&config).is_err());
    }

    #[test]
    fn new_accepts_valid_config() {
        assert!(EmailSender::new(&config()).is_ok());
    }

    #[tokio::test]
    async fn invalid_recipient_is_permanent() {
        let sender = EmailSender::new(&config()).unwrap();
        let payload = NotificationPayload::Push {
            title: "Hello".into(),
            body: "World".into(),
            data: BTreeMap::new(),
        };
        let err = sender.send("definitely not an email", &payload).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn render_uses_subject_and_message_params() {
        let mut params = BTreeMap::new();
        params.insert("subject".to_string(), "Appointment confirmed".to_string());
        params.insert(
            "message".to_string(),
            "Ana's haircut is confirmed for 2026-08-10T09:00".to_string(),
        );
        let payload = NotificationPayload::Template {
            name: "appointment_confirmed".to_string(),
            params,
        };
        let (subject, body) = EmailSender::render(&payload);
        assert_eq!(subject, "Appointment confirmed");
        assert!(body.contains("haircut"));
    }

    #[test]
    fn render_falls_back_to_template_name() {
        let payload = NotificationPayload::Template {
            name: "appointment_created".to_string(),
            params: BTreeMap::new(),
        };
        let (subject, body) = EmailSender::render(&payload);
        assert_eq!(subject, "appointment created");
        assert!(body.is_empty());
    }
}
