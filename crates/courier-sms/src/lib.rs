// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS channel sender for the Courier notification pipeline.
//!
//! Implements [`ChannelSender`] against a generic HTTP SMS gateway: one
//! `POST` with a JSON body of `{from, to, text}` and a bearer token. The
//! message text is rendered from the payload's `message` parameter, falling
//! back to joined parameters for templates without one.

use async_trait::async_trait;
use courier_config::model::SmsConfig;
use courier_core::error::{ChannelError, CourierError};
use courier_core::traits::ChannelSender;
use courier_core::types::{ChannelKind, NotificationPayload};
use serde_json::json;
use tracing::debug;

/// HTTP SMS gateway sender implementing [`ChannelSender`].
pub struct SmsSender {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    sender_id: String,
}

impl SmsSender {
    /// Creates a new SMS sender. Requires `config.api_url` to be set.
    pub fn new(config: &SmsConfig) -> Result<Self, CourierError> {
        let api_url = config.api_url.clone().ok_or_else(|| {
            CourierError::Config("sms.api_url is required for the SMS sender".into())
        })?;
        if api_url.is_empty() {
            return Err(CourierError::Config("sms.api_url cannot be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_url,
            api_token: config.api_token.clone(),
            sender_id: config
                .sender_id
                .clone()
                .unwrap_or_else(|| "courier".to_string()),
        })
    }

    /// Flatten a payload into the single text body SMS can carry.
    fn render_text(payload: &NotificationPayload) -> String {
        match payload {
            NotificationPayload::Template { name, params } => params
                .get("message")
                .cloned()
                .unwrap_or_else(|| {
                    let joined: Vec<String> =
                        params.values().cloned().collect();
                    if joined.is_empty() {
                        name.clone()
                    } else {
                        joined.join(" ")
                    }
                }),
            NotificationPayload::Push { title, body, .. } => format!("{title}: {body}"),
        }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError> {
        let text = Self::render_text(payload);
        let body = json!({
            "from": self.sender_id,
            "to": recipient,
            "text": text,
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::transient(format!("sms request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(recipient, "sms accepted by gateway");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(ChannelError::from_http_status(status.as_u16(), detail))
    }
}
