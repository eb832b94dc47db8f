// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp channel sender for the Courier notification pipeline.
//!
//! Implements [`ChannelSender`] for the WhatsApp Business Cloud API,
//! delivering pre-approved template messages via
//! `POST {api_base}/{phone_number_id}/messages`.

use async_trait::async_trait;
use courier_config::model::WhatsappConfig;
use courier_core::error::{ChannelError, CourierError};
use courier_core::traits::ChannelSender;
use courier_core::types::{ChannelKind, NotificationPayload};
use serde_json::json;
use tracing::debug;

/// WhatsApp Business Cloud API sender implementing [`ChannelSender`].
pub struct WhatsappSender {
    client: reqwest::Client,
    api_base: String,
    phone_number_id: String,
    access_token: String,
}

impl WhatsappSender {
    /// Creates a new WhatsApp sender.
    ///
    /// Requires `config.access_token` and `config.phone_number_id` to be set.
    pub fn new(config: &WhatsappConfig) -> Result<Self, CourierError> {
        let access_token = config.access_token.clone().ok_or_else(|| {
            CourierError::Config("whatsapp.access_token is required for the WhatsApp sender".into())
        })?;
        let phone_number_id = config.phone_number_id.clone().ok_or_else(|| {
            CourierError::Config(
                "whatsapp.phone_number_id is required for the WhatsApp sender".into(),
            )
        })?;
        if access_token.is_empty() {
            return Err(CourierError::Config(
                "whatsapp.access_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            phone_number_id,
            access_token,
        })
    }

    /// Build the Cloud API request body for a template payload.
    fn template_body(recipient: &str, name: &str, params: &std::collections::BTreeMap<String, String>) -> serde_json::Value {
        let parameters: Vec<serde_json::Value> = params
            .values()
            .map(|text| json!({ "type": "text", "text": text }))
            .collect();
        json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "template",
            "template": {
                "name": name,
                "language": { "code": "en" },
                "components": [{ "type": "body", "parameters": parameters }],
            },
        })
    }
}

#[async_trait]
impl ChannelSender for WhatsappSender {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError> {
        let NotificationPayload::Template { name, params } = payload else {
            // The Cloud API only accepts pre-approved templates here.
            return Err(ChannelError::permanent(
                "whatsapp sender requires a template payload",
            ));
        };

        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let body = Self::template_body(recipient, name, params);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::transient(format!("whatsapp request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(recipient, template = %name, "whatsapp message accepted");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(ChannelError::from_http_status(status.as_u16(), detail))
    }
}
