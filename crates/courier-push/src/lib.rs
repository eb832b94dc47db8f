// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push channel sender for the Courier notification pipeline.
//!
//! Implements [`ChannelSender`] against an FCM-style HTTP push gateway:
//! `POST {api_url}` with the subscription target and a
//! `notification`/`data` JSON body. A gone subscription (404/410) is a
//! permanent failure -- the device will never come back under that token.

use async_trait::async_trait;
use courier_config::model::PushConfig;
use courier_core::error::{ChannelError, CourierError};
use courier_core::traits::ChannelSender;
use courier_core::types::{ChannelKind, NotificationPayload};
use serde_json::json;
use tracing::debug;

/// HTTP push gateway sender implementing [`ChannelSender`].
pub struct PushSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl PushSender {
    /// Creates a new push sender. Requires `config.api_url` and
    /// `config.api_key` to be set.
    pub fn new(config: &PushConfig) -> Result<Self, CourierError> {
        let api_url = config.api_url.clone().ok_or_else(|| {
            CourierError::Config("push.api_url is required for the push sender".into())
        })?;
        let api_key = config.api_key.clone().ok_or_else(|| {
            CourierError::Config("push.api_key is required for the push sender".into())
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl ChannelSender for PushSender {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), ChannelError> {
        let NotificationPayload::Push { title, body, data } = payload else {
            return Err(ChannelError::permanent(
                "push sender requires a push payload",
            ));
        };

        let request_body = json!({
            "to": recipient,
            "notification": { "title": title, "body": body },
            "data": data,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ChannelError::transient(format!("push request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(recipient, title = %title, "push accepted by gateway");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        match status.as_u16() {
            // Dead subscription: the target is gone for good.
            404 | 410 => Err(ChannelError::permanent(format!(
                "push subscription gone ({status}): {detail}"
            ))),
            code => Err(ChannelError::from_http_status(code, detail)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: &str) -> PushConfig {
        PushConfig {
            api_url: Some(api_url.into()),
            api_key: Some("push-key".into()),
        }
    }

    fn push_payload() -> NotificationPayload {
        let mut data = BTreeMap::new();
        data.insert("appointment_id".to_string(), "apt-1".to_string());
        NotificationPayload::Push {
            title: "New appointment".to_string(),
            body: "Ana booked a haircut".to_string(),
            data,
        }
    }

    #[test]
    fn new_requires_url_and_key() {
        assert!(PushSender::new(&PushConfig::default()).is_err());
        assert!(PushSender::new(&PushConfig {
            api_url: Some("https://push.example.com".into()),
            api_key: None,
        })
        .is_err());
    }

    #[tokio::test]
    async fn send_posts_notification_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer push-key"))
            .and(body_partial_json(serde_json::json!({
                "to": "device-token-1",
                "notification": { "title": "New appointment" },
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sender = PushSender::new(&config(&server.uri())).unwrap();
        sender.send("device-token-1", &push_payload()).await.unwrap();
    }

    #[tokio::test]
    async fn gone_subscription_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
            .mount(&server)
            .await;

        let sender = PushSender::new(&config(&server.uri())).unwrap();
        let err = sender
            .send("dead-token", &push_payload())
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.message().contains("gone"));
    }

    #[tokio::test]
    async fn gateway_5xx_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let sender = PushSender::new(&config(&server.uri())).unwrap();
        let err = sender
            .send("device-token-1", &push_payload())
            .await
            .unwrap_err();
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn template_payload_is_rejected_as_permanent() {
        let server = MockServer::start().await;
        let sender = PushSender::new(&config(&server.uri())).unwrap();
        let payload = NotificationPayload::Template {
            name: "appointment_created".into(),
            params: BTreeMap::new(),
        };
        let err = sender.send("device-token-1", &payload).await.unwrap_err();
        assert!(err.is_permanent());
    }
}
