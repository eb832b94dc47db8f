// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel sender registry construction from configuration.
//!
//! A channel is enabled by configuring its section; senders whose crate
//! was compiled out via feature flags are skipped with a warning.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::traits::ChannelSender;
use courier_core::CourierError;
use tracing::debug;

/// Build one sender per configured channel.
///
/// A channel section left at its defaults (no credentials) is simply
/// disabled; a half-configured section was already rejected by config
/// validation.
pub fn build_senders(config: &CourierConfig) -> Result<Vec<Arc<dyn ChannelSender>>, CourierError> {
    let mut senders: Vec<Arc<dyn ChannelSender>> = Vec::new();

    if config.email.smtp_host.is_some() {
        #[cfg(feature = "email")]
        {
            senders.push(Arc::new(courier_email::EmailSender::new(&config.email)?));
            debug!("email sender enabled");
        }
        #[cfg(not(feature = "email"))]
        tracing::warn!("email configured but the email feature is compiled out");
    }

    if config.whatsapp.access_token.is_some() {
        #[cfg(feature = "whatsapp")]
        {
            senders.push(Arc::new(courier_whatsapp::WhatsappSender::new(
                &config.whatsapp,
            )?));
            debug!("whatsapp sender enabled");
        }
        #[cfg(not(feature = "whatsapp"))]
        tracing::warn!("whatsapp configured but the whatsapp feature is compiled out");
    }

    if config.sms.api_url.is_some() {
        #[cfg(feature = "sms")]
        {
            senders.push(Arc::new(courier_sms::SmsSender::new(&config.sms)?));
            debug!("sms sender enabled");
        }
        #[cfg(not(feature = "sms"))]
        tracing::warn!("sms configured but the sms feature is compiled out");
    }

    if config.push.api_url.is_some() {
        #[cfg(feature = "push")]
        {
            senders.push(Arc::new(courier_push::PushSender::new(&config.push)?));
            debug!("push sender enabled");
        }
        #[cfg(not(feature = "push"))]
        tracing::warn!("push configured but the push feature is compiled out");
    }

    Ok(senders)
}

/// The push sender alone, for the enqueuer's direct-send path.
#[cfg(feature = "push")]
pub fn build_push_sender(
    config: &CourierConfig,
) -> Result<Option<Arc<dyn ChannelSender>>, CourierError> {
    if config.push.api_url.is_some() {
        Ok(Some(Arc::new(courier_push::PushSender::new(&config.push)?)))
    } else {
        Ok(None)
    }
}

#[cfg(not(feature = "push"))]
pub fn build_push_sender(
    _config: &CourierConfig,
) -> Result<Option<Arc<dyn ChannelSender>>, CourierError> {
    Ok(None)
}
