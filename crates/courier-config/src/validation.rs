// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, ordered thresholds, and coherent
//! channel credential sets.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.dispatch.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.batch_size must be at least 1".to_string(),
        });
    }

    if config.dispatch.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.max_attempts must be at least 1".to_string(),
        });
    }

    if config.dispatch.send_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.send_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.dispatch.retry_base_delay_secs > config.dispatch.retry_max_delay_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.retry_base_delay_secs ({}) must not exceed dispatch.retry_max_delay_secs ({})",
                config.dispatch.retry_base_delay_secs, config.dispatch.retry_max_delay_secs
            ),
        });
    }

    if config.dispatch.processing_ttl_secs <= config.dispatch.send_timeout_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.processing_ttl_secs ({}) must exceed dispatch.send_timeout_secs ({}), otherwise in-flight sends get reclaimed",
                config.dispatch.processing_ttl_secs, config.dispatch.send_timeout_secs
            ),
        });
    }

    if config.health.queue_warning_threshold >= config.health.queue_critical_threshold {
        errors.push(ConfigError::Validation {
            message: format!(
                "health.queue_warning_threshold ({}) must be below health.queue_critical_threshold ({})",
                config.health.queue_warning_threshold, config.health.queue_critical_threshold
            ),
        });
    }

    if config.health.service_name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "health.service_name must not be empty".to_string(),
        });
    }

    // A half-configured channel fails at startup rather than at send time.
    if config.email.smtp_host.is_some() && config.email.from_address.is_none() {
        errors.push(ConfigError::Validation {
            message: "email.from_address is required when email.smtp_host is set".to_string(),
        });
    }

    if config.email.smtp_username.is_some() != config.email.smtp_password.is_some() {
        errors.push(ConfigError::Validation {
            message: "email.smtp_username and email.smtp_password must be set together"
                .to_string(),
        });
    }

    if config.whatsapp.access_token.is_some() && config.whatsapp.phone_number_id.is_none() {
        errors.push(ConfigError::Validation {
            message: "whatsapp.phone_number_id is required when whatsapp.access_token is set"
                .to_string(),
        });
    }

    if config.push.api_url.is_some() && config.push.api_key.is_none() {
        errors.push(ConfigError::Validation {
            message: "push.api_key is required when push.api_url is set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CourierConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CourierConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut config = CourierConfig::default();
        config.dispatch.batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size"))));
    }

    #[test]
    fn inverted_backoff_bounds_fail_validation() {
        let mut config = CourierConfig::default();
        config.dispatch.retry_base_delay_secs = 7200;
        config.dispatch.retry_max_delay_secs = 3600;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("retry_base_delay_secs"))));
    }

    #[test]
    fn inverted_health_thresholds_fail_validation() {
        let mut config = CourierConfig::default();
        config.health.queue_warning_threshold = 500;
        config.health.queue_critical_threshold = 100;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("queue_warning_threshold"))));
    }

    #[test]
    fn email_host_without_from_address_fails() {
        let mut config = CourierConfig::default();
        config.email.smtp_host = Some("smtp.example.com".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("from_address"))));
    }

    #[test]
    fn whatsapp_token_without_phone_number_fails() {
        let mut config = CourierConfig::default();
        config.whatsapp.access_token = Some("token".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("phone_number_id"))));
    }

    #[test]
    fn sections_deny_unknown_fields() {
        let toml_str = r#"
[dispatch]
batch_size = 10
burst_size = 50
"#;
        let result = toml::from_str::<CourierConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn fully_configured_channels_pass() {
        let mut config = CourierConfig::default();
        config.email.smtp_host = Some("smtp.example.com".to_string());
        config.email.from_address = Some("noreply@example.com".to_string());
        config.whatsapp.access_token = Some("token".to_string());
        config.whatsapp.phone_number_id = Some("123456".to_string());
        config.push.api_url = Some("https://push.example.com/v1/send".to_string());
        config.push.api_key = Some("key".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
