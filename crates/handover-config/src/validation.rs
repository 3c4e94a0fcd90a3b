// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a Redis URL being present for the redis backend or reminder
//! delays being ordered.

use crate::diagnostic::ConfigError;
use crate::model::{HandoverConfig, StorageBackend};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HandoverConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.backend == StorageBackend::Redis {
        match config.storage.redis_url.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigError::Validation {
                message: "storage.redis_url is required when storage.backend = \"redis\""
                    .to_string(),
            }),
            Some(url) if !(url.starts_with("redis://") || url.starts_with("rediss://")) => {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "storage.redis_url `{url}` must start with redis:// or rediss://"
                    ),
                });
            }
            Some(_) => {}
        }
    }

    if config.slack.bot_token.is_some() {
        if config.slack.support_channel.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "slack.support_channel must be set when slack.bot_token is set"
                    .to_string(),
            });
        }
        if config.slack.broadcast_channel.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "slack.broadcast_channel must be set when slack.bot_token is set"
                    .to_string(),
            });
        }
    }

    if !config.slack.command.starts_with('/') {
        errors.push(ConfigError::Validation {
            message: format!(
                "slack.command `{}` must start with `/`",
                config.slack.command
            ),
        });
    }

    let escalation = &config.escalation;
    if escalation.first_reminder_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "escalation.first_reminder_secs must be greater than 0".to_string(),
        });
    }
    if escalation.second_reminder_secs <= escalation.first_reminder_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "escalation.second_reminder_secs ({}) must be greater than first_reminder_secs ({})",
                escalation.second_reminder_secs, escalation.first_reminder_secs
            ),
        });
    }
    if escalation.busy_message.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "escalation.busy_message must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
