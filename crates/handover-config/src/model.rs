// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Handover relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Handover configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoverConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Shared key-value store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Slack workspace integration settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Conversational-AI platform settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Media host settings for agent attachments.
    #[serde(default)]
    pub media: MediaConfig,

    /// Auto-escalation reminder settings.
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name used in logs and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "handover".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// Which key-value backend holds shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; state does not survive a restart.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Redis connection URL (`redis://` or `rediss://`). Required for the redis backend.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Per-command response timeout in seconds.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Attempts made to establish the initial connection.
    #[serde(default = "default_connection_retries")]
    pub connection_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            redis_url: None,
            connection_timeout_secs: default_connection_timeout_secs(),
            response_timeout_secs: default_response_timeout_secs(),
            connection_retries: default_connection_retries(),
        }
    }
}

fn default_connection_timeout_secs() -> u64 {
    5
}

fn default_response_timeout_secs() -> u64 {
    3
}

fn default_connection_retries() -> u32 {
    3
}

/// Slack workspace configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-...`). `None` disables the Slack client.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Channel where one thread per customer conversation is opened.
    #[serde(default)]
    pub support_channel: String,

    /// Channel whose top-level messages start a broadcast.
    #[serde(default)]
    pub broadcast_channel: String,

    /// Reaction name that closes a ticket when added in its thread.
    #[serde(default = "default_close_reaction")]
    pub close_reaction: String,

    /// Administrative slash command name.
    #[serde(default = "default_command")]
    pub command: String,

    /// File download timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            support_channel: String::new(),
            broadcast_channel: String::new(),
            close_reaction: default_close_reaction(),
            command: default_command(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_close_reaction() -> String {
    "white_check_mark".to_string()
}

fn default_command() -> String {
    "/handover".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Conversational-AI platform configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// Base URL of the platform's live-agent API.
    #[serde(default)]
    pub base_url: String,

    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Media host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Upload endpoint; `{kind}` is replaced by `image`, `video` or `audio`.
    #[serde(default)]
    pub upload_url: String,

    /// Unsigned upload preset, sent as a form field when set.
    #[serde(default)]
    pub upload_preset: Option<String>,

    /// API key sent as a bearer token when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_media_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            upload_preset: None,
            api_key: None,
            request_timeout_secs: default_media_timeout_secs(),
        }
    }
}

fn default_media_timeout_secs() -> u64 {
    60
}

/// Auto-escalation reminder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Schedule reminders for new sessions.
    #[serde(default = "default_escalation_enabled")]
    pub enabled: bool,

    /// Delay before the first reminder, in seconds.
    #[serde(default = "default_first_reminder_secs")]
    pub first_reminder_secs: u64,

    /// Delay before the second reminder, in seconds.
    #[serde(default = "default_second_reminder_secs")]
    pub second_reminder_secs: u64,

    /// Text sent to the customer when no agent has replied yet.
    #[serde(default = "default_busy_message")]
    pub busy_message: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: default_escalation_enabled(),
            first_reminder_secs: default_first_reminder_secs(),
            second_reminder_secs: default_second_reminder_secs(),
            busy_message: default_busy_message(),
        }
    }
}

fn default_escalation_enabled() -> bool {
    true
}

fn default_first_reminder_secs() -> u64 {
    180
}

fn default_second_reminder_secs() -> u64 {
    600
}

fn default_busy_message() -> String {
    "Thanks for your patience! All of our agents are busy right now, \
     but someone will reply to you here as soon as possible."
        .to_string()
}
