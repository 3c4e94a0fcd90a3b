// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./handover.toml` > `~/.config/handover/handover.toml`
//! > `/etc/handover/handover.toml` with environment variable overrides via the
//! `HANDOVER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HandoverConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG: &str = "/etc/handover/handover.toml";

/// Configuration file in the working directory.
pub const LOCAL_CONFIG: &str = "handover.toml";

/// Config sections, in the order they are matched against env var names.
const SECTIONS: &[&str] = &[
    "service",
    "gateway",
    "storage",
    "slack",
    "ai",
    "media",
    "escalation",
];

/// Path of the per-user XDG configuration file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("handover/handover.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/handover/handover.toml` (system-wide)
/// 3. `~/.config/handover/handover.toml` (user XDG config)
/// 4. `./handover.toml` (local directory)
/// 5. `HANDOVER_*` environment variables
pub fn load_config() -> Result<HandoverConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HandoverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HandoverConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HandoverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HandoverConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the standard hierarchy (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HandoverConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `HANDOVER_SLACK_BOT_TOKEN` must map to `slack.bot_token`,
/// not `slack.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("HANDOVER_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name onto a dotted config path.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("slack_bot_token"), "slack.bot_token");
        assert_eq!(map_env_key("storage_redis_url"), "storage.redis_url");
        assert_eq!(
            map_env_key("escalation_first_reminder_secs"),
            "escalation.first_reminder_secs"
        );
        assert_eq!(map_env_key("ai_api_key"), "ai.api_key");
        assert_eq!(map_env_key("GATEWAY_PORT"), "gateway.port");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("verbose"), "verbose");
    }
}
