// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handover - a WhatsApp to Slack live-agent relay.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use handover_config::{ConfigError, HandoverConfig};

/// Handover - a WhatsApp to Slack live-agent relay.
#[derive(Parser, Debug)]
#[command(name = "handover", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and relay.
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

fn load(path: Option<&std::path::Path>) -> Result<HandoverConfig, Vec<ConfigError>> {
    match path {
        Some(path) => handover_config::load_and_validate_path(path),
        None => handover_config::load_and_validate(),
    }
}

/// One line per section, secrets redacted.
fn summary(config: &HandoverConfig) -> String {
    let set = |value: &Option<String>| if value.is_some() { "set" } else { "unset" };
    let media = if config.media.upload_url.is_empty() {
        "disabled".to_string()
    } else {
        config.media.upload_url.clone()
    };
    [
        format!("service: {} (log level {})", config.service.name, config.service.log_level),
        format!("gateway: {}:{}", config.gateway.host, config.gateway.port),
        format!("storage: {:?}", config.storage.backend),
        format!(
            "slack: token {}, support {}, broadcast {}, command {}",
            set(&config.slack.bot_token),
            config.slack.support_channel,
            config.slack.broadcast_channel,
            config.slack.command
        ),
        format!("ai: {} (api key {})", config.ai.base_url, set(&config.ai.api_key)),
        format!("media: {media}"),
        format!(
            "escalation: {} ({}s, {}s)",
            if config.escalation.enabled { "on" } else { "off" },
            config.escalation.first_reminder_secs,
            config.escalation.second_reminder_secs
        ),
    ]
    .join("\n")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            handover_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("handover: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!("{}", summary(&config));
            println!("configuration is valid");
        }
        None => {
            println!("handover: use --help for available commands");
        }
    }
}
