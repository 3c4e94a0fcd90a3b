// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `handover serve`: wires the store, collaborators, relay and gateway, then
//! runs until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use handover_ai::AiClient;
use handover_config::HandoverConfig;
use handover_core::{Adapter, HandoverError, HealthStatus, MediaHost};
use handover_gateway::{GatewayState, ServerConfig, start_server};
use handover_media::HttpMediaHost;
use handover_relay::{Relay, RelaySettings};
use handover_slack::SlackClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn run_serve(config: HandoverConfig) -> Result<(), HandoverError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, version = env!("CARGO_PKG_VERSION"), "starting");

    let store = handover_storage::open_store(&config.storage).await?;

    let chat = Arc::new(SlackClient::new(&config.slack)?);
    let ai = Arc::new(AiClient::new(&config.ai)?);
    let media: Option<Arc<dyn MediaHost>> = if config.media.upload_url.is_empty() {
        warn!("media.upload_url is not set, agent attachments will not be forwarded");
        None
    } else {
        Some(Arc::new(HttpMediaHost::new(&config.media)?))
    };

    report_health(chat.as_ref()).await;
    report_health(ai.as_ref()).await;

    let relay = Arc::new(Relay::new(
        RelaySettings::from(&config),
        Arc::clone(&store),
        chat,
        ai,
        media,
    ));

    let shutdown = install_signal_handler();
    let server_config = ServerConfig::from(&config.gateway);
    let state = GatewayState::new(Arc::clone(&relay), store);
    let grace = Duration::from_secs(config.gateway.shutdown_grace_secs);

    let server = start_server(&server_config, state, shutdown.clone());
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_secs = grace.as_secs(), "in-flight requests did not finish in time");
            Ok(())
        }
    };

    relay.shutdown();
    info!("stopped");
    result
}

/// Startup probe; a failing collaborator is logged, not fatal.
async fn report_health(adapter: &dyn Adapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "collaborator reachable"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), %reason, "collaborator unhealthy")
        }
        Err(e) => error!(adapter = adapter.name(), error = %e, "collaborator health check failed"),
    }
}

/// Returns a token cancelled on SIGINT (Ctrl+C) or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "could not install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        trigger.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("handover={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
