// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the webhooks.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use handover_config::model::GatewayConfig;
use handover_core::{HandoverError, KvStore};
use handover_relay::Relay;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<Relay>,
    /// Store probed by `/health`.
    pub store: Arc<dyn KvStore>,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(relay: Arc<Relay>, store: Arc<dyn KvStore>) -> Self {
        Self {
            relay,
            store,
            started: Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `GatewayConfig`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Builds the webhook router:
/// - POST /ai/start, POST /ai/inbound
/// - POST /slack/events, POST /slack/interactions, POST /slack/commands
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/ai/start", post(handlers::post_start))
        .route("/ai/inbound", post(handlers::post_inbound))
        .route("/slack/events", post(handlers::post_slack_events))
        .route("/slack/interactions", post(handlers::post_slack_interactions))
        .route("/slack/commands", post(handlers::post_slack_commands))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the webhooks until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), HandoverError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HandoverError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| HandoverError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_gateway_config() {
        let config = ServerConfig::from(&GatewayConfig::default());
        let debug = format!("{config:?}");
        assert!(debug.contains(&config.port.to_string()));
        assert!(!config.host.is_empty());
    }
}
