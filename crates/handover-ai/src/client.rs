// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the AI platform's live-agent API.
//!
//! Routes, relative to `ai.base_url`:
//! - `POST sessions/{session_id}/messages` with a message payload
//! - `POST sessions/{session_id}/disconnect`
//! - `POST contacts/{phone}/messages` with a text payload
//! - `GET health`

use std::time::Duration;

use async_trait::async_trait;
use handover_config::model::AiConfig;
use handover_core::types::MessagePayload;
use handover_core::{
    Adapter, AdapterType, AiPlatform, CollaboratorKind, HandoverError, HealthStatus,
};
use reqwest::Url;
use tracing::{debug, error};

fn ai_error(message: impl Into<String>) -> HandoverError {
    HandoverError::collaborator(CollaboratorKind::Ai, message)
}

/// Live-agent API client; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, HandoverError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| HandoverError::Config(format!("invalid ai.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(HandoverError::Config(format!(
                "ai.base_url `{base_url}` cannot be used as a base"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| HandoverError::Config(format!("failed to build ai client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post(
        &self,
        operation: &'static str,
        url: Url,
        body: Option<&MessagePayload>,
    ) -> Result<(), HandoverError> {
        let mut request = self.http.post(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| HandoverError::Collaborator {
            kind: CollaboratorKind::Ai,
            message: format!("{operation} request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, %status, "ai platform accepted request");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        error!(operation, %status, "ai platform rejected request");
        Err(ai_error(format!("{operation} returned {status}: {body}")))
    }
}

#[async_trait]
impl Adapter for AiClient {
    fn name(&self) -> &str {
        "ai-platform"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ai
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        let mut request = self.http.get(self.endpoint(&["health"]));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        Ok(match request.send().await {
            Ok(r) if r.status().is_success() => HealthStatus::Healthy,
            Ok(r) => HealthStatus::Degraded(format!("health returned {}", r.status())),
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl AiPlatform for AiClient {
    async fn send_outbound(
        &self,
        session_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), HandoverError> {
        let url = self.endpoint(&["sessions", session_id, "messages"]);
        self.post("send_outbound", url, Some(payload)).await
    }

    async fn disconnect(&self, session_id: &str) -> Result<(), HandoverError> {
        let url = self.endpoint(&["sessions", session_id, "disconnect"]);
        self.post("disconnect", url, None).await
    }

    async fn notify_contact(&self, phone: &str, text: &str) -> Result<(), HandoverError> {
        let url = self.endpoint(&["contacts", phone, "messages"]);
        self.post("notify_contact", url, Some(&MessagePayload::text(text)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AiClient {
        AiClient::new(&AiConfig {
            base_url: format!("{}/live-agent/", server.uri()),
            api_key: Some("ai-key".into()),
            ..AiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = AiClient::new(&AiConfig::default()).unwrap_err();
        assert!(matches!(err, HandoverError::Config(_)));
    }

    #[tokio::test]
    async fn send_outbound_posts_typed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/live-agent/sessions/abc-123/messages"))
            .and(header("authorization", "Bearer ai-key"))
            .and(body_json(json!({"type": "text", "text": "On it"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .send_outbound("abc-123", &MessagePayload::text("On it"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn session_ids_are_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/live-agent/sessions/a%2Fb/disconnect"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).disconnect("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn notify_contact_sends_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/live-agent/contacts/15551234567/messages"))
            .and(body_json(json!({"type": "text", "text": "Class moved to 6pm"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .notify_contact("15551234567", "Class moved to 6pm")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejection_becomes_ai_collaborator_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such session"))
            .mount(&server)
            .await;

        let err = client(&server).disconnect("gone").await.unwrap_err();
        match err {
            HandoverError::Collaborator { kind, message, .. } => {
                assert_eq!(kind, CollaboratorKind::Ai);
                assert!(message.contains("404"), "{message}");
                assert!(message.contains("no such session"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-agent/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let status = client(&server).health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Degraded(_)));
    }
}
