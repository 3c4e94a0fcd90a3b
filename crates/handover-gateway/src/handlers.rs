// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhooks.
//!
//! AI platform calls are answered with a [`RelayAck`] once the relay has
//! acted, always with HTTP 200; failures are reported in the ack. Slack events and interactions are acknowledged immediately and
//! processed on a spawned task, since Slack retries anything slower than
//! three seconds.

use axum::{
    Form, Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use handover_ai::CustomerMessage;
use handover_core::HandoverError;
use handover_core::types::{ChatEvent, EscalationRequest, HealthStatus};
use handover_relay::RelayAck;
use handover_slack::{EventsRequest, parse_events_body, parse_interaction_payload, parse_slash_command};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Header Slack sets on redelivered events.
pub const RETRY_HEADER: &str = "x-slack-retry-num";

/// Form body of an interactivity request.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The AI platform only inspects the ack body, so rejected calls still answer 200.
fn rejected_ack(message: String) -> Response {
    warn!(%message, "rejected ai webhook body");
    Json(RelayAck::error(message)).into_response()
}

fn bad_request(message: String) -> Response {
    warn!(%message, "rejected webhook body");
    (StatusCode::BAD_REQUEST, Json(RelayAck::error(message))).into_response()
}

fn spawn_event(state: &GatewayState, event: ChatEvent) {
    let relay = state.relay.clone();
    tokio::spawn(async move { relay.handle_event(event).await });
}

/// POST /ai/start
pub async fn post_start(
    State(state): State<GatewayState>,
    body: Result<Json<EscalationRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(request)) => Json(state.relay.start(request).await).into_response(),
        Err(rejection) => rejected_ack(rejection.body_text()),
    }
}

/// POST /ai/inbound
pub async fn post_inbound(
    State(state): State<GatewayState>,
    body: Result<Json<CustomerMessage>, JsonRejection>,
) -> Response {
    let msg = match body {
        Ok(Json(msg)) => msg,
        Err(rejection) => return rejected_ack(rejection.body_text()),
    };
    let ack = match msg.payload() {
        Ok(payload) => state.relay.customer_message(&msg.session_id, payload).await,
        Err(HandoverError::UnsupportedMediaKind(kind)) => {
            state
                .relay
                .unsupported_customer_message(&msg.session_id, &kind)
                .await
        }
        Err(e) => {
            warn!(session_id = %msg.session_id, error = %e, "undecodable customer message");
            RelayAck::error(e.to_string())
        }
    };
    Json(ack).into_response()
}

/// POST /slack/events
pub async fn post_slack_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(retry) = headers.get(RETRY_HEADER) {
        debug!(retry = ?retry, "ignoring redelivered event");
        return StatusCode::OK.into_response();
    }

    match parse_events_body(&body) {
        Ok(EventsRequest::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(EventsRequest::Event(event)) => {
            spawn_event(&state, event);
            StatusCode::OK.into_response()
        }
        Ok(EventsRequest::Ignored(kind)) => {
            debug!(%kind, "ignoring event");
            StatusCode::OK.into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

/// POST /slack/interactions
pub async fn post_slack_interactions(
    State(state): State<GatewayState>,
    Form(form): Form<InteractionForm>,
) -> Response {
    match parse_interaction_payload(&form.payload) {
        Ok(Some(event)) => {
            spawn_event(&state, event);
            StatusCode::OK.into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

/// POST /slack/commands
///
/// The reply is returned in the response and shown only to the caller.
pub async fn post_slack_commands(
    State(state): State<GatewayState>,
    body: String,
) -> Response {
    match parse_slash_command(&body) {
        Ok(command) => {
            let text = state.relay.handle_command(command).await;
            Json(json!({ "response_type": "ephemeral", "text": text })).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

/// GET /health
///
/// Reports the shared store's health; 503 when it is unreachable.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (code, status, detail) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, "degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(reason))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string())),
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        detail,
    };
    (code, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use handover_core::types::MessagePayload;
    use handover_test_utils::TestHarness;
    use handover_test_utils::harness::SUPPORT_CHANNEL;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::server::router;

    fn app(h: &TestHarness) -> axum::Router {
        router(GatewayState::new(h.relay.clone(), h.store.clone()))
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_request(uri: &str, body: String) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Lets spawned event tasks run.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn start_and_inbound_round_trip() {
        let h = TestHarness::builder().without_escalation().build();
        let response = app(&h)
            .oneshot(json_request(
                "/ai/start",
                json!({"session_id": "abc-123", "phone": "+1 555 0100", "name": "Ana"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack = body_json(response).await;
        assert_eq!(ack["status"], "ok");
        let thread = ack["thread_id"].as_str().unwrap().to_string();

        let response = app(&h)
            .oneshot(json_request(
                "/ai/inbound",
                json!({"session_id": "abc-123", "type": "text", "text": "Hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "ok");
        assert_eq!(h.chat.replies_in(&thread).await, vec!["*Ana:* Hi".to_string()]);
    }

    #[tokio::test]
    async fn unknown_session_is_a_soft_warning() {
        let h = TestHarness::new();
        let response = app(&h)
            .oneshot(json_request(
                "/ai/inbound",
                json!({"session_id": "zzz", "type": "text", "text": "Hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "warning");
        assert!(h.chat.posts().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_start_is_an_error_ack() {
        let h = TestHarness::new();
        let response = app(&h)
            .oneshot(json_request("/ai/start", json!({"phone": "1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "error");
        assert!(h.chat.posts().await.is_empty());
    }

    #[tokio::test]
    async fn unsupported_message_type_posts_a_notice() {
        let h = TestHarness::builder().without_escalation().build();
        h.start("s1", "1", Some("Ana"), None).await;
        let thread = h.thread_of("s1").await.unwrap();

        let response = app(&h)
            .oneshot(json_request(
                "/ai/inbound",
                json!({"session_id": "s1", "type": "document", "url": "https://x/a.pdf"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack = body_json(response).await;
        assert_eq!(ack["status"], "warning");
        assert_eq!(ack["thread_id"], thread.as_str());

        let replies = h.chat.replies_in(&thread).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("`document`"), "{replies:?}");
    }

    #[tokio::test]
    async fn renderable_message_missing_fields_is_an_error_ack() {
        let h = TestHarness::builder().without_escalation().build();
        h.start("s1", "1", None, None).await;
        let thread = h.thread_of("s1").await.unwrap();

        let response = app(&h)
            .oneshot(json_request("/ai/inbound", json!({"session_id": "s1", "type": "image"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "error");
        assert!(h.chat.replies_in(&thread).await.is_empty());
    }

    #[tokio::test]
    async fn url_verification_echoes_the_challenge() {
        let h = TestHarness::new();
        let response = app(&h)
            .oneshot(json_request(
                "/slack/events",
                json!({"type": "url_verification", "challenge": "c-42"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({"challenge": "c-42"}));
    }

    #[tokio::test]
    async fn thread_replies_are_forwarded_and_retries_ignored() {
        let h = TestHarness::builder().without_escalation().build();
        h.start("s1", "1", None, None).await;
        let thread = h.thread_of("s1").await.unwrap();
        let event = json!({
            "token": "t",
            "team_id": "T1",
            "api_app_id": "A1",
            "type": "event_callback",
            "event_id": "Ev1",
            "event_time": 1700000999,
            "event": {
                "type": "message",
                "channel": SUPPORT_CHANNEL,
                "user": "U_AGENT",
                "text": "On it",
                "ts": "1700000999.000001",
                "thread_ts": thread,
            }
        });

        let retry = Request::post("/slack/events")
            .header("content-type", "application/json")
            .header(RETRY_HEADER, "1")
            .body(Body::from(event.to_string()))
            .unwrap();
        let response = app(&h).oneshot(retry).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        settle().await;
        assert!(h.ai.outbound().await.is_empty());

        let response = app(&h)
            .oneshot(json_request("/slack/events", event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        settle().await;
        assert_eq!(h.ai.outbound_for("s1").await, vec![MessagePayload::text("On it")]);
    }

    #[tokio::test]
    async fn close_button_interaction_closes_the_session() {
        let h = TestHarness::builder().without_escalation().build();
        h.start("s1", "1", None, None).await;
        let payload = json!({
            "type": "block_actions",
            "team": {"id": "T1"},
            "user": {"id": "U_AGENT"},
            "api_app_id": "A1",
            "container": {"type": "message", "message_ts": "1.0", "channel_id": SUPPORT_CHANNEL},
            "trigger_id": "t-1",
            "actions": [{
                "type": "button", "action_id": "close_ticket", "block_id": "b1",
                "value": "s1", "action_ts": "1.1"
            }],
        });
        let body = serde_urlencoded::to_string([("payload", payload.to_string())]).unwrap();

        let response = app(&h)
            .oneshot(form_request("/slack/interactions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        settle().await;
        assert_eq!(h.ai.disconnects().await, vec!["s1".to_string()]);
        assert!(h.thread_of("s1").await.is_none());
    }

    #[tokio::test]
    async fn slash_command_replies_ephemerally() {
        let h = TestHarness::new();
        let body = serde_urlencoded::to_string([
            ("team_id", "T1"),
            ("channel_id", "C1"),
            ("user_id", "U_AGENT"),
            ("command", "/handover"),
            ("text", "role add staff"),
            ("response_url", "https://hooks.slack.com/commands/T1/1/x"),
            ("trigger_id", "t-2"),
            ("api_app_id", "A1"),
        ])
        .unwrap();
        let response = app(&h)
            .oneshot(form_request("/slack/commands", body))
            .await
            .unwrap();
        let reply = body_json(response).await;
        assert_eq!(reply["response_type"], "ephemeral");
        assert_eq!(reply["text"], "Role `staff` is defined.");
    }

    #[tokio::test]
    async fn health_reports_the_store() {
        let h = TestHarness::new();
        let response = app(&h)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
    }
}
