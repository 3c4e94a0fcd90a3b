// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack Web API client.
//!
//! Web API calls go through a [`slack_morphism`] hyper client session with
//! the bot token. File downloads use a plain HTTP client because Slack serves
//! private files outside the Web API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handover_config::model::SlackConfig;
use handover_core::types::{ChatUser, PostMessage, PostedMessage};
use handover_core::{
    Adapter, AdapterType, ChatPlatform, CollaboratorKind, HandoverError, HealthStatus,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;
use tracing::{debug, error};

const USERS_PAGE_SIZE: u16 = 200;

/// Errors meaning the message passed to `conversations.replies` no longer exists.
const GONE_MESSAGE_CODES: [&str; 2] = ["thread_not_found", "message_not_found"];

fn chat_error(message: impl Into<String>) -> HandoverError {
    HandoverError::collaborator(CollaboratorKind::Chat, message)
}

fn api_error(method: &str, e: SlackClientError) -> HandoverError {
    error!(%method, error = %e, "slack api call failed");
    chat_error(format!("slack {method} failed: {e}"))
}

fn transport_error(e: reqwest::Error) -> HandoverError {
    HandoverError::Collaborator {
        kind: CollaboratorKind::Chat,
        message: format!("slack file download failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Decodes relay-built layout blocks into typed Slack blocks.
fn decode_blocks(blocks: Value) -> Result<Vec<SlackBlock>, HandoverError> {
    serde_json::from_value(blocks).map_err(|e| chat_error(format!("invalid slack blocks: {e}")))
}

fn decode_view(view: Value) -> Result<SlackView, HandoverError> {
    serde_json::from_value(view).map_err(|e| chat_error(format!("invalid slack view: {e}")))
}

fn message_content(text: &str, blocks: Option<Value>) -> Result<SlackMessageContent, HandoverError> {
    let mut content = SlackMessageContent::new().with_text(text.to_string());
    if let Some(blocks) = blocks {
        content.blocks = Some(decode_blocks(blocks)?);
    }
    Ok(content)
}

/// Builds a `chat.postMessage` request. Link unfurling is off so customer
/// links do not expand inside the support thread.
fn post_message_request(msg: &PostMessage) -> Result<SlackApiChatPostMessageRequest, HandoverError> {
    let content = message_content(&msg.text, msg.blocks.clone())?;
    let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(msg.channel.clone()), content);
    request.thread_ts = msg.thread_ts.clone().map(SlackTs);
    request.unfurl_links = Some(false);
    Ok(request)
}

/// `None` for deleted accounts and bots.
fn chat_user(user: SlackUser) -> Option<ChatUser> {
    if user.deleted.unwrap_or(false) || user.flags.is_bot.unwrap_or(false) {
        return None;
    }
    let id = user.id.0;
    let handle = user.name.unwrap_or_else(|| id.clone());
    let display_name = user
        .profile
        .and_then(|p| {
            [p.display_name, p.real_name]
                .into_iter()
                .flatten()
                .find(|n| !n.trim().is_empty())
        })
        .unwrap_or_else(|| handle.clone());
    Some(ChatUser {
        id,
        handle,
        display_name,
    })
}

fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata
        .and_then(|m| m.next_cursor)
        .filter(|cursor| !cursor.0.is_empty())
}

/// Bot-token client for the Slack Web API.
pub struct SlackClient {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    bot_token: String,
    files: reqwest::Client,
}

impl SlackClient {
    /// Builds a client from `[slack]` settings. Requires `bot_token`.
    pub fn new(config: &SlackConfig) -> Result<Self, HandoverError> {
        let bot_token = config
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HandoverError::Config("slack.bot_token is required".into()))?;

        let connector = SlackClientHyperConnector::new()
            .map_err(|e| HandoverError::Config(format!("failed to build slack client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("handover-relay"));
        let files = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| HandoverError::Config(format!("failed to build slack file client: {e}")))?;

        Ok(Self {
            client: Arc::new(SlackHyperClient::new(connector)),
            token: SlackApiToken::new(SlackApiTokenValue(bot_token.to_string())),
            bot_token: bot_token.to_string(),
            files,
        })
    }
}

#[async_trait]
impl Adapter for SlackClient {
    fn name(&self) -> &str {
        "slack"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        let session = self.client.open_session(&self.token);
        match session.auth_test().await {
            Ok(auth) => {
                debug!(user = %auth.user_id.0, "slack auth.test succeeded");
                Ok(HealthStatus::Healthy)
            }
            Err(e) => Ok(HealthStatus::Unhealthy(api_error("auth.test", e).to_string())),
        }
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn post_message(&self, msg: PostMessage) -> Result<PostedMessage, HandoverError> {
        let request = post_message_request(&msg)?;
        let session = self.client.open_session(&self.token);
        let response = session
            .chat_post_message(&request)
            .await
            .map_err(|e| api_error("chat.postMessage", e))?;
        Ok(PostedMessage {
            channel: response.channel.0,
            ts: response.ts.0,
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> Result<(), HandoverError> {
        let request = SlackApiChatUpdateRequest::new(
            SlackChannelId(channel.to_string()),
            message_content(text, blocks)?,
            SlackTs(ts.to_string()),
        );
        let session = self.client.open_session(&self.token);
        session
            .chat_update(&request)
            .await
            .map_err(|e| api_error("chat.update", e))?;
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: Value) -> Result<(), HandoverError> {
        let request =
            SlackApiViewsOpenRequest::new(SlackTriggerId(trigger_id.to_string()), decode_view(view)?);
        let session = self.client.open_session(&self.token);
        session
            .views_open(&request)
            .await
            .map_err(|e| api_error("views.open", e))?;
        Ok(())
    }

    async fn publish_view(&self, user_id: &str, view: Value) -> Result<(), HandoverError> {
        let request =
            SlackApiViewsPublishRequest::new(SlackUserId(user_id.to_string()), decode_view(view)?);
        let session = self.client.open_session(&self.token);
        session
            .views_publish(&request)
            .await
            .map_err(|e| api_error("views.publish", e))?;
        Ok(())
    }

    async fn thread_root(&self, channel: &str, ts: &str) -> Result<Option<String>, HandoverError> {
        let mut request = SlackApiConversationsRepliesRequest::new(
            SlackChannelId(channel.to_string()),
            SlackTs(ts.to_string()),
        );
        request.limit = Some(1);
        let session = self.client.open_session(&self.token);
        match session.conversations_replies(&request).await {
            Ok(response) => Ok(response.messages.into_iter().next().map(|m| m.origin.ts.0)),
            Err(SlackClientError::ApiError(e)) if GONE_MESSAGE_CODES.contains(&e.code.as_str()) => {
                debug!(%channel, %ts, code = %e.code, "reacted message is gone");
                Ok(None)
            }
            Err(e) => Err(api_error("conversations.replies", e)),
        }
    }

    async fn list_users(&self) -> Result<Vec<ChatUser>, HandoverError> {
        let session = self.client.open_session(&self.token);
        let mut users = Vec::new();
        let mut cursor = None;

        loop {
            let mut request = SlackApiUsersListRequest::new();
            request.limit = Some(USERS_PAGE_SIZE);
            request.cursor = cursor;
            let page = session
                .users_list(&request)
                .await
                .map_err(|e| api_error("users.list", e))?;

            users.extend(page.members.into_iter().filter_map(chat_user));

            cursor = next_cursor(page.response_metadata);
            if cursor.is_none() {
                break;
            }
        }

        Ok(users)
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, HandoverError> {
        let response = self
            .files
            .get(url)
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(chat_error(format!("slack file download returned {status}")));
        }
        // Slack serves its login page instead of the file when the token lacks files:read.
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            return Err(chat_error(
                "slack file download returned a web page; check the files:read scope",
            ));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> SlackClient {
        SlackClient::new(&SlackConfig {
            bot_token: Some("xoxb-test".into()),
            ..SlackConfig::default()
        })
        .unwrap()
    }

    fn user(value: Value) -> SlackUser {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let err = SlackClient::new(&SlackConfig::default()).err().unwrap();
        assert!(matches!(err, HandoverError::Config(_)));

        let blank = SlackClient::new(&SlackConfig {
            bot_token: Some("  ".into()),
            ..SlackConfig::default()
        });
        assert!(matches!(blank, Err(HandoverError::Config(_))));
    }

    #[test]
    fn thread_reply_request_carries_thread_and_blocks() {
        let msg = PostMessage::reply("C1", "1.0", "hi").with_blocks(json!([{"type": "divider"}]));
        let request = post_message_request(&msg).unwrap();
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["channel"], "C1");
        assert_eq!(wire["thread_ts"], "1.0");
        assert_eq!(wire["text"], "hi");
        assert_eq!(wire["unfurl_links"], false);
        assert_eq!(wire["blocks"][0]["type"], "divider");
    }

    #[test]
    fn root_request_has_no_thread() {
        let request = post_message_request(&PostMessage::root("C1", "hello")).unwrap();
        assert!(request.thread_ts.is_none());
        assert!(request.content.blocks.is_none());
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let msg = PostMessage::root("C1", "x").with_blocks(json!([{"type": "carousel"}]));
        assert!(matches!(
            post_message_request(&msg),
            Err(HandoverError::Collaborator { kind: CollaboratorKind::Chat, .. })
        ));
    }

    #[test]
    fn users_map_to_handle_and_best_display_name() {
        let ana = user(json!({
            "id": "U1", "name": "ana", "profile": {"display_name": "Ana", "real_name": "Ana A"}
        }));
        assert_eq!(
            chat_user(ana),
            Some(ChatUser { id: "U1".into(), handle: "ana".into(), display_name: "Ana".into() })
        );

        let bruno = user(json!({
            "id": "U2", "name": "bruno", "profile": {"display_name": "", "real_name": "Bruno B"}
        }));
        assert_eq!(chat_user(bruno).unwrap().display_name, "Bruno B");

        let bare = user(json!({"id": "U3", "name": "carla"}));
        assert_eq!(chat_user(bare).unwrap().display_name, "carla");
    }

    #[test]
    fn bots_and_deleted_users_are_skipped() {
        assert_eq!(chat_user(user(json!({"id": "B1", "name": "relay", "is_bot": true}))), None);
        assert_eq!(chat_user(user(json!({"id": "U9", "name": "gone", "deleted": true}))), None);
    }

    #[test]
    fn empty_cursor_ends_pagination() {
        let done: SlackResponseMetadata = serde_json::from_value(json!({"next_cursor": ""})).unwrap();
        assert_eq!(next_cursor(Some(done)), None);
        assert_eq!(next_cursor(None), None);

        let more: SlackResponseMetadata =
            serde_json::from_value(json!({"next_cursor": "page2"})).unwrap();
        assert_eq!(next_cursor(Some(more)).map(|c| c.0).as_deref(), Some("page2"));
    }

    #[tokio::test]
    async fn download_file_uses_bot_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/photo.png"))
            .and(header("authorization", "Bearer xoxb-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
            )
            .mount(&server)
            .await;

        let bytes = client()
            .download_file(&format!("{}/files/photo.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn download_returning_login_page_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/doc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>sign in</html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let err = client()
            .download_file(&format!("{}/files/doc", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("files:read"), "{err}");
    }

    #[tokio::test]
    async fn download_http_failure_is_a_collaborator_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client()
            .download_file(&format!("{}/files/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, HandoverError::Collaborator { kind: CollaboratorKind::Chat, .. }));
    }
}
