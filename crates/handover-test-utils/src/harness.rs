// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end relay testing.
//!
//! `TestHarness` assembles a complete relay with an in-memory store and mock
//! collaborators, and offers helpers that build the inbound events a real
//! chat workspace would deliver.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use handover_core::types::{
    ChannelMessage, ChatEvent, ChatFile, EscalationRequest, FieldValue, MessagePayload,
    SlashCommand,
};
use handover_core::{KvStore, MediaHost};
use handover_relay::{Relay, RelayAck, RelaySettings};
use handover_session::TimerDelays;
use handover_storage::MemoryStore;

use crate::mock_ai::{MockAiPlatform, MockMediaHost};
use crate::mock_chat::MockChatPlatform;

pub const SUPPORT_CHANNEL: &str = "C_SUPPORT";
pub const BROADCAST_CHANNEL: &str = "C_BROADCAST";
pub const AGENT: &str = "U_AGENT";
pub const BUSY_MESSAGE: &str = "All our agents are busy, we will be with you shortly.";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    escalation_enabled: bool,
    delays: TimerDelays,
    with_media: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            escalation_enabled: true,
            delays: TimerDelays::default(),
            with_media: true,
        }
    }

    /// Disable reminder scheduling for new sessions.
    pub fn without_escalation(mut self) -> Self {
        self.escalation_enabled = false;
        self
    }

    pub fn with_delays(mut self, first_secs: u64, second_secs: u64) -> Self {
        self.delays = TimerDelays {
            first: Duration::from_secs(first_secs),
            second: Duration::from_secs(second_secs),
        };
        self
    }

    /// Run without a media host, as when `[media]` is not configured.
    pub fn without_media(mut self) -> Self {
        self.with_media = false;
        self
    }

    pub fn build(self) -> TestHarness {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let chat = Arc::new(MockChatPlatform::new());
        let ai = Arc::new(MockAiPlatform::new());
        let media = Arc::new(MockMediaHost::new());

        let settings = RelaySettings {
            support_channel: SUPPORT_CHANNEL.to_string(),
            broadcast_channel: BROADCAST_CHANNEL.to_string(),
            close_reaction: "white_check_mark".to_string(),
            command: "/handover".to_string(),
            escalation_enabled: self.escalation_enabled,
            busy_message: BUSY_MESSAGE.to_string(),
            delays: self.delays,
        };
        let media_host = self
            .with_media
            .then(|| Arc::clone(&media) as Arc<dyn MediaHost>);
        let relay = Arc::new(Relay::new(
            settings,
            Arc::clone(&store),
            chat.clone(),
            ai.clone(),
            media_host,
        ));

        TestHarness {
            relay,
            store,
            chat,
            ai,
            media,
        }
    }
}

/// A complete relay with mock collaborators and an in-memory store.
pub struct TestHarness {
    pub relay: Arc<Relay>,
    pub store: Arc<dyn KvStore>,
    pub chat: Arc<MockChatPlatform>,
    pub ai: Arc<MockAiPlatform>,
    pub media: Arc<MockMediaHost>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts an escalation and returns the acknowledgement.
    pub async fn start(
        &self,
        session_id: &str,
        phone: &str,
        name: Option<&str>,
        topic: Option<(&str, &str)>,
    ) -> RelayAck {
        self.relay
            .start(EscalationRequest {
                session_id: session_id.to_string(),
                phone: phone.to_string(),
                name: name.map(str::to_string),
                category: topic.map(|(c, _)| c.to_string()),
                subcategory: topic.map(|(_, s)| s.to_string()),
            })
            .await
    }

    /// Thread id of an open session.
    pub async fn thread_of(&self, session_id: &str) -> Option<String> {
        self.relay
            .sessions()
            .get_by_session_id(session_id)
            .await
            .ok()
            .map(|s| s.thread_id)
    }

    pub async fn customer_text(&self, session_id: &str, text: &str) -> RelayAck {
        self.relay
            .customer_message(session_id, MessagePayload::text(text))
            .await
    }

    /// Delivers a human reply in `thread` of the support channel.
    pub async fn agent_reply(&self, thread: &str, text: &str) {
        self.agent_reply_with_files(thread, text, Vec::new()).await;
    }

    pub async fn agent_reply_with_files(&self, thread: &str, text: &str, files: Vec<ChatFile>) {
        let subtype = (!files.is_empty()).then(|| "file_share".to_string());
        let msg = ChannelMessage {
            channel: SUPPORT_CHANNEL.to_string(),
            ts: format!("{thread}9"),
            thread_ts: Some(thread.to_string()),
            user: Some(AGENT.to_string()),
            bot_id: None,
            subtype,
            text: text.to_string(),
            files,
        };
        self.relay.handle_event(ChatEvent::Message(msg)).await;
    }

    /// Delivers a top-level human message in the broadcast channel.
    pub async fn broadcast_message(&self, ts: &str, text: &str) {
        let msg = ChannelMessage {
            channel: BROADCAST_CHANNEL.to_string(),
            ts: ts.to_string(),
            thread_ts: None,
            user: Some(AGENT.to_string()),
            bot_id: None,
            subtype: None,
            text: text.to_string(),
            files: Vec::new(),
        };
        self.relay.handle_event(ChatEvent::Message(msg)).await;
    }

    pub async fn react(&self, item_ts: &str, reaction: &str) {
        self.relay
            .handle_event(ChatEvent::ReactionAdded {
                user: AGENT.to_string(),
                reaction: reaction.to_string(),
                channel: SUPPORT_CHANNEL.to_string(),
                item_ts: item_ts.to_string(),
                thread_ts: None,
            })
            .await;
    }

    pub async fn click(&self, action_id: &str, value: &str) {
        self.relay
            .handle_event(ChatEvent::ButtonClicked {
                action_id: action_id.to_string(),
                value: value.to_string(),
                user: AGENT.to_string(),
                channel: Some(SUPPORT_CHANNEL.to_string()),
                message_ts: None,
                thread_ts: None,
                trigger_id: "trigger-1".to_string(),
            })
            .await;
    }

    pub async fn submit(
        &self,
        callback_id: &str,
        private_metadata: &str,
        values: BTreeMap<String, FieldValue>,
    ) {
        self.relay
            .handle_event(ChatEvent::ModalSubmitted {
                callback_id: callback_id.to_string(),
                private_metadata: private_metadata.to_string(),
                user: AGENT.to_string(),
                values,
            })
            .await;
    }

    pub async fn command(&self, text: &str) -> String {
        self.relay
            .handle_command(SlashCommand {
                command: "/handover".to_string(),
                text: text.to_string(),
                user: AGENT.to_string(),
                channel: SUPPORT_CHANNEL.to_string(),
            })
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
