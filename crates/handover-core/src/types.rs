// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the relay: persisted records, inbound chat
//! events, and message payloads exchanged with the AI platform.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::HandoverError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the relay.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Chat,
    Ai,
    Media,
}

/// One active live-agent escalation.
///
/// Immutable once created: no field is ever updated in place. The record is
/// destroyed when an agent closes the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque id issued by the AI platform.
    pub session_id: String,
    /// Chat-platform thread hosting the agent side of the conversation.
    pub thread_id: String,
    /// Best-known customer name at creation time.
    pub customer_display_name: String,
    /// Canonical customer phone, used when an agent saves the contact.
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session record stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        thread_id: impl Into<String>,
        customer_display_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            thread_id: thread_id.into(),
            customer_display_name: customer_display_name.into(),
            customer_phone: None,
            category: None,
            subcategory: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn with_tags(mut self, category: Option<String>, subcategory: Option<String>) -> Self {
        self.category = category;
        self.subcategory = subcategory;
        self
    }
}

/// A remembered identity for a phone number, independent of any session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Canonical phone number (digits only), primary key.
    pub phone: String,
    /// Agent-chosen display name; overrides the platform profile name.
    pub name: String,
    /// Broadcast role tags.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    pub saved_at: DateTime<Utc>,
}

impl Contact {
    pub fn has_any_role(&self, roles: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

/// Reduces a phone number to its digits so every spelling of the same
/// number maps to one directory key.
pub fn canonical_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Media kinds the customer channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Maps a MIME type onto a forwardable media kind.
    pub fn from_mimetype(mimetype: &str) -> Result<Self, HandoverError> {
        let top = mimetype
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match top.as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(HandoverError::UnsupportedMediaKind(mimetype.to_string())),
        }
    }
}

/// A message body exchanged with the AI platform in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePayload {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Audio {
        url: String,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Builds the media payload for a hosted file.
    pub fn media(kind: MediaKind, url: impl Into<String>) -> Self {
        let url = url.into();
        match kind {
            MediaKind::Image => Self::Image { url, caption: None },
            MediaKind::Video => Self::Video { url, caption: None },
            MediaKind::Audio => Self::Audio { url },
        }
    }

    /// The platform message type name (`text`, `image`, `video`, `audio`).
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
        }
    }
}

/// Customer metadata delivered with a start-escalation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRequest {
    pub session_id: String,
    pub phone: String,
    /// Profile name reported by the customer channel.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// A message to post on the chat platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    /// Thread to reply into; `None` starts a new thread.
    pub thread_ts: Option<String>,
    /// Fallback text, also used for notifications.
    pub text: String,
    /// Optional rich layout blocks.
    pub blocks: Option<serde_json::Value>,
}

impl PostMessage {
    /// A new top-level message, i.e. the root of a new thread.
    pub fn root(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: None,
            text: text.into(),
            blocks: None,
        }
    }

    /// A reply inside an existing thread.
    pub fn reply(
        channel: impl Into<String>,
        thread_ts: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: Some(thread_ts.into()),
            text: text.into(),
            blocks: None,
        }
    }

    pub fn with_blocks(mut self, blocks: serde_json::Value) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

/// Reference to a message accepted by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    /// Message timestamp; for a root message this is the new thread id.
    pub ts: String,
}

/// A chat-platform workspace member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    pub handle: String,
    pub display_name: String,
}

/// A file attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFile {
    pub id: String,
    pub name: String,
    pub mimetype: String,
    /// Authenticated download URL.
    pub url_private: String,
}

/// A message observed in a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub ts: String,
    /// Root of the thread this message belongs to, if it is a reply.
    pub thread_ts: Option<String>,
    pub user: Option<String>,
    /// Set when the message was authored by a bot or integration.
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
    pub text: String,
    pub files: Vec<ChatFile>,
}

impl ChannelMessage {
    /// Returns `true` for messages authored by a bot, including our own posts.
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }

    /// Returns `true` for edits, deletions, joins and other non-authored events.
    pub fn is_system_event(&self) -> bool {
        !matches!(
            self.subtype.as_deref(),
            None | Some("file_share") | Some("thread_broadcast")
        )
    }
}

/// A value captured from a modal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Options(Vec<String>),
}

/// Inbound events emitted by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message posted in a channel or thread.
    Message(ChannelMessage),
    /// A reaction added to a message.
    ReactionAdded {
        user: String,
        reaction: String,
        channel: String,
        item_ts: String,
        /// Thread root of the reacted message, when the platform supplies it.
        thread_ts: Option<String>,
    },
    /// An interactive button was pressed.
    ButtonClicked {
        action_id: String,
        value: String,
        user: String,
        channel: Option<String>,
        message_ts: Option<String>,
        thread_ts: Option<String>,
        trigger_id: String,
    },
    /// A modal form was submitted.
    ModalSubmitted {
        callback_id: String,
        private_metadata: String,
        user: String,
        values: BTreeMap<String, FieldValue>,
    },
    /// A user opened the app's home surface.
    AppSurfaceOpened { user: String },
}

/// An administrative slash command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub user: String,
    pub channel: String,
}
