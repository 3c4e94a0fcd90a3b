// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-platform collaborator trait (the product human agents work in).

use async_trait::async_trait;

use crate::error::HandoverError;
use crate::traits::adapter::Adapter;
use crate::types::{ChatUser, PostMessage, PostedMessage};

/// Outbound operations against the chat platform.
///
/// Inbound events arrive separately as [`ChatEvent`](crate::types::ChatEvent)s
/// parsed by the webhook layer.
#[async_trait]
pub trait ChatPlatform: Adapter {
    /// Posts a message; a root message opens a new thread whose id is the
    /// returned timestamp.
    async fn post_message(&self, msg: PostMessage) -> Result<PostedMessage, HandoverError>;

    /// Replaces the content of a previously posted message.
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
        blocks: Option<serde_json::Value>,
    ) -> Result<(), HandoverError>;

    /// Opens a modal view in response to an interaction.
    async fn open_modal(
        &self,
        trigger_id: &str,
        view: serde_json::Value,
    ) -> Result<(), HandoverError>;

    /// Publishes the app surface (home tab) for a user.
    async fn publish_view(
        &self,
        user_id: &str,
        view: serde_json::Value,
    ) -> Result<(), HandoverError>;

    /// Resolves the root of the thread containing message `ts`.
    ///
    /// A top-level message is its own root. `None` when the message is gone.
    async fn thread_root(&self, channel: &str, ts: &str) -> Result<Option<String>, HandoverError>;

    /// Lists workspace members.
    async fn list_users(&self) -> Result<Vec<ChatUser>, HandoverError>;

    /// Downloads a file attached to a message.
    async fn download_file(&self, url: &str) -> Result<Vec<u8>, HandoverError>;
}
