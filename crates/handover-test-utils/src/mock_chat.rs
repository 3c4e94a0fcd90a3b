// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic testing.
//!
//! `MockChatPlatform` implements `ChatPlatform`, capturing every post,
//! update, modal and view for assertion in tests. Message timestamps are
//! issued from a counter so thread ids are predictable.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use handover_core::error::CollaboratorKind;
use handover_core::traits::{Adapter, ChatPlatform};
use handover_core::types::{AdapterType, ChatUser, HealthStatus, PostMessage, PostedMessage};
use handover_core::HandoverError;

/// First timestamp issued; the n-th post gets `1700000000.{100 + n}`.
const FIRST_TS: u64 = 100;

/// A recorded `update_message` call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedMessage {
    pub channel: String,
    pub ts: String,
    pub text: String,
    pub blocks: Option<serde_json::Value>,
}

/// A mock chat workspace for testing.
pub struct MockChatPlatform {
    /// Posted messages with the ts issued for each.
    posts: Arc<Mutex<Vec<(String, PostMessage)>>>,
    updates: Arc<Mutex<Vec<UpdatedMessage>>>,
    modals: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    views: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    users: Arc<Mutex<Vec<ChatUser>>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Reply ts -> thread root, for messages posted by someone else.
    replies: Arc<Mutex<HashMap<String, String>>>,
    next_ts: AtomicU64,
    fail_posts: AtomicBool,
}

impl MockChatPlatform {
    pub fn new() -> Self {
        Self {
            posts: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            modals: Arc::new(Mutex::new(Vec::new())),
            views: Arc::new(Mutex::new(Vec::new())),
            users: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(HashMap::new())),
            replies: Arc::new(Mutex::new(HashMap::new())),
            next_ts: AtomicU64::new(FIRST_TS),
            fail_posts: AtomicBool::new(false),
        }
    }

    /// Adds a workspace member returned by `list_users`.
    pub async fn add_user(&self, id: &str, handle: &str, display_name: &str) {
        self.users.lock().await.push(ChatUser {
            id: id.to_string(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
        });
    }

    /// Makes `url` downloadable with the given content.
    pub async fn add_file(&self, url: &str, bytes: &[u8]) {
        self.files.lock().await.insert(url.to_string(), bytes.to_vec());
    }

    /// Records that message `ts` is a reply inside thread `root`.
    pub async fn add_reply(&self, ts: &str, root: &str) {
        self.replies
            .lock()
            .await
            .insert(ts.to_string(), root.to_string());
    }

    /// Makes every subsequent `post_message` fail.
    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub async fn posts(&self) -> Vec<PostMessage> {
        self.posts.lock().await.iter().map(|(_, p)| p.clone()).collect()
    }

    /// Posts that opened a new thread.
    pub async fn root_posts(&self) -> Vec<PostMessage> {
        self.posts
            .lock()
            .await
            .iter()
            .filter(|(_, p)| p.thread_ts.is_none())
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Replies posted into `thread_ts`, in order.
    pub async fn replies_in(&self, thread_ts: &str) -> Vec<String> {
        self.posts
            .lock()
            .await
            .iter()
            .filter(|(_, p)| p.thread_ts.as_deref() == Some(thread_ts))
            .map(|(_, p)| p.text.clone())
            .collect()
    }

    pub async fn updates(&self) -> Vec<UpdatedMessage> {
        self.updates.lock().await.clone()
    }

    /// Opened modals as `(trigger_id, view)`.
    pub async fn modals(&self) -> Vec<(String, serde_json::Value)> {
        self.modals.lock().await.clone()
    }

    /// Published views as `(user_id, view)`.
    pub async fn views(&self) -> Vec<(String, serde_json::Value)> {
        self.views.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.posts.lock().await.clear();
        self.updates.lock().await.clear();
        self.modals.lock().await.clear();
        self.views.lock().await.clear();
    }

    fn issue_ts(&self) -> String {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        format!("1700000000.{n:06}")
    }
}

impl Default for MockChatPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn rejected(message: &str) -> HandoverError {
    HandoverError::collaborator(CollaboratorKind::Chat, message)
}

#[async_trait]
impl Adapter for MockChatPlatform {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChatPlatform for MockChatPlatform {
    async fn post_message(&self, msg: PostMessage) -> Result<PostedMessage, HandoverError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(rejected("channel_not_found"));
        }
        let posted = PostedMessage {
            channel: msg.channel.clone(),
            ts: self.issue_ts(),
        };
        self.posts.lock().await.push((posted.ts.clone(), msg));
        Ok(posted)
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
        blocks: Option<serde_json::Value>,
    ) -> Result<(), HandoverError> {
        self.updates.lock().await.push(UpdatedMessage {
            channel: channel.to_string(),
            ts: ts.to_string(),
            text: text.to_string(),
            blocks,
        });
        Ok(())
    }

    async fn open_modal(
        &self,
        trigger_id: &str,
        view: serde_json::Value,
    ) -> Result<(), HandoverError> {
        self.modals.lock().await.push((trigger_id.to_string(), view));
        Ok(())
    }

    async fn publish_view(
        &self,
        user_id: &str,
        view: serde_json::Value,
    ) -> Result<(), HandoverError> {
        self.views.lock().await.push((user_id.to_string(), view));
        Ok(())
    }

    async fn thread_root(&self, _channel: &str, ts: &str) -> Result<Option<String>, HandoverError> {
        if let Some(root) = self.replies.lock().await.get(ts) {
            return Ok(Some(root.clone()));
        }
        let posts = self.posts.lock().await;
        Ok(posts
            .iter()
            .find(|(posted_ts, _)| posted_ts == ts)
            .map(|(posted_ts, p)| p.thread_ts.clone().unwrap_or_else(|| posted_ts.clone())))
    }

    async fn list_users(&self) -> Result<Vec<ChatUser>, HandoverError> {
        Ok(self.users.lock().await.clone())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, HandoverError> {
        self.files
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| rejected("file_not_found"))
    }
}
