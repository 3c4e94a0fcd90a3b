// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI platform and media host.
//!
//! Both record every call. Failures can be injected per session id or per
//! phone number to exercise partial-failure paths.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use handover_core::error::CollaboratorKind;
use handover_core::traits::{Adapter, AiPlatform, MediaHost};
use handover_core::types::{AdapterType, HealthStatus, MediaKind, MessagePayload};
use handover_core::HandoverError;

fn rejected(kind: CollaboratorKind, message: &str) -> HandoverError {
    HandoverError::collaborator(kind, message)
}

/// A mock conversational-AI platform for testing.
pub struct MockAiPlatform {
    outbound: Arc<Mutex<Vec<(String, MessagePayload)>>>,
    disconnects: Arc<Mutex<Vec<String>>>,
    notified: Arc<Mutex<Vec<(String, String)>>>,
    failing_sessions: Arc<Mutex<HashSet<String>>>,
    failing_phones: Arc<Mutex<HashSet<String>>>,
}

impl MockAiPlatform {
    pub fn new() -> Self {
        Self {
            outbound: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(Mutex::new(Vec::new())),
            notified: Arc::new(Mutex::new(Vec::new())),
            failing_sessions: Arc::new(Mutex::new(HashSet::new())),
            failing_phones: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Makes sends and disconnects for `session_id` fail.
    pub async fn fail_session(&self, session_id: &str) {
        self.failing_sessions.lock().await.insert(session_id.to_string());
    }

    /// Makes `notify_contact` for `phone` fail.
    pub async fn fail_phone(&self, phone: &str) {
        self.failing_phones.lock().await.insert(phone.to_string());
    }

    /// Outbound messages as `(session_id, payload)`.
    pub async fn outbound(&self) -> Vec<(String, MessagePayload)> {
        self.outbound.lock().await.clone()
    }

    /// Outbound payloads sent to one session.
    pub async fn outbound_for(&self, session_id: &str) -> Vec<MessagePayload> {
        self.outbound
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == session_id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn disconnects(&self) -> Vec<String> {
        self.disconnects.lock().await.clone()
    }

    /// Direct notifications as `(phone, text)`.
    pub async fn notified(&self) -> Vec<(String, String)> {
        self.notified.lock().await.clone()
    }
}

impl Default for MockAiPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockAiPlatform {
    fn name(&self) -> &str {
        "mock-ai"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ai
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl AiPlatform for MockAiPlatform {
    async fn send_outbound(
        &self,
        session_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), HandoverError> {
        if self.failing_sessions.lock().await.contains(session_id) {
            return Err(rejected(CollaboratorKind::Ai, "session is not live"));
        }
        self.outbound
            .lock()
            .await
            .push((session_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn disconnect(&self, session_id: &str) -> Result<(), HandoverError> {
        if self.failing_sessions.lock().await.contains(session_id) {
            return Err(rejected(CollaboratorKind::Ai, "session is not live"));
        }
        self.disconnects.lock().await.push(session_id.to_string());
        Ok(())
    }

    async fn notify_contact(&self, phone: &str, text: &str) -> Result<(), HandoverError> {
        if self.failing_phones.lock().await.contains(phone) {
            return Err(rejected(CollaboratorKind::Ai, "number is not on WhatsApp"));
        }
        self.notified
            .lock()
            .await
            .push((phone.to_string(), text.to_string()));
        Ok(())
    }
}

/// A mock media host that returns `https://media.test/{kind}/{file_name}`.
pub struct MockMediaHost {
    uploads: Arc<Mutex<Vec<(MediaKind, String, usize)>>>,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Uploads as `(kind, file_name, byte_len)`.
    pub async fn uploads(&self) -> Vec<(MediaKind, String, usize)> {
        self.uploads.lock().await.clone()
    }
}

impl Default for MockMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockMediaHost {
    fn name(&self) -> &str {
        "mock-media"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Media
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MediaHost for MockMediaHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        kind: MediaKind,
        file_name: &str,
    ) -> Result<String, HandoverError> {
        if bytes.is_empty() {
            return Err(rejected(CollaboratorKind::Media, "empty upload"));
        }
        self.uploads
            .lock()
            .await
            .push((kind, file_name.to_string(), bytes.len()));
        Ok(format!("https://media.test/{kind}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_sessions_record_nothing() {
        let ai = MockAiPlatform::new();
        ai.fail_session("s1").await;
        assert!(ai.send_outbound("s1", &MessagePayload::text("hi")).await.is_err());
        assert!(ai.disconnect("s1").await.is_err());
        ai.send_outbound("s2", &MessagePayload::text("hi")).await.unwrap();
        assert_eq!(ai.outbound_for("s2").await, vec![MessagePayload::text("hi")]);
        assert!(ai.disconnects().await.is_empty());
    }

    #[tokio::test]
    async fn media_urls_name_the_kind() {
        let media = MockMediaHost::new();
        let url = media.upload(vec![1, 2, 3], MediaKind::Image, "a.png").await.unwrap();
        assert_eq!(url, "https://media.test/image/a.png");
        assert_eq!(media.uploads().await, vec![(MediaKind::Image, "a.png".to_string(), 3)]);
    }
}
