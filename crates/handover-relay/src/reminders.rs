// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivers escalation reminders to the customer and mirrors them in the thread.

use std::sync::Arc;

use async_trait::async_trait;
use handover_core::types::{MessagePayload, PostMessage};
use handover_core::{AiPlatform, ChatPlatform, HandoverError, Session};
use handover_session::{ReminderSink, ReminderStage};
use tracing::warn;

use crate::templates::Notice;

pub struct BusyNotifier {
    ai: Arc<dyn AiPlatform>,
    chat: Arc<dyn ChatPlatform>,
    channel: String,
    busy_message: String,
}

impl BusyNotifier {
    pub fn new(
        ai: Arc<dyn AiPlatform>,
        chat: Arc<dyn ChatPlatform>,
        channel: impl Into<String>,
        busy_message: impl Into<String>,
    ) -> Self {
        Self {
            ai,
            chat,
            channel: channel.into(),
            busy_message: busy_message.into(),
        }
    }
}

#[async_trait]
impl ReminderSink for BusyNotifier {
    async fn remind(&self, session: &Session, stage: ReminderStage) -> Result<(), HandoverError> {
        let sent = self
            .ai
            .send_outbound(&session.session_id, &MessagePayload::text(&self.busy_message))
            .await;

        let notice = Notice::Reminder {
            stage,
            delivered: sent.is_ok(),
        };
        let mirror = PostMessage::reply(&self.channel, &session.thread_id, notice.to_string());
        if let Err(e) = self.chat.post_message(mirror).await {
            warn!(session_id = %session.session_id, error = %e, "could not mirror reminder into thread");
        }

        sent
    }
}
