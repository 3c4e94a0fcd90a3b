// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational-AI platform collaborator trait (fronts the WhatsApp customer).

use async_trait::async_trait;

use crate::error::HandoverError;
use crate::traits::adapter::Adapter;
use crate::types::MessagePayload;

/// Outbound operations against the AI platform's live-agent interface.
#[async_trait]
pub trait AiPlatform: Adapter {
    /// Delivers an agent message to the customer of `session_id`.
    async fn send_outbound(
        &self,
        session_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), HandoverError>;

    /// Ends the live-agent handoff and returns the customer to the bot.
    async fn disconnect(&self, session_id: &str) -> Result<(), HandoverError>;

    /// Sends a message to a phone number outside of any session.
    async fn notify_contact(&self, phone: &str, text: &str) -> Result<(), HandoverError>;
}
