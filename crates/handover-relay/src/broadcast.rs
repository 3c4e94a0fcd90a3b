// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role-targeted broadcasts started from the broadcast channel.
//!
//! A human message in the broadcast channel becomes a draft. The draft is
//! answered with a role picker; submitting the picker sends the message to
//! every saved contact holding any of the selected roles.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use handover_core::types::{ChannelMessage, FieldValue, PostMessage};
use handover_core::HandoverError;
use handover_storage::keys;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blocks;
use crate::relay::Relay;
use crate::templates::Notice;

/// Section text is limited to 3000 characters.
const MAX_PREVIEW_CHARS: usize = 2900;

/// A pending broadcast, keyed by the timestamp of the message that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastDraft {
    pub channel: String,
    pub ts: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one broadcast fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

pub(crate) fn selected_options(values: &BTreeMap<String, FieldValue>, key: &str) -> BTreeSet<String> {
    match values.get(key) {
        Some(FieldValue::Options(options)) => options.iter().cloned().collect(),
        Some(FieldValue::Text(text)) if !text.trim().is_empty() => {
            BTreeSet::from([text.trim().to_string()])
        }
        _ => BTreeSet::new(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= MAX_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}

impl Relay {
    pub async fn load_draft(&self, ts: &str) -> Result<BroadcastDraft, HandoverError> {
        match self.store.get(&keys::broadcast_key(ts)).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(HandoverError::not_found("broadcast draft", ts)),
        }
    }

    pub(crate) async fn draft_broadcast(&self, msg: ChannelMessage) -> Result<(), HandoverError> {
        let text = msg.text.trim();
        if text.is_empty() {
            debug!(ts = %msg.ts, "ignoring empty broadcast message");
            return Ok(());
        }

        let roles = self.contacts.list_roles().await?;
        if roles.is_empty() {
            self.post_reply(&msg.channel, &msg.ts, &Notice::BroadcastNoRoles.to_string())
                .await;
            return Ok(());
        }

        let draft = BroadcastDraft {
            channel: msg.channel.clone(),
            ts: msg.ts.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .set(&keys::broadcast_key(&draft.ts), &serde_json::to_string(&draft)?)
            .await?;
        info!(ts = %draft.ts, "broadcast drafted");

        let prompt = Notice::BroadcastPrompt.to_string();
        let reply = PostMessage::reply(&draft.channel, &draft.ts, &prompt)
            .with_blocks(blocks::encode(&blocks::broadcast_prompt(&prompt, &draft.ts))?);
        self.chat.post_message(reply).await?;
        Ok(())
    }

    pub(crate) async fn open_broadcast_picker(
        &self,
        ts: &str,
        trigger_id: &str,
    ) -> Result<(), HandoverError> {
        let draft = self.load_draft(ts).await?;
        let roles = self.contacts.list_roles().await?;
        if roles.is_empty() {
            self.post_reply(&draft.channel, &draft.ts, &Notice::BroadcastNoRoles.to_string())
                .await;
            return Ok(());
        }
        let view = blocks::broadcast_modal(&draft.ts, &preview(&draft.text), &roles);
        self.chat.open_modal(trigger_id, blocks::encode(&view)?).await
    }

    pub(crate) async fn send_broadcast(
        &self,
        ts: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), HandoverError> {
        let roles = selected_options(values, blocks::ROLES_INPUT);
        self.broadcast(ts, &roles).await.map(|_| ())
    }

    /// Sends the draft at `ts` to every contact holding any of `roles`.
    ///
    /// The draft is consumed before sending, so a repeated submission finds
    /// nothing and sends nothing. One contact failing never stops the rest.
    pub async fn broadcast(
        &self,
        ts: &str,
        roles: &BTreeSet<String>,
    ) -> Result<BroadcastReport, HandoverError> {
        let draft = match self.load_draft(ts).await {
            Ok(draft) => draft,
            Err(e) if e.is_not_found() => {
                debug!(%ts, "broadcast already sent or never drafted");
                return Ok(BroadcastReport::default());
            }
            Err(e) => return Err(e),
        };
        self.store.delete(&keys::broadcast_key(ts)).await?;

        let recipients = self.contacts.contacts_with_any_role(roles).await?;
        if recipients.is_empty() {
            self.post_reply(
                &draft.channel,
                &draft.ts,
                &Notice::BroadcastNoRecipients.to_string(),
            )
            .await;
            return Ok(BroadcastReport::default());
        }

        let mut report = BroadcastReport::default();
        for contact in &recipients {
            let outcome = match self.ai.notify_contact(&contact.phone, &draft.text).await {
                Ok(()) => {
                    report.sent += 1;
                    Notice::BroadcastDelivered {
                        name: &contact.name,
                        phone: &contact.phone,
                    }
                    .to_string()
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(phone = %contact.phone, error = %e, "broadcast delivery failed");
                    Notice::BroadcastFailed {
                        name: &contact.name,
                        phone: &contact.phone,
                        error: &e.to_string(),
                    }
                    .to_string()
                }
            };
            self.post_reply(&draft.channel, &draft.ts, &outcome).await;
        }

        let summary = Notice::BroadcastSummary {
            sent: report.sent,
            failed: report.failed,
        };
        self.post_reply(&draft.channel, &draft.ts, &summary.to_string())
            .await;
        info!(%ts, ?roles, sent = report.sent, failed = report.failed, "broadcast finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_options_reads_multi_select_values() {
        let mut values = BTreeMap::new();
        values.insert(
            "roles".to_string(),
            FieldValue::Options(vec!["parents".into(), "staff".into()]),
        );
        let roles = selected_options(&values, "roles");
        assert_eq!(roles.len(), 2);
        assert!(roles.contains("parents"));
        assert!(selected_options(&values, "missing").is_empty());
    }

    #[test]
    fn long_previews_are_truncated() {
        let text = "a".repeat(MAX_PREVIEW_CHARS + 10);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), MAX_PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
