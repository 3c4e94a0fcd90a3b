// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable text the relay posts, keyed by what happened.

use std::collections::BTreeSet;
use std::fmt;

use handover_core::types::MessagePayload;
use handover_session::ReminderStage;

/// Formats a set of user ids as chat mentions, or the fallback pool label.
pub fn mentions(responders: &BTreeSet<String>) -> String {
    if responders.is_empty() {
        return "unassigned · general pool".to_string();
    }
    responders
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Displays a canonical phone number with a leading `+`.
pub fn display_phone(phone: &str) -> String {
    if phone.is_empty() {
        "unknown number".to_string()
    } else {
        format!("+{phone}")
    }
}

/// Text of the root message opening a session thread.
pub struct ThreadHeader<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub category: Option<&'a str>,
    pub subcategory: Option<&'a str>,
    pub responders: &'a BTreeSet<String>,
}

impl fmt::Display for ThreadHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            ":speech_balloon: *New conversation* with *{}* ({})",
            self.name,
            display_phone(self.phone)
        )?;
        match (self.category, self.subcategory) {
            (Some(c), Some(s)) => writeln!(f, "*Topic:* {c} › {s}")?,
            (Some(c), None) => writeln!(f, "*Topic:* {c}")?,
            _ => writeln!(f, "*Topic:* not specified")?,
        }
        write!(f, "*Responders:* {}", mentions(self.responders))
    }
}

/// A customer message as it appears in the thread.
pub fn customer_line(name: &str, payload: &MessagePayload) -> String {
    let caption = |c: &Option<String>| {
        c.as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("\n>{c}"))
            .unwrap_or_default()
    };
    match payload {
        MessagePayload::Text { text } => format!("*{name}:* {text}"),
        MessagePayload::Image { url, caption: c } => {
            format!("*{name}:* :frame_with_picture: <{url}|image>{}", caption(c))
        }
        MessagePayload::Video { url, caption: c } => {
            format!("*{name}:* :film_frames: <{url}|video>{}", caption(c))
        }
        MessagePayload::Audio { url } => format!("*{name}:* :microphone: <{url}|voice note>"),
    }
}

/// Notices posted into a session or broadcast thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice<'a> {
    Closed { by: Option<&'a str> },
    CloseDisconnectFailed { error: &'a str },
    Reminder { stage: ReminderStage, delivered: bool },
    ForwardFailed { what: &'a str, error: &'a str },
    UnsupportedMedia { file_name: &'a str, mimetype: &'a str },
    MediaUnavailable { file_name: &'a str },
    UnsupportedCustomerMessage { kind: &'a str },
    ContactSaved { name: &'a str, phone: &'a str },
    BroadcastNoRoles,
    BroadcastPrompt,
    BroadcastNoRecipients,
    BroadcastDelivered { name: &'a str, phone: &'a str },
    BroadcastFailed { name: &'a str, phone: &'a str, error: &'a str },
    BroadcastSummary { sent: usize, failed: usize },
}

impl fmt::Display for Notice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed { by: Some(user) } => {
                write!(f, ":white_check_mark: Ticket closed by <@{user}>. The customer is back with the bot.")
            }
            Self::Closed { by: None } => {
                write!(f, ":white_check_mark: Ticket closed. The customer is back with the bot.")
            }
            Self::CloseDisconnectFailed { error } => write!(
                f,
                ":warning: The ticket was closed here, but the AI platform did not confirm the handoff ended: {error}"
            ),
            Self::Reminder { stage, delivered: true } => write!(
                f,
                ":alarm_clock: No agent reply yet ({}). The customer was told everyone is busy.",
                stage_label(*stage)
            ),
            Self::Reminder { stage, delivered: false } => write!(
                f,
                ":alarm_clock: No agent reply yet ({}). Sending the busy notice to the customer failed.",
                stage_label(*stage)
            ),
            Self::ForwardFailed { what, error } => write!(
                f,
                ":x: Could not deliver your {what} to the customer: {error}. Please try again."
            ),
            Self::UnsupportedMedia {
                file_name,
                mimetype,
            } => write!(
                f,
                ":no_entry_sign: `{file_name}` ({mimetype}) cannot be sent over WhatsApp. Only images, videos and audio are forwarded."
            ),
            Self::MediaUnavailable { file_name } => write!(
                f,
                ":no_entry_sign: `{file_name}` was not sent: media forwarding is not configured."
            ),
            Self::UnsupportedCustomerMessage { kind } => write!(
                f,
                ":no_entry_sign: The customer sent a `{kind}` message, which cannot be shown here. Ask them to send text, a photo, a video or a voice note."
            ),
            Self::ContactSaved { name, phone } => {
                write!(f, ":bookmark: Saved {} as *{name}*.", display_phone(phone))
            }
            Self::BroadcastNoRoles => write!(
                f,
                "No roles are defined yet, so there is no one to broadcast to. Add one with `/handover role add <name>`."
            ),
            Self::BroadcastPrompt => write!(f, "Choose which roles should receive this message."),
            Self::BroadcastNoRecipients => {
                write!(f, "No saved contacts have the selected roles. Nothing was sent.")
            }
            Self::BroadcastDelivered { name, phone } => {
                write!(f, ":white_check_mark: Sent to {name} ({})", display_phone(phone))
            }
            Self::BroadcastFailed { name, phone, error } => {
                write!(f, ":x: Failed for {name} ({}): {error}", display_phone(phone))
            }
            Self::BroadcastSummary { sent, failed } => {
                write!(f, "Broadcast finished: {sent} sent, {failed} failed.")
            }
        }
    }
}

fn stage_label(stage: ReminderStage) -> &'static str {
    match stage {
        ReminderStage::First => "first reminder",
        ReminderStage::Second => "second reminder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_mentions_responders() {
        let responders: BTreeSet<String> = ["U2".to_string(), "U1".to_string()].into();
        let text = ThreadHeader {
            name: "Ana",
            phone: "15551234567",
            category: Some("academy"),
            subcategory: Some("registration"),
            responders: &responders,
        }
        .to_string();
        assert!(text.contains("<@U1> <@U2>"), "{text}");
        assert!(text.contains("+15551234567"));
        assert!(text.contains("academy › registration"));
    }

    #[test]
    fn header_without_responders_names_the_pool() {
        let text = ThreadHeader {
            name: "Ana",
            phone: "1",
            category: None,
            subcategory: None,
            responders: &BTreeSet::new(),
        }
        .to_string();
        assert!(text.contains("unassigned · general pool"));
        assert!(text.contains("not specified"));
    }

    #[test]
    fn customer_lines_render_each_kind() {
        assert_eq!(
            customer_line("Ana", &MessagePayload::text("Hello")),
            "*Ana:* Hello"
        );
        let image = MessagePayload::Image {
            url: "https://cdn/p.jpg".into(),
            caption: Some("receipt".into()),
        };
        assert_eq!(
            customer_line("Ana", &image),
            "*Ana:* :frame_with_picture: <https://cdn/p.jpg|image>\n>receipt"
        );
        let audio = MessagePayload::Audio {
            url: "https://cdn/a.ogg".into(),
        };
        assert!(customer_line("Ana", &audio).contains(":microphone:"));
    }

    #[test]
    fn broadcast_lines() {
        assert_eq!(
            Notice::BroadcastFailed {
                name: "Bruno",
                phone: "2",
                error: "timeout"
            }
            .to_string(),
            ":x: Failed for Bruno (+2): timeout"
        );
        assert_eq!(
            Notice::BroadcastSummary { sent: 1, failed: 1 }.to_string(),
            "Broadcast finished: 1 sent, 1 failed."
        );
    }
}
