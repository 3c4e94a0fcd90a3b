// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound Slack payloads.
//!
//! Three delivery paths reach the relay: Events API JSON bodies
//! ([`SlackPushEvent`]), interactivity payloads ([`SlackInteractionEvent`],
//! a JSON string in the `payload` form field), and slash-command forms
//! ([`SlackCommandEvent`]). Each is reduced to a [`ChatEvent`] or
//! [`SlashCommand`]. Anything the relay does not act on is reported as
//! ignored rather than as an error.

use std::collections::BTreeMap;

use handover_core::HandoverError;
use handover_core::types::{ChannelMessage, ChatEvent, ChatFile, FieldValue, SlashCommand};
use serde::Serialize;
use serde_json::Value;
use slack_morphism::prelude::*;
use tracing::{debug, warn};

/// Result of parsing an Events API body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsRequest {
    /// Endpoint ownership check; the challenge must be echoed back.
    UrlVerification { challenge: String },
    Event(ChatEvent),
    /// A well-formed event the relay does not handle.
    Ignored(String),
}

/// Event types the relay acts on. Other types are not decoded.
const HANDLED_EVENTS: [&str; 3] = ["message", "reaction_added", "app_home_opened"];

/// Interaction types the relay acts on.
const HANDLED_INTERACTIONS: [&str; 2] = ["block_actions", "view_submission"];

fn bad_payload(what: &str, e: serde_json::Error) -> HandoverError {
    HandoverError::InvalidCommand(format!("malformed {what}: {e}"))
}

/// Wire name of a serde enum or newtype (`"file_share"`, `"home"`).
fn wire_name<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => Some(name),
        _ => None,
    }
}

fn type_of(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or_default()
}

/// Parses an Events API request body.
pub fn parse_events_body(body: &[u8]) -> Result<EventsRequest, HandoverError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| bad_payload("events body", e))?;

    if type_of(&value) == "event_callback" {
        let kind = value.get("event").map(type_of).unwrap_or_default();
        if !HANDLED_EVENTS.contains(&kind) {
            return Ok(EventsRequest::Ignored(format!("event type {kind}")));
        }
    }

    let push: SlackPushEvent = match serde_json::from_value(value) {
        Ok(push) => push,
        Err(e) => {
            warn!(error = %e, "undecodable events body");
            return Ok(EventsRequest::Ignored("undecodable body".into()));
        }
    };

    Ok(match push {
        SlackPushEvent::UrlVerification(verification) => EventsRequest::UrlVerification {
            challenge: verification.challenge,
        },
        SlackPushEvent::EventCallback(callback) => callback_event(callback.event),
        _ => EventsRequest::Ignored("envelope type".into()),
    })
}

fn callback_event(body: SlackEventCallbackBody) -> EventsRequest {
    match body {
        SlackEventCallbackBody::Message(event) => {
            EventsRequest::Event(ChatEvent::Message(channel_message(event)))
        }
        SlackEventCallbackBody::ReactionAdded(event) => match event.item {
            SlackReactionsItem::Message(item) => EventsRequest::Event(ChatEvent::ReactionAdded {
                user: event.user.0,
                reaction: event.reaction.0,
                channel: item.origin.channel.map(|c| c.0).unwrap_or_default(),
                item_ts: item.origin.ts.0,
                // Slack names the reacted message only; the router resolves its thread.
                thread_ts: None,
            }),
            _ => EventsRequest::Ignored("reaction on a file".into()),
        },
        SlackEventCallbackBody::AppHomeOpened(event) => match wire_name(&event.tab).as_deref() {
            None | Some("home") => EventsRequest::Event(ChatEvent::AppSurfaceOpened {
                user: event.user.0,
            }),
            Some(tab) => EventsRequest::Ignored(format!("app home tab {tab}")),
        },
        _ => EventsRequest::Ignored("event type".into()),
    }
}

fn channel_message(event: SlackMessageEvent) -> ChannelMessage {
    let (text, files) = match event.content {
        Some(content) => (
            content.text.unwrap_or_default(),
            content
                .files
                .unwrap_or_default()
                .into_iter()
                .map(chat_file)
                .collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    ChannelMessage {
        channel: event.origin.channel.map(|c| c.0).unwrap_or_default(),
        ts: event.origin.ts.0,
        thread_ts: event.origin.thread_ts.map(|t| t.0),
        user: event.sender.user.map(|u| u.0),
        bot_id: event.sender.bot_id.map(|b| b.0),
        subtype: event.subtype.as_ref().and_then(wire_name),
        text,
        files,
    }
}

fn chat_file(file: SlackFile) -> ChatFile {
    ChatFile {
        id: file.id.0,
        name: file.name.unwrap_or_default(),
        mimetype: file.mimetype.as_ref().and_then(wire_name).unwrap_or_default(),
        url_private: file
            .url_private
            .map(|url| url.to_string())
            .unwrap_or_default(),
    }
}

/// Parses the JSON carried in an interactivity request's `payload` field.
///
/// Returns `Ok(None)` for interaction types the relay does not handle.
/// Only the first action of a `block_actions` payload is used. Modal
/// input values are keyed by action id.
pub fn parse_interaction_payload(payload: &str) -> Result<Option<ChatEvent>, HandoverError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| bad_payload("interaction payload", e))?;
    let kind = type_of(&value);
    if !HANDLED_INTERACTIONS.contains(&kind) {
        debug!(%kind, "ignoring interaction");
        return Ok(None);
    }

    let interaction: SlackInteractionEvent =
        serde_json::from_value(value).map_err(|e| bad_payload("interaction payload", e))?;

    Ok(match interaction {
        SlackInteractionEvent::BlockActions(event) => button_clicked(event),
        SlackInteractionEvent::ViewSubmission(event) => Some(modal_submitted(event)),
        _ => None,
    })
}

fn button_clicked(event: SlackInteractionBlockActionsEvent) -> Option<ChatEvent> {
    let action = event.actions?.into_iter().next()?;
    let (message_ts, thread_ts) = match event.message {
        Some(message) => (
            Some(message.origin.ts.0),
            message.origin.thread_ts.map(|t| t.0),
        ),
        None => (None, None),
    };
    Some(ChatEvent::ButtonClicked {
        action_id: action.action_id.0,
        value: action.value.unwrap_or_default(),
        user: event.user.map(|u| u.id.0).unwrap_or_default(),
        channel: event.channel.map(|c| c.id.0),
        message_ts,
        thread_ts,
        trigger_id: event.trigger_id.0,
    })
}

fn modal_submitted(event: SlackInteractionViewSubmissionEvent) -> ChatEvent {
    let (callback_id, private_metadata) = match event.view.view {
        SlackView::Modal(modal) => (
            modal.callback_id.map(|c| c.0).unwrap_or_default(),
            modal.private_metadata.unwrap_or_default(),
        ),
        // Home tabs have no submit button.
        SlackView::Home(_) => (String::new(), String::new()),
    };

    let values: BTreeMap<String, FieldValue> = event
        .view
        .state_params
        .state
        .map(|state| state.values)
        .unwrap_or_default()
        .into_values()
        .flat_map(|inputs| inputs.into_iter())
        .map(|(action_id, state)| (action_id.0, field_value(state)))
        .collect();

    ChatEvent::ModalSubmitted {
        callback_id,
        private_metadata,
        user: event.user.id.0,
        values,
    }
}

fn field_value(state: SlackViewStateValue) -> FieldValue {
    if let Some(options) = state.selected_options {
        return FieldValue::Options(options.into_iter().map(|o| o.value).collect());
    }
    if let Some(option) = state.selected_option {
        return FieldValue::Options(vec![option.value]);
    }
    FieldValue::Text(state.value.unwrap_or_default())
}

/// Decodes a slash-command request body (`application/x-www-form-urlencoded`).
pub fn parse_slash_command(body: &str) -> Result<SlashCommand, HandoverError> {
    let event: SlackCommandEvent = serde_urlencoded::from_str(body)
        .map_err(|e| HandoverError::InvalidCommand(format!("malformed slash command: {e}")))?;
    Ok(slash_command(event))
}

pub fn slash_command(event: SlackCommandEvent) -> SlashCommand {
    SlashCommand {
        command: event.command.0,
        text: event.text.unwrap_or_default(),
        user: event.user_id.0,
        channel: event.channel_id.0,
    }
}
