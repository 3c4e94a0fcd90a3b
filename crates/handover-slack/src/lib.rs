// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack integration for the Handover relay.
//!
//! [`SlackClient`] implements [`ChatPlatform`](handover_core::ChatPlatform)
//! over the Slack Web API using `slack-morphism`. The [`events`] module turns Events API bodies,
//! interactivity payloads and slash-command forms into domain events.

pub mod client;
pub mod events;

pub use client::SlackClient;
pub use events::{EventsRequest, parse_events_body, parse_interaction_payload, parse_slash_command};
