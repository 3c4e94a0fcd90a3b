// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event router for the Handover relay.
//!
//! [`Relay`] receives escalation calls from the AI platform and events from
//! the chat platform, and coordinates the session registry, the directories,
//! the reminder timers and the outbound collaborators. Administrative slash
//! commands, contact modals and the broadcast flow hang off the same type.

pub mod ack;
pub mod admin;
pub mod blocks;
pub mod broadcast;
pub mod commands;
pub mod relay;
pub mod reminders;
pub mod templates;

pub use ack::{AckStatus, RelayAck};
pub use broadcast::{BroadcastDraft, BroadcastReport};
pub use commands::AdminCommand;
pub use relay::{Relay, RelaySettings};
pub use reminders::BusyNotifier;
