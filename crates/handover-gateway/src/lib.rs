// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook gateway for the Handover relay.
//!
//! One axum server receives both sides of the conversation: escalation and
//! customer-message calls from the AI platform, and the Events API,
//! interactivity and slash-command requests from Slack.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, router, start_server};
