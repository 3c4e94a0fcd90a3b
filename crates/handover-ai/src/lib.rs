// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the conversational-AI platform that fronts the WhatsApp
//! customer, plus the request bodies the platform sends to the relay.

pub mod client;
pub mod wire;

pub use client::AiClient;
pub use wire::CustomerMessage;
