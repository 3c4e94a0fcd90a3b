// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Handover integration tests.
//!
//! Provides mock collaborators and a test harness for fast, deterministic
//! tests without a chat workspace, an AI platform or a Redis server.
//!
//! # Components
//!
//! - [`MockChatPlatform`] - captures posts, updates, modals and views
//! - [`MockAiPlatform`] - records outbound messages, disconnects and notifications
//! - [`MockMediaHost`] - returns predictable public URLs
//! - [`TestHarness`] - a relay wired to all of the above

pub mod harness;
pub mod mock_ai;
pub mod mock_chat;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_ai::{MockAiPlatform, MockMediaHost};
pub use mock_chat::MockChatPlatform;
