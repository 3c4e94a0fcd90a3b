// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Every adapter extends the [`Adapter`] base trait and uses
//! `#[async_trait]` for dynamic dispatch compatibility, so components hold
//! them as `Arc<dyn Trait>` handles injected at startup.

pub mod adapter;
pub mod ai;
pub mod chat;
pub mod media;
pub mod store;

pub use adapter::Adapter;
pub use ai::AiPlatform;
pub use chat::ChatPlatform;
pub use media::MediaHost;
pub use store::{KvStore, KvWrite};
