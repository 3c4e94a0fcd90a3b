// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Handover relay.
//!
//! This crate provides the error type, the domain records shared by every
//! component (sessions, contacts, inbound chat events, outbound payloads),
//! and the adapter traits for the key-value store and the three external
//! collaborators: the chat platform, the conversational-AI platform, and
//! the media host.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CollaboratorKind, HandoverError};
pub use types::{AdapterType, Contact, HealthStatus, MediaKind, Session};

// Re-export all adapter traits at crate root.
pub use traits::{Adapter, AiPlatform, ChatPlatform, KvStore, KvWrite, MediaHost};
