// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Handover relay.

use strum::Display;
use thiserror::Error;

/// Which external collaborator a failed call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CollaboratorKind {
    /// The chat platform hosting agent threads.
    Chat,
    /// The conversational-AI platform fronting the customer channel.
    Ai,
    /// The media host used to publish agent attachments.
    Media,
}

/// The primary error type used across all Handover components.
///
/// Internal components raise these; only the event router translates them
/// into boundary acknowledgements.
#[derive(Debug, Error)]
pub enum HandoverError {
    /// Configuration errors (missing credentials, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store errors (connection failure, command failure, bad payload).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A session, thread, or contact lookup missed.
    ///
    /// Always recoverable: callers respond with a no-op or a soft warning.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A session with this id is already open.
    #[error("session already exists: {0}")]
    DuplicateSession(String),

    /// A chat-platform, AI-platform, or media-host call failed.
    #[error("{kind} collaborator error: {message}")]
    Collaborator {
        kind: CollaboratorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The media type cannot be forwarded to the customer channel.
    #[error("unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    /// An administrative command could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandoverError {
    /// Builds a [`HandoverError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Builds a [`HandoverError::Collaborator`] without an underlying source.
    pub fn collaborator(kind: CollaboratorKind, message: impl Into<String>) -> Self {
        Self::Collaborator {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a store-level failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns `true` for lookup misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for HandoverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_error_names_the_service() {
        let err = HandoverError::collaborator(CollaboratorKind::Ai, "502 bad gateway");
        assert_eq!(err.to_string(), "ai collaborator error: 502 bad gateway");
    }

    #[test]
    fn not_found_is_recognised() {
        let err = HandoverError::not_found("thread", "1700000000.000100");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "thread not found: 1700000000.000100");
        assert!(!HandoverError::Internal("x".into()).is_not_found());
    }

    #[test]
    fn json_errors_become_storage_errors() {
        let err: HandoverError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, HandoverError::Storage { .. }));
    }
}
