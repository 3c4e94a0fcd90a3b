// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Acknowledgements returned to the AI platform's webhook calls.

use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AckStatus {
    Ok,
    /// Nothing was done, but the caller should carry on.
    Warning,
    /// A collaborator failed; the caller should still not retry.
    Error,
}

/// Body of every boundary response. Always delivered with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayAck {
    pub status: AckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl RelayAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(AckStatus::Ok, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AckStatus::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AckStatus::Error, message)
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    fn new(status: AckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            thread_id: None,
        }
    }
}
