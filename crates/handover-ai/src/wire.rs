// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request bodies received from the AI platform.
//!
//! The start-escalation body is [`EscalationRequest`](handover_core::types::EscalationRequest).

use handover_core::types::MessagePayload;
use handover_core::{CollaboratorKind, HandoverError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message types the support thread can render.
const RENDERABLE_TYPES: [&str; 4] = ["text", "image", "video", "audio"];

/// A customer message forwarded during a live-agent handoff.
///
/// The payload fields sit beside `session_id`:
/// `{"session_id": "abc-123", "type": "text", "text": "Hi"}`. They are kept
/// raw so a message of an unknown type still identifies its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl CustomerMessage {
    /// The `type` field, or `"unknown"` when absent.
    pub fn message_type(&self) -> &str {
        self.body
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    /// Decodes the payload.
    ///
    /// Types other than text, image, video and audio are
    /// [`HandoverError::UnsupportedMediaKind`].
    pub fn payload(&self) -> Result<MessagePayload, HandoverError> {
        let kind = self.message_type();
        if !RENDERABLE_TYPES.contains(&kind) {
            return Err(HandoverError::UnsupportedMediaKind(kind.to_string()));
        }
        serde_json::from_value(Value::Object(self.body.clone())).map_err(|e| {
            HandoverError::collaborator(
                CollaboratorKind::Ai,
                format!("malformed {kind} message: {e}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> CustomerMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn flattened_payload_deserializes() {
        let msg = parse(r#"{"session_id": "abc-123", "type": "audio", "url": "https://cdn/a.ogg"}"#);
        assert_eq!(msg.session_id, "abc-123");
        assert_eq!(
            msg.payload().unwrap(),
            MessagePayload::Audio {
                url: "https://cdn/a.ogg".into()
            }
        );
    }

    #[test]
    fn unknown_message_type_keeps_its_session() {
        let msg = parse(r#"{"session_id": "s", "type": "document", "url": "https://x/a.pdf"}"#);
        assert_eq!(msg.session_id, "s");
        assert_eq!(msg.message_type(), "document");
        assert!(matches!(
            msg.payload(),
            Err(HandoverError::UnsupportedMediaKind(kind)) if kind == "document"
        ));
    }

    #[test]
    fn missing_type_is_unsupported() {
        let msg = parse(r#"{"session_id": "s", "text": "hi"}"#);
        assert!(matches!(
            msg.payload(),
            Err(HandoverError::UnsupportedMediaKind(kind)) if kind == "unknown"
        ));
    }

    #[test]
    fn known_type_with_missing_fields_is_malformed() {
        let msg = parse(r#"{"session_id": "s", "type": "image"}"#);
        assert!(matches!(
            msg.payload(),
            Err(HandoverError::Collaborator { kind: CollaboratorKind::Ai, .. })
        ));
    }
}
