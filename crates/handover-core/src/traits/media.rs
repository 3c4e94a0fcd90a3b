// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media host collaborator trait.

use async_trait::async_trait;

use crate::error::HandoverError;
use crate::traits::adapter::Adapter;
use crate::types::MediaKind;

/// Publishes agent attachments at a URL the customer channel can fetch.
#[async_trait]
pub trait MediaHost: Adapter {
    /// Uploads `bytes` and returns the public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        kind: MediaKind,
        file_name: &str,
    ) -> Result<String, HandoverError>;
}
