// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media host client.
//!
//! Agent attachments are private to the chat workspace, so they are
//! re-published on a media host whose URLs the customer channel can fetch.
//! The upload endpoint follows the unsigned multipart convention used by
//! common image CDNs: a `file` part, an optional `upload_preset` field, and
//! a JSON reply carrying `secure_url` (or `url`).

use std::time::Duration;

use async_trait::async_trait;
use handover_config::model::MediaConfig;
use handover_core::{
    Adapter, AdapterType, CollaboratorKind, HandoverError, HealthStatus, MediaHost, MediaKind,
};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn media_error(message: impl Into<String>) -> HandoverError {
    HandoverError::collaborator(CollaboratorKind::Media, message)
}

/// Multipart upload client for the configured media host.
#[derive(Debug, Clone)]
pub struct HttpMediaHost {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: Option<String>,
    api_key: Option<String>,
}

impl HttpMediaHost {
    pub fn new(config: &MediaConfig) -> Result<Self, HandoverError> {
        let upload_url = config.upload_url.trim();
        if !(upload_url.starts_with("http://") || upload_url.starts_with("https://")) {
            return Err(HandoverError::Config(format!(
                "media.upload_url `{upload_url}` must be an http(s) url"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| HandoverError::Config(format!("failed to build media client: {e}")))?;

        Ok(Self {
            http,
            upload_url: upload_url.to_string(),
            upload_preset: config.upload_preset.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Upload endpoint for `kind`; `{kind}` in the configured URL is substituted.
    fn endpoint(&self, kind: MediaKind) -> String {
        self.upload_url.replace("{kind}", &kind.to_string())
    }
}

#[async_trait]
impl Adapter for HttpMediaHost {
    fn name(&self) -> &str {
        "media-host"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Media
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        // Uploads are the only operation; there is nothing cheaper to probe.
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        kind: MediaKind,
        file_name: &str,
    ) -> Result<String, HandoverError> {
        let size = bytes.len();
        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let mut request = self.http.post(self.endpoint(kind)).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| HandoverError::Collaborator {
            kind: CollaboratorKind::Media,
            message: format!("upload request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%kind, %status, "media upload rejected");
            return Err(media_error(format!("upload returned {status}: {body}")));
        }

        let reply: UploadResponse = response
            .json()
            .await
            .map_err(|e| media_error(format!("unreadable upload response: {e}")))?;
        let url = reply
            .secure_url
            .or(reply.url)
            .ok_or_else(|| media_error("upload response carried no url"))?;

        info!(%kind, size, "media uploaded");
        Ok(url)
    }
}
