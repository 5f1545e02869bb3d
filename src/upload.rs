//! Upload endpoint client.
//!
//! First network hop of the pipeline: ships the captured payload plus the
//! user-entered metadata to the backend, which mints the recording id. This
//! is the only call whose failure propagates synchronously to the submit
//! caller; everything after it is driven by the background stage chain.

use crate::recording::{Recording, RecordingRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

/// Default timeout for upload requests. Payloads can be tens of megabytes.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur during upload
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Accepts a finished payload + metadata and mints a new recording.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(
        &self,
        audio: &[u8],
        request: &RecordingRequest,
    ) -> Result<Recording, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// HTTP implementation of the upload endpoint.
pub struct HttpUploadService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpUploadService {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_UPLOAD_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a new service with a custom HTTP client
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl UploadService for HttpUploadService {
    async fn upload(
        &self,
        audio: &[u8],
        request: &RecordingRequest,
    ) -> Result<Recording, UploadError> {
        let part = multipart::Part::bytes(audio.to_vec())
            .file_name("recording.webm")
            .mime_str("audio/webm")
            .map_err(|e| UploadError::Api(format!("Failed to create multipart: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("owner_id", request.owner_id.clone())
            .text("client_name", request.client_name.clone())
            .text("meeting_date", request.meeting_date.to_string())
            .text("process_type", request.process_type.clone());

        let response = self
            .client
            .post(format!("{}/recordings", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploadError::Api(format!(
                "Upload error ({}): {}",
                status, error_text
            )));
        }

        let minted: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(format!("Bad upload payload: {}", e)))?;

        let mut recording = Recording::new(minted.id, request);
        if let Some(created_at) = minted.created_at {
            recording.created_at = created_at;
        }

        Ok(recording)
    }
}
