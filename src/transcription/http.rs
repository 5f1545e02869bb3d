//! HTTP transcription service client.

use super::{TranscriptPoll, TranscriptionError, TranscriptionService};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the hosted transcription service
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    token: String,
}

impl HttpTranscriptionService {
    /// Create a new transcription client
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. "https://api.example.com/v1"
    /// * `api_key` - Bearer token for the service
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a client with a custom HTTP client
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
impl TranscriptionService for HttpTranscriptionService {
    async fn submit(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let part = multipart::Part::bytes(audio.to_vec())
            .file_name("recording.webm")
            .mime_str("audio/webm")
            .map_err(|e| {
                TranscriptionError::InvalidResponse(format!("Failed to create multipart: {}", e))
            })?;

        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/transcriptions", self.base_url))
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
            return Err(TranscriptionError::Api(format!(
                "Transcription API error ({}): {}",
                status, error_text
            )));
        }

        let result: SubmitResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;

        if result.token.is_empty() {
            return Err(TranscriptionError::InvalidResponse(
                "Submit response carried an empty job token".to_string(),
            ));
        }

        Ok(result.token)
    }

    async fn status(&self, token: &str) -> Result<TranscriptPoll, TranscriptionError> {
        let response = self
            .client
            .get(format!("{}/transcriptions/{}", self.base_url, token))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscriptionError::Api(format!(
                "Transcription API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))
    }
}
