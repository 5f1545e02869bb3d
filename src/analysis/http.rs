//! HTTP analysis service client.

use super::{AnalysisError, AnalysisRequest, AnalysisService, DEFAULT_ANALYSIS_TIMEOUT};
use crate::recording::CallAnalysis;
use async_trait::async_trait;

/// Client for the hosted call-analysis service
pub struct HttpAnalysisService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAnalysisService {
    /// Create a new analysis client
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. "https://api.example.com/v1"
    /// * `api_key` - Bearer token for the service
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_ANALYSIS_TIMEOUT)
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
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<CallAnalysis, AnalysisError> {
        let response = self
            .client
            .post(format!("{}/analyses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisError::Api(format!(
                "Analysis API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let service =
            HttpAnalysisService::new("https://api.example.com/v1/".to_string(), "k".into());
        assert_eq!(service.base_url, "https://api.example.com/v1");
    }
}
