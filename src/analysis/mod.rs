//! Analysis stage client.
//!
//! Single-call contract: the completed transcript, the recording's process
//! type, and the knowledge base go out in one request and the full
//! structured analysis comes back. No polling; the request blocks until the
//! service answers or the HTTP timeout fires.

mod http;

pub use http::HttpAnalysisService;

use crate::recording::CallAnalysis;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Default timeout for analysis requests. Generous because the service
/// scores the whole transcript in one shot.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur during the analysis stage
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Payload for one analysis call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub transcript: String,
    /// Omitted from the wire when the recording uses the default process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    pub knowledge_base: String,
}

/// Trait for services that score a finished transcript
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyze a transcript and return the structured scorecard
    async fn analyze(&self, request: &AnalysisRequest) -> Result<CallAnalysis, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_default_process_type() {
        let request = AnalysisRequest {
            transcript: "hello".to_string(),
            process_type: None,
            knowledge_base: "kb-1".to_string(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("process_type"));
        assert!(json.contains("knowledge_base"));
    }

    #[test]
    fn test_request_carries_custom_process_type() {
        let request = AnalysisRequest {
            transcript: "hello".to_string(),
            process_type: Some("discovery".to_string()),
            knowledge_base: "kb-1".to_string(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""process_type":"discovery""#));
    }
}
