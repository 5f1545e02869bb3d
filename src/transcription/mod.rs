//! Transcription stage client.
//!
//! Two-call contract with the speech-to-text service: submit the payload
//! once and receive a job token, then poll the status endpoint on a fixed
//! interval until the service reports `completed` or `failed`, or the
//! attempt ceiling is reached. The ceiling produces a timeout error with
//! different text than a service-reported failure so the two are
//! distinguishable on the failed recording.

mod http;

pub use http::HttpTranscriptionService;

use crate::recording::TranscriptionRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Hard ceiling on status polls (120 x 3s = 6 minutes).
pub const MAX_POLL_ATTEMPTS: u32 = 120;

/// Errors that can occur during the transcription stage
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    /// The service itself reported the job failed.
    #[error("Transcription failed: {0}")]
    Failed(String),

    #[error("Transcription polling timed out after {attempts} attempts ({waited_secs}s)")]
    Timeout { attempts: u32, waited_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One status poll result. Wire shape is `{"status": ..., ...result}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptPoll {
    Pending,
    Completed {
        #[serde(flatten)]
        result: TranscriptionRecord,
    },
    Failed {
        #[serde(default)]
        error: String,
    },
}

/// Speech-to-text service: submit-then-poll.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Submit audio for transcription, returning a poll token.
    async fn submit(&self, audio: &[u8]) -> Result<String, TranscriptionError>;

    /// Check the status of a submitted job.
    async fn status(&self, token: &str) -> Result<TranscriptPoll, TranscriptionError>;
}

/// Poll timing knobs. Production uses the defaults; tests shrink the
/// interval without changing the attempt arithmetic.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// Poll on a flat interval until the job resolves.
///
/// A `failed` poll is propagated immediately without spending the remaining
/// attempts. Exhausting the ceiling yields [`TranscriptionError::Timeout`],
/// which carries different text than a service failure.
pub async fn poll_until_complete(
    service: &dyn TranscriptionService,
    token: &str,
    config: &PollConfig,
) -> Result<TranscriptionRecord, TranscriptionError> {
    for _attempt in 0..config.max_attempts {
        tokio::time::sleep(config.interval).await;

        match service.status(token).await? {
            TranscriptPoll::Pending => {}
            TranscriptPoll::Completed { result } => return Ok(result),
            TranscriptPoll::Failed { error } => {
                return Err(TranscriptionError::Failed(if error.is_empty() {
                    "service reported failure".to_string()
                } else {
                    error
                }))
            }
        }
    }

    Err(TranscriptionError::Timeout {
        attempts: config.max_attempts,
        waited_secs: config.interval.as_secs() * config.max_attempts as u64,
    })
}
