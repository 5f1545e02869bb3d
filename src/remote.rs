//! Remote authoritative store client.
//!
//! The backend datastore is the source of truth once a recording has synced.
//! Its contract is deliberately small: upsert-by-id (idempotent, so the
//! at-least-once write path can repeat safely) and query-by-owner. Change
//! notifications from the backend are consumed by UI observers directly and
//! never feed back into this crate's write path.

use crate::recording::Recording;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Default timeout for remote store requests
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur talking to the remote store
#[derive(Debug, thiserror::Error)]
pub enum RemoteStoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Backend recording store: upsert-by-id writes, query-by-owner reads.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write a recording keyed by its id. Repeating the same write must be
    /// a no-op on the backend.
    async fn upsert(&self, recording: &Recording) -> Result<(), RemoteStoreError>;

    /// All recordings belonging to one owner.
    async fn fetch_for_owner(&self, owner_id: &str) -> Result<Vec<Recording>, RemoteStoreError>;
}

/// HTTP implementation of the remote store contract.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRemoteStore {
    /// Create a new store client.
    ///
    /// # Arguments
    /// * `base_url` - e.g. "https://api.example.com/v1"
    /// * `api_key` - bearer token for the backend
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_STORE_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a new store client with a custom HTTP client.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_client(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upsert(&self, recording: &Recording) -> Result<(), RemoteStoreError> {
        let url = format!("{}/recordings/{}", self.base_url, recording.id);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .json(recording)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteStoreError::Api(format!(
                "Store upsert error ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }

    async fn fetch_for_owner(&self, owner_id: &str) -> Result<Vec<Recording>, RemoteStoreError> {
        let url = format!("{}/recordings", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("owner_id", owner_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteStoreError::Api(format!(
                "Store query error ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<Vec<Recording>>()
            .await
            .map_err(|e| RemoteStoreError::InvalidResponse(format!("Bad store payload: {}", e)))
    }
}
