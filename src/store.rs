//! Dual-write persistence adapter.
//!
//! Every stage transition lands in the local cache synchronously and in the
//! remote store best-effort. Remote failures are logged, never surfaced, and
//! never roll back the local write; the next transition re-attempts the
//! remote upsert, and upserts keyed by id make those retries idempotent.
//! Reads prefer the remote store when it answers with a non-empty list for
//! the owner (refreshing the cache mirror on the way through) and fall back
//! to the cache otherwise, so a device holding not-yet-synced work still
//! sees it when the remote call fails.

use crate::cache::LocalCache;
use crate::recording::Recording;
use crate::remote::RemoteStore;
use std::sync::Arc;

/// Single write/read path shared by the pipeline and the drainer.
#[derive(Clone)]
pub struct RecordingStore {
    cache: Arc<LocalCache>,
    remote: Arc<dyn RemoteStore>,
}

impl RecordingStore {
    pub fn new(cache: Arc<LocalCache>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { cache, remote }
    }

    /// Write local, then best-effort remote.
    pub async fn save(&self, recording: &Recording) {
        if let Err(e) = self.cache.upsert(recording.clone()) {
            log::warn!("Store: cache write failed for {}: {}", recording.id, e);
        }

        if let Err(e) = self.remote.upsert(recording).await {
            log::warn!("Store: remote upsert failed for {}: {}", recording.id, e);
        }
    }

    /// Write to the local cache only. Used for offline placeholders, which
    /// never reach the remote store.
    pub fn save_local_only(&self, recording: &Recording) {
        if let Err(e) = self.cache.upsert(recording.clone()) {
            log::warn!("Store: cache write failed for {}: {}", recording.id, e);
        }
    }

    /// Read remote, fall back to local.
    ///
    /// A non-empty remote answer refreshes the cache mirror and is returned
    /// newest-first. An empty or failed remote read serves the cache view.
    pub async fn load_for_owner(&self, owner_id: &str) -> Vec<Recording> {
        match self.remote.fetch_for_owner(owner_id).await {
            Ok(remote) if !remote.is_empty() => {
                for recording in &remote {
                    if let Err(e) = self.cache.upsert(recording.clone()) {
                        log::warn!("Store: cache refresh failed for {}: {}", recording.id, e);
                    }
                }
                let mut recordings = remote;
                recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                recordings
            }
            Ok(_) => self.cache.for_owner(owner_id),
            Err(e) => {
                log::warn!(
                    "Store: remote fetch failed for owner {}, serving cache: {}",
                    owner_id,
                    e
                );
                self.cache.for_owner(owner_id)
            }
        }
    }

    /// Remove a recording from the local cache. The remote store keeps its
    /// copy; there is no remote delete in the store contract.
    pub fn remove_local(&self, id: &str) -> bool {
        match self.cache.remove(id) {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Store: cache removal failed for {}: {}", id, e);
                false
            }
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordingRequest, RecordingStatus};
    use crate::remote::RemoteStoreError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MockRemote {
        recordings: Mutex<Vec<Recording>>,
        fail: AtomicBool,
        upserts: AtomicU32,
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn upsert(&self, recording: &Recording) -> Result<(), RemoteStoreError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteStoreError::Api("remote down".to_string()));
            }
            let mut recordings = self.recordings.lock().unwrap();
            if let Some(existing) = recordings.iter_mut().find(|r| r.id == recording.id) {
                *existing = recording.clone();
            } else {
                recordings.push(recording.clone());
            }
            Ok(())
        }

        async fn fetch_for_owner(&self, owner_id: &str) -> Result<Vec<Recording>, RemoteStoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteStoreError::Api("remote down".to_string()));
            }
            Ok(self
                .recordings
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.owner_id == owner_id)
                .cloned()
                .collect())
        }
    }

    fn recording(id: &str, owner: &str) -> Recording {
        Recording::new(
            id.to_string(),
            &RecordingRequest {
                owner_id: owner.to_string(),
                client_name: "Acme".to_string(),
                meeting_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
                process_type: "standard".to_string(),
            },
        )
    }

    fn store(dir: &tempfile::TempDir, remote: Arc<MockRemote>) -> RecordingStore {
        let cache = Arc::new(LocalCache::new(dir.path().to_path_buf()));
        RecordingStore::new(cache, remote)
    }

    #[tokio::test]
    async fn test_save_writes_both_sides() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        let store = store(&dir, remote.clone());

        store.save(&recording("rec-1", "user-1")).await;

        assert!(store.cache().get("rec-1").is_some());
        assert_eq!(remote.recordings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_write() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        remote.fail.store(true, Ordering::SeqCst);
        let store = store(&dir, remote.clone());

        store.save(&recording("rec-1", "user-1")).await;

        // Local view survives; a read served from cache still shows it.
        assert!(store.cache().get("rec-1").is_some());
        let listed = store.load_for_owner("user-1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "rec-1");
    }

    #[tokio::test]
    async fn test_repeated_save_is_idempotent_upsert() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        let store = store(&dir, remote.clone());

        let mut rec = recording("rec-1", "user-1");
        store.save(&rec).await;
        rec.status = RecordingStatus::Transcribing;
        store.save(&rec).await;
        store.save(&rec).await;

        let remote_recordings = remote.recordings.lock().unwrap();
        assert_eq!(remote_recordings.len(), 1);
        assert_eq!(remote_recordings[0].status, RecordingStatus::Transcribing);
        assert_eq!(store.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_load_prefers_remote_and_refreshes_cache() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        remote
            .recordings
            .lock()
            .unwrap()
            .push(recording("rec-remote", "user-1"));
        let store = store(&dir, remote);

        let listed = store.load_for_owner("user-1").await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "rec-remote");
        // Mirror refreshed for the next offline read.
        assert!(store.cache().get("rec-remote").is_some());
    }

    #[tokio::test]
    async fn test_load_falls_back_to_cache_when_remote_empty() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        let store = store(&dir, remote);

        store.save_local_only(&recording("rec-local", "user-1"));

        let listed = store.load_for_owner("user-1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "rec-local");
    }

    #[tokio::test]
    async fn test_remove_local_reports_false_when_cache_removal_fails() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        let store = store(&dir, remote);
        store.save_local_only(&recording("rec-1", "user-1"));

        // Break the cache file so the removal flush fails.
        let file = dir.path().join("recordings_cache.json");
        std::fs::remove_file(&file).unwrap();
        std::fs::create_dir(&file).unwrap();

        assert!(!store.remove_local("rec-1"));
    }

    #[tokio::test]
    async fn test_save_local_only_never_touches_remote() {
        let dir = tempdir().unwrap();
        let remote = Arc::new(MockRemote::default());
        let store = store(&dir, remote.clone());

        store.save_local_only(&recording("rec-1", "user-1"));

        assert_eq!(remote.upserts.load(Ordering::SeqCst), 0);
    }
}
