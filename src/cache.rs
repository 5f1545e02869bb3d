//! Fast local cache of recordings.
//!
//! Synchronous, reload-surviving mirror of every recording this device knows
//! about, keyed by id. The cache exists for instant UI reads and as the
//! offline fallback; the remote store stays authoritative, so losing this
//! file is a latency regression, not data loss.

use crate::recording::{Recording, RecordingStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// On-disk shape of the cache file.
#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
struct CacheData {
    recordings: Vec<Recording>,
}

/// Manages loading and saving of the local recording cache.
pub struct LocalCache {
    data: RwLock<CacheData>,
    file_path: PathBuf,
}

impl LocalCache {
    /// Create a cache backed by `<app_data_dir>/recordings_cache.json`.
    pub fn new(app_data_dir: PathBuf) -> Self {
        let file_path = app_data_dir.join("recordings_cache.json");

        if let Some(parent) = file_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let data = Self::load_from_file(&file_path).unwrap_or_default();

        Self {
            data: RwLock::new(data),
            file_path,
        }
    }

    fn load_from_file(file_path: &PathBuf) -> Option<CacheData> {
        let content = fs::read_to_string(file_path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Flush the current state to disk.
    fn save(&self) -> Result<(), String> {
        let data = self
            .data
            .read()
            .map_err(|e| format!("Failed to read cache: {}", e))?;

        let content = serde_json::to_string_pretty(&*data)
            .map_err(|e| format!("Failed to serialize cache: {}", e))?;

        fs::write(&self.file_path, content)
            .map_err(|e| format!("Failed to write cache file: {}", e))?;

        Ok(())
    }

    /// Insert or replace a recording by id. The in-memory view is updated
    /// unconditionally; an `Err` only means the disk flush failed.
    pub fn upsert(&self, recording: Recording) -> Result<(), String> {
        {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write cache: {}", e))?;

            if let Some(existing) = data
                .recordings
                .iter_mut()
                .find(|r| r.id == recording.id)
            {
                *existing = recording;
            } else {
                // Newest first.
                data.recordings.insert(0, recording);
            }
        }
        self.save()
    }

    pub fn get(&self, id: &str) -> Option<Recording> {
        let data = self.data.read().ok()?;
        data.recordings.iter().find(|r| r.id == id).cloned()
    }

    /// Delete a recording by id. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, String> {
        let removed = {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write cache: {}", e))?;

            let initial_len = data.recordings.len();
            data.recordings.retain(|r| r.id != id);
            data.recordings.len() < initial_len
        };

        if removed {
            self.save()?;
        }

        Ok(removed)
    }

    /// All cached recordings, newest first.
    pub fn all(&self) -> Vec<Recording> {
        self.data
            .read()
            .map(|data| data.recordings.clone())
            .unwrap_or_default()
    }

    /// Recordings owned by one user, newest first.
    pub fn for_owner(&self, owner_id: &str) -> Vec<Recording> {
        self.data
            .read()
            .map(|data| {
                data.recordings
                    .iter()
                    .filter(|r| r.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Completed recordings across every known user. Read-side input for the
    /// leaderboard.
    pub fn completed(&self) -> Vec<Recording> {
        self.data
            .read()
            .map(|data| {
                data.recordings
                    .iter()
                    .filter(|r| r.status == RecordingStatus::Completed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.recordings.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached recording.
    pub fn clear(&self) -> Result<(), String> {
        {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write cache: {}", e))?;
            data.recordings.clear();
        }
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRequest;
    use chrono::NaiveDate;

    fn request(owner: &str) -> RecordingRequest {
        RecordingRequest {
            owner_id: owner.to_string(),
            client_name: "Acme".to_string(),
            meeting_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            process_type: "standard".to_string(),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        let rec = Recording::new("rec-1".to_string(), &request("user-1"));
        cache.upsert(rec.clone()).unwrap();

        assert_eq!(cache.get("rec-1"), Some(rec));
        assert!(cache.get("rec-2").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        let mut rec = Recording::new("rec-1".to_string(), &request("user-1"));
        cache.upsert(rec.clone()).unwrap();

        rec.status = RecordingStatus::Transcribing;
        cache.upsert(rec.clone()).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("rec-1").unwrap().status,
            RecordingStatus::Transcribing
        );
    }

    #[test]
    fn test_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = LocalCache::new(dir.path().to_path_buf());
            cache
                .upsert(Recording::new("rec-1".to_string(), &request("user-1")))
                .unwrap();
        }

        let reloaded = LocalCache::new(dir.path().to_path_buf());
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get("rec-1").is_some());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        cache
            .upsert(Recording::new("rec-1".to_string(), &request("user-1")))
            .unwrap();

        assert!(cache.remove("rec-1").unwrap());
        assert!(!cache.remove("rec-1").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_for_owner_filters() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        cache
            .upsert(Recording::new("a".to_string(), &request("user-1")))
            .unwrap();
        cache
            .upsert(Recording::new("b".to_string(), &request("user-2")))
            .unwrap();

        let mine = cache.for_owner("user-1");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "a");
        assert_eq!(cache.all().len(), 2);
    }

    #[test]
    fn test_clear_empties_cache_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        cache
            .upsert(Recording::new("rec-1".to_string(), &request("user-1")))
            .unwrap();
        cache.clear().unwrap();

        assert!(cache.is_empty());
        let reloaded = LocalCache::new(dir.path().to_path_buf());
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_completed_filters_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf());

        let mut done = Recording::new("a".to_string(), &request("user-1"));
        done.status = RecordingStatus::Completed;
        cache.upsert(done).unwrap();
        cache
            .upsert(Recording::new("b".to_string(), &request("user-1")))
            .unwrap();

        let completed = cache.completed();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "a");
    }
}
