//! Durable offline queue.
//!
//! Reload-surviving store for recordings captured while the device had no
//! network. Items keep their raw audio payload (base64 in the JSON file) so
//! the drainer can replay the original submit once connectivity returns.
//! Strict FIFO: replay order is capture order.

use crate::recording::QueuedRecording;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
struct QueueData {
    items: Vec<QueuedRecording>,
}

/// Manages loading and saving of the offline submission queue.
pub struct OfflineQueue {
    data: RwLock<QueueData>,
    file_path: PathBuf,
}

impl OfflineQueue {
    /// Create a queue backed by `<app_data_dir>/offline_queue.json`.
    pub fn new(app_data_dir: PathBuf) -> Self {
        let file_path = app_data_dir.join("offline_queue.json");

        if let Some(parent) = file_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let data = Self::load_from_file(&file_path).unwrap_or_default();

        Self {
            data: RwLock::new(data),
            file_path,
        }
    }

    fn load_from_file(file_path: &PathBuf) -> Option<QueueData> {
        let content = fs::read_to_string(file_path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn save(&self) -> Result<(), String> {
        let data = self
            .data
            .read()
            .map_err(|e| format!("Failed to read queue: {}", e))?;

        let content = serde_json::to_string_pretty(&*data)
            .map_err(|e| format!("Failed to serialize queue: {}", e))?;

        fs::write(&self.file_path, content)
            .map_err(|e| format!("Failed to write queue file: {}", e))?;

        Ok(())
    }

    /// Append an item at the back of the queue.
    pub fn enqueue(&self, item: QueuedRecording) -> Result<(), String> {
        if item.id.trim().is_empty() {
            return Err("Cannot queue recording: empty id".to_string());
        }
        if item.audio.is_empty() {
            return Err("Cannot queue recording: empty audio".to_string());
        }

        {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write queue: {}", e))?;
            data.items.push(item);
        }
        self.save()
    }

    /// Snapshot of the queue in replay (FIFO) order.
    pub fn all(&self) -> Vec<QueuedRecording> {
        self.data
            .read()
            .map(|data| data.items.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<QueuedRecording> {
        let data = self.data.read().ok()?;
        data.items.iter().find(|i| i.id == id).cloned()
    }

    /// Remove an item by id. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, String> {
        let removed = {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write queue: {}", e))?;

            let initial_len = data.items.len();
            data.items.retain(|i| i.id != id);
            data.items.len() < initial_len
        };

        if removed {
            self.save()?;
        }

        Ok(removed)
    }

    /// Record a failed replay: bump the attempt counter and store the error.
    /// Returns the new attempt count, or `None` if the id is unknown.
    pub fn record_attempt(&self, id: &str, error: &str) -> Result<Option<u32>, String> {
        let attempts = {
            let mut data = self
                .data
                .write()
                .map_err(|e| format!("Failed to write queue: {}", e))?;

            match data.items.iter_mut().find(|i| i.id == id) {
                Some(item) => {
                    item.attempts += 1;
                    item.last_error = Some(error.to_string());
                    Some(item.attempts)
                }
                None => None,
            }
        };

        if attempts.is_some() {
            self.save()?;
        }

        Ok(attempts)
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
