//! Recording pipeline orchestration: upload → transcription → analysis.
//!
//! `submit` is the single entry point for finished captures. Online
//! submissions upload synchronously (so the caller sees an immediate error
//! if the upload is rejected) and then chain transcription and analysis in a
//! background task. Offline submissions never touch the network: the payload
//! is parked in the durable queue and a placeholder record stands in until
//! the drainer replays it through this same entry point.
//!
//! Every stage transition is written through the dual-write store and
//! announced on the event sink. Failures inside the background chain are
//! converted to a `failed` record rather than propagated; once a recording
//! is past the initial upload, the only outcomes are `completed` or
//! `failed`.

use crate::analysis::{AnalysisRequest, AnalysisService};
use crate::connectivity::ConnectivityMonitor;
use crate::events::{EventSink, PipelineEvent};
use crate::queue::OfflineQueue;
use crate::recording::{
    ManagerReview, QueuedRecording, Recording, RecordingRequest, RecordingStatus,
};
use crate::store::RecordingStore;
use crate::transcription::{poll_until_complete, PollConfig, TranscriptionService};
use crate::upload::{UploadError, UploadService};
use chrono::Utc;
use std::sync::Arc;

/// Rubric applied when the capture layer leaves the process type blank.
pub const DEFAULT_PROCESS_TYPE: &str = "standard";

/// Replay attempts per queued recording before it is marked failed.
pub const MAX_REPLAY_ATTEMPTS: u32 = 3;

/// Errors surfaced by the synchronous part of pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Recording not found: {0}")]
    NotFound(String),
}

/// Configuration for the recording pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Knowledge-base context blob forwarded with every analysis call.
    pub knowledge_base: String,
    /// Rubric used when a request does not name one.
    pub default_process_type: String,
    /// Transcription poll timing.
    pub poll: PollConfig,
    /// Replay attempts per queued recording before the drainer gives up.
    pub max_replay_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            knowledge_base: String::new(),
            default_process_type: DEFAULT_PROCESS_TYPE.to_string(),
            poll: PollConfig::default(),
            max_replay_attempts: MAX_REPLAY_ATTEMPTS,
        }
    }
}

struct PipelineInner {
    upload: Arc<dyn UploadService>,
    transcription: Arc<dyn TranscriptionService>,
    analysis: Arc<dyn AnalysisService>,
    store: RecordingStore,
    queue: Arc<OfflineQueue>,
    connectivity: ConnectivityMonitor,
    events: Arc<dyn EventSink>,
    config: PipelineConfig,
}

impl PipelineInner {
    /// Emit the post-transition event pair: a human-readable progress line
    /// and the change notification UI observers refresh on.
    fn notify(&self, recording_id: &str, message: &str) {
        self.events.emit(PipelineEvent::Progress {
            recording_id: recording_id.to_string(),
            message: message.to_string(),
        });
        self.events.emit(PipelineEvent::RecordingsChanged);
    }

    /// Background stage chain for one uploaded recording. Errors are
    /// absorbed into a `failed` record; nothing escapes the task.
    async fn run_stages(self: Arc<Self>, mut recording: Recording, audio: Vec<u8>) {
        let id = recording.id.clone();

        // First dual write for this recording; submit only wrote the cache.
        self.store.save(&recording).await;

        match self.transcribe_and_analyze(&mut recording, &audio).await {
            Ok(()) => {
                log::info!("Pipeline: Recording {} completed", id);
            }
            Err(message) => {
                log::warn!("Pipeline: Recording {} failed: {}", id, message);
                recording.status = RecordingStatus::Failed;
                recording.analysis = None;
                recording.completed_at = None;
                recording.error = Some(message.clone());
                self.store.save(&recording).await;
                self.notify(&id, &format!("Failed: {}", message));
            }
        }
    }

    async fn transcribe_and_analyze(
        &self,
        recording: &mut Recording,
        audio: &[u8],
    ) -> Result<(), String> {
        // Transcription stage: one submit, then fixed-interval polling.
        let token = self
            .transcription
            .submit(audio)
            .await
            .map_err(|e| e.to_string())?;
        log::info!(
            "Pipeline: Recording {} transcription submitted, polling",
            recording.id
        );

        let transcript =
            poll_until_complete(self.transcription.as_ref(), &token, &self.config.poll)
                .await
                .map_err(|e| e.to_string())?;

        recording.transcription = Some(transcript);
        recording.status = RecordingStatus::Analyzing;
        self.store.save(recording).await;
        self.notify(&recording.id, "Transcription complete");

        // Analysis stage: a single call carrying transcript, rubric and
        // knowledge base. The rubric is omitted when it is the default.
        let process_type = if recording.process_type == self.config.default_process_type {
            None
        } else {
            Some(recording.process_type.clone())
        };
        let request = AnalysisRequest {
            transcript: recording
                .transcription
                .as_ref()
                .map(|t| t.text.clone())
                .unwrap_or_default(),
            process_type,
            knowledge_base: self.config.knowledge_base.clone(),
        };

        let analysis = self
            .analysis
            .analyze(&request)
            .await
            .map_err(|e| e.to_string())?;

        recording.analysis = Some(analysis);
        recording.status = RecordingStatus::Completed;
        recording.completed_at = Some(Utc::now());
        recording.error = None;
        self.store.save(recording).await;
        self.notify(&recording.id, "Analysis complete");

        Ok(())
    }
}

/// Clonable handle to the pipeline. Cheap to clone; all clones share the
/// same services, stores and configuration.
#[derive(Clone)]
pub struct RecordingPipeline {
    inner: Arc<PipelineInner>,
}

impl RecordingPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        upload: Arc<dyn UploadService>,
        transcription: Arc<dyn TranscriptionService>,
        analysis: Arc<dyn AnalysisService>,
        store: RecordingStore,
        queue: Arc<OfflineQueue>,
        connectivity: ConnectivityMonitor,
        events: Arc<dyn EventSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                upload,
                transcription,
                analysis,
                store,
                queue,
                connectivity,
                events,
                config,
            }),
        }
    }

    /// Submit a finished capture.
    ///
    /// Offline: the payload is enqueued, a queued placeholder is written to
    /// the local cache, and the placeholder is returned without any network
    /// call. Online: the upload happens synchronously (failures propagate to
    /// the caller and leave no record), then the remaining stages run in a
    /// background task and the `transcribing` record is returned.
    pub async fn submit(
        &self,
        audio: Vec<u8>,
        request: RecordingRequest,
    ) -> Result<Recording, PipelineError> {
        let request = normalize_request(request, &self.inner.config)?;
        if audio.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Audio payload is empty".to_string(),
            ));
        }

        if !self.inner.connectivity.is_online() {
            return self.submit_offline(audio, request);
        }

        let mut recording = self.inner.upload.upload(&audio, &request).await?;
        recording.status = RecordingStatus::Transcribing;
        // Cache write only; the stage task mirrors it to the remote store,
        // so a slow remote never delays the submit caller.
        self.inner.store.save_local_only(&recording);
        self.inner.notify(&recording.id, "Upload complete");
        log::info!(
            "Pipeline: Recording {} uploaded ({} bytes), starting stages",
            recording.id,
            audio.len()
        );

        let inner = self.inner.clone();
        tokio::spawn(inner.run_stages(recording.clone(), audio));

        Ok(recording)
    }

    fn submit_offline(
        &self,
        audio: Vec<u8>,
        request: RecordingRequest,
    ) -> Result<Recording, PipelineError> {
        let queued = QueuedRecording::new(audio, &request);
        let placeholder = Recording::queued_placeholder(&queued);

        self.inner.queue.enqueue(queued).map_err(PipelineError::Queue)?;
        self.inner.store.save_local_only(&placeholder);
        self.inner.notify(&placeholder.id, "Queued for upload");
        log::info!(
            "Pipeline: Offline, recording {} queued for replay",
            placeholder.id
        );

        Ok(placeholder)
    }

    /// List recordings for one owner, preferring the remote view.
    pub async fn recordings_for_owner(&self, owner_id: &str) -> Vec<Recording> {
        self.inner.store.load_for_owner(owner_id).await
    }

    /// Attach (or replace) the manager review on a completed recording.
    pub async fn attach_review(
        &self,
        recording_id: &str,
        review: ManagerReview,
    ) -> Result<Recording, PipelineError> {
        if !(1..=5).contains(&review.rating) {
            return Err(PipelineError::InvalidRequest(format!(
                "Review rating must be 1-5, got {}",
                review.rating
            )));
        }

        let mut recording = self
            .inner
            .store
            .cache()
            .get(recording_id)
            .ok_or_else(|| PipelineError::NotFound(recording_id.to_string()))?;

        if recording.status != RecordingStatus::Completed {
            return Err(PipelineError::InvalidRequest(
                "Reviews can only be attached to completed recordings".to_string(),
            ));
        }

        recording.review = Some(review);
        self.inner.store.save(&recording).await;
        self.inner.notify(recording_id, "Review attached");

        Ok(recording)
    }

    /// Delete a recording from the local view. A queued placeholder's
    /// payload is dropped from the offline queue as well, so the drainer
    /// does not resurrect it.
    pub fn delete_recording(&self, recording_id: &str) -> Result<(), PipelineError> {
        if self.inner.queue.get(recording_id).is_some() {
            if let Err(e) = self.inner.queue.remove(recording_id) {
                log::warn!(
                    "Pipeline: Failed to drop queue entry {}: {}",
                    recording_id,
                    e
                );
            }
        }

        if self.inner.store.remove_local(recording_id) {
            self.inner.events.emit(PipelineEvent::RecordingsChanged);
            log::info!("Pipeline: Recording {} deleted", recording_id);
            Ok(())
        } else {
            Err(PipelineError::NotFound(recording_id.to_string()))
        }
    }

    pub fn store(&self) -> &RecordingStore {
        &self.inner.store
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.inner.queue
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.inner.events
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }
}

fn normalize_request(
    mut request: RecordingRequest,
    config: &PipelineConfig,
) -> Result<RecordingRequest, PipelineError> {
    request.client_name = request.client_name.trim().to_string();
    if request.client_name.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "Client name is required".to_string(),
        ));
    }
    if request.owner_id.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "Owner id is required".to_string(),
        ));
    }

    let process_type = request.process_type.trim();
    request.process_type = if process_type.is_empty() {
        config.default_process_type.clone()
    } else {
        process_type.to_string()
    };

    Ok(request)
}
