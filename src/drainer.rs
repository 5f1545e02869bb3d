//! Offline queue drainer.
//!
//! Watches the connectivity signal and, on every offline→online transition,
//! replays queued recordings through the pipeline's normal `submit` path in
//! FIFO order, strictly one at a time. There is no backoff between passes;
//! each online transition is itself the retry signal. A queued recording
//! that fails its third replay is dropped from the queue and left in the
//! cache as a `failed` record naming the attempt count.

use crate::events::{EventSink, PipelineEvent};
use crate::pipeline::RecordingPipeline;
use crate::recording::{QueuedRecording, Recording, RecordingStatus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to the background drain task.
pub struct DrainerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DrainerHandle {
    /// Stop the watch task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Replays offline-queued recordings when connectivity returns.
pub struct OfflineDrainer {
    pipeline: RecordingPipeline,
}

impl OfflineDrainer {
    pub fn new(pipeline: RecordingPipeline) -> Self {
        Self { pipeline }
    }

    /// Start the background watch task. Runs an immediate pass if the
    /// device is already online with queued work, then drains again on
    /// every offline→online transition until shut down.
    pub fn spawn(self) -> DrainerHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Self::run(self.pipeline, cancel.clone()));
        DrainerHandle { cancel, task }
    }

    async fn run(pipeline: RecordingPipeline, cancel: CancellationToken) {
        let mut online_rx = pipeline.connectivity().subscribe();

        if pipeline.connectivity().is_online() && !pipeline.queue().is_empty() {
            Self::drain(&pipeline).await;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Drainer: Shutting down");
                    break;
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        // Connectivity monitor dropped; nothing left to watch.
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online {
                        Self::drain(&pipeline).await;
                    }
                }
            }
        }
    }

    /// One replay pass over the queue, FIFO, one in flight at a time.
    /// Stops early if connectivity drops mid-pass.
    async fn drain(pipeline: &RecordingPipeline) {
        let queued = pipeline.queue().all();
        if queued.is_empty() {
            return;
        }
        log::info!("Drainer: Replaying {} queued recording(s)", queued.len());

        for snapshot in queued {
            if !pipeline.connectivity().is_online() {
                log::info!("Drainer: Connectivity dropped, stopping replay pass");
                break;
            }

            // The item may have been deleted since the pass started.
            let Some(item) = pipeline.queue().get(&snapshot.id) else {
                continue;
            };

            // Remove the stale placeholder before the attempt so a
            // successful replay's fresh record never coexists with it.
            pipeline.store().remove_local(&item.id);

            match pipeline.submit(item.audio.clone(), item.request()).await {
                Ok(recording) if recording.is_queued_placeholder() => {
                    // Connectivity dropped between the check and the call;
                    // submit parked the payload again under a fresh id.
                    Self::restore_requeued(pipeline, &item, &recording.id);
                    break;
                }
                Ok(recording) => {
                    if let Err(e) = pipeline.queue().remove(&item.id) {
                        log::warn!("Drainer: Failed to remove {} from queue: {}", item.id, e);
                    }
                    log::info!(
                        "Drainer: Replayed {} as recording {}",
                        item.id,
                        recording.id
                    );
                }
                Err(e) => {
                    Self::handle_replay_failure(pipeline, &item, e.to_string()).await;
                }
            }
        }
    }

    /// Undo an offline re-queue from mid-pass: drop the duplicate entry
    /// submit minted and put the original item's placeholder back, keeping
    /// its attempt counter and queue position so the retry ceiling still
    /// applies across connectivity flaps.
    fn restore_requeued(pipeline: &RecordingPipeline, item: &QueuedRecording, requeued_id: &str) {
        if let Err(e) = pipeline.queue().remove(requeued_id) {
            log::warn!(
                "Drainer: Failed to remove duplicate {} from queue: {}",
                requeued_id,
                e
            );
        }
        pipeline.store().remove_local(requeued_id);
        pipeline
            .store()
            .save_local_only(&Recording::queued_placeholder(item));
        log::info!(
            "Drainer: Went offline mid-replay, {} stays queued",
            item.id
        );
    }

    async fn handle_replay_failure(
        pipeline: &RecordingPipeline,
        item: &QueuedRecording,
        message: String,
    ) {
        log::warn!("Drainer: Replay of {} failed: {}", item.id, message);

        let attempts = match pipeline.queue().record_attempt(&item.id, &message) {
            Ok(Some(attempts)) => attempts,
            // Deleted out from under the pass.
            Ok(None) => return,
            Err(e) => {
                log::warn!("Drainer: Failed to record attempt for {}: {}", item.id, e);
                item.attempts + 1
            }
        };

        if attempts >= pipeline.config().max_replay_attempts {
            // Retry ceiling: drop the payload and leave a failed record
            // explaining why. The payload never reached the remote side, so
            // the record stays local.
            if let Err(e) = pipeline.queue().remove(&item.id) {
                log::warn!("Drainer: Failed to remove {} from queue: {}", item.id, e);
            }

            let mut failed = Recording::queued_placeholder(item);
            failed.status = RecordingStatus::Failed;
            failed.error = Some(format!(
                "Upload failed after {} attempts: {}",
                attempts, message
            ));
            pipeline.store().save_local_only(&failed);

            log::warn!(
                "Drainer: Giving up on {} after {} attempts",
                item.id,
                attempts
            );
            pipeline.events().emit(PipelineEvent::Progress {
                recording_id: failed.id.clone(),
                message: format!("Upload abandoned after {} attempts", attempts),
            });
            pipeline.events().emit(PipelineEvent::RecordingsChanged);
        } else {
            // Put the placeholder back with the updated attempt details so
            // the UI keeps showing the queued item.
            if let Some(updated) = pipeline.queue().get(&item.id) {
                let placeholder = Recording::queued_placeholder(&updated);
                pipeline.store().save_local_only(&placeholder);
            }
            pipeline.events().emit(PipelineEvent::RecordingsChanged);
        }
    }
}
