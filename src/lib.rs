//! Call recording pipeline: upload, transcription, analysis, and review of
//! sales call recordings, with offline-first durability.
//!
//! The flow is linear per recording: the capture layer hands raw audio plus
//! descriptive fields to [`RecordingPipeline::submit`], which uploads the
//! payload and then drives transcription and analysis on a background task,
//! persisting after every stage so a crash never loses more than the stage in
//! flight. When the device is offline, submissions land in a durable
//! [`OfflineQueue`] instead, and the [`OfflineDrainer`] replays them in order
//! once connectivity returns.
//!
//! Persistence is dual-write: a synchronous [`LocalCache`] serves instant
//! reads and offline fallback, while a [`RemoteStore`](remote::RemoteStore)
//! is mirrored best-effort and preferred on reads when reachable. The
//! [`Leaderboard`] is a pure read-side aggregation over completed recordings
//! in the cache.

pub mod analysis;
pub mod cache;
pub mod connectivity;
pub mod drainer;
pub mod events;
pub mod leaderboard;
pub mod pipeline;
pub mod queue;
pub mod recording;
pub mod remote;
pub mod store;
pub mod transcription;
pub mod upload;

#[cfg(test)]
mod tests;

pub use cache::LocalCache;
pub use connectivity::ConnectivityMonitor;
pub use drainer::{DrainerHandle, OfflineDrainer};
pub use events::{BroadcastEventSink, EventSink, NullEventSink, PipelineEvent};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardWindow};
pub use pipeline::{PipelineConfig, PipelineError, RecordingPipeline};
pub use queue::OfflineQueue;
pub use recording::{
    CallAnalysis, ManagerReview, QueuedRecording, Recording, RecordingRequest, RecordingStatus,
    TranscriptionRecord,
};
pub use store::RecordingStore;
