//! Pipeline event sink.
//!
//! The orchestrator and drainer report progress through an `EventSink`
//! injected at construction, scoped to the owning session. Two kinds of
//! events come out: human-readable progress lines for the diagnostics panel,
//! and a coarse "recordings changed" signal any UI observer can use to
//! refresh its view.

use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Human-readable progress line for one recording's stage chain.
    Progress {
        recording_id: String,
        message: String,
    },
    /// The set of known recordings changed; observers should re-read.
    RecordingsChanged,
}

/// Receiver of pipeline events.
///
/// `emit` must not block: implementations hand the event off and return.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that drops every event. For hosts without a diagnostics panel.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Sink fanning events out over a broadcast channel.
///
/// Observers call [`BroadcastEventSink::subscribe`]; slow observers lag and
/// lose old events rather than backpressuring the pipeline.
pub struct BroadcastEventSink {
    tx: broadcast::Sender<PipelineEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: PipelineEvent) {
        // Err means no live subscribers, which is fine.
        let _ = self.tx.send(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: PipelineEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_sink_delivers_to_subscriber() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();

        sink.emit(PipelineEvent::RecordingsChanged);
        assert_eq!(rx.try_recv().unwrap(), PipelineEvent::RecordingsChanged);
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_does_not_panic() {
        let sink = BroadcastEventSink::new(8);
        sink.emit(PipelineEvent::Progress {
            recording_id: "rec-1".to_string(),
            message: "transcribing".to_string(),
        });
    }
}
