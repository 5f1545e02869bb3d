//! Recording data model.
//!
//! A `Recording` is one capture-to-analysis unit of work: it carries the
//! descriptive fields entered at capture time, the lifecycle status, and the
//! stage results (transcription, analysis, optional manager review) as they
//! arrive. `QueuedRecording` is the client-side staging form used while the
//! device is offline; it additionally holds the raw audio payload and never
//! reaches the remote store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error text marking a placeholder recording that is queued for later upload.
///
/// This is the one place the `error` field is populated outside the `failed`
/// status: the placeholder is a pseudo-state, not a true failure, and the
/// drainer appends attempt details after this prefix on failed replays.
pub const QUEUED_MARKER: &str = "Queued for upload - waiting for connection";

/// Lifecycle status of a recording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Payload accepted (or queued offline); transcription not yet started.
    Uploaded,
    /// Transcription stage submitted and being polled.
    Transcribing,
    /// Transcript received; analysis stage in flight.
    Analyzing,
    /// Analysis received. Terminal.
    Completed,
    /// A stage failed. Terminal; `error` holds the reason.
    Failed,
}

impl RecordingStatus {
    /// Terminal states admit no further transitions except deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordingStatus::Completed | RecordingStatus::Failed)
    }
}

/// One diarized span of the transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub start_secs: f64,
}

/// Result of the transcription stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionRecord {
    pub text: String,
    /// Clock-style duration as reported by the service ("M:SS" or "H:MM:SS").
    pub duration: String,
    pub confidence: f64,
    #[serde(default)]
    pub segments: Vec<SpeakerSegment>,
}

/// Score for a single step of the selected process rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepScore {
    pub step: String,
    pub score: f64,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// A notable moment the analysis flagged in the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyMoment {
    /// Position in the call, clock-style ("12:41").
    pub timestamp: String,
    pub note: String,
}

/// Optional deal-outcome prediction sub-object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictedOutcome {
    pub outcome: String,
    /// 0.0..=1.0
    pub confidence: f64,
}

/// Optional call-sentiment sub-object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentSummary {
    pub overall: String,
    /// -1.0..=1.0
    pub score: f64,
}

/// Result of the analysis stage: the structured scoring of one call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallAnalysis {
    /// Overall score, 0-100.
    pub overall_score: f64,
    /// Per-step breakdown for the applied rubric.
    #[serde(default)]
    pub step_scores: Vec<StepScore>,
    /// Provider-defined metric map; shape varies by rubric.
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default)]
    pub coaching_priorities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_outcome: Option<PredictedOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentSummary>,
}

impl CallAnalysis {
    /// Whether every rubric step was marked complete. Used for the
    /// leaderboard completion rate.
    pub fn all_steps_completed(&self) -> bool {
        self.step_scores.iter().all(|s| s.completed)
    }
}

/// Manager review attached to a completed recording; one per recording
/// (upsert, not append).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagerReview {
    /// 1-5.
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub reviewer_id: String,
    pub reviewed_at: DateTime<Utc>,
}

/// Descriptive fields supplied by the capture layer at submit time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingRequest {
    pub owner_id: String,
    pub client_name: String,
    pub meeting_date: NaiveDate,
    /// Selects the scoring rubric the analysis stage applies.
    pub process_type: String,
}

/// One capture-to-analysis unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    pub id: String,
    pub owner_id: String,
    pub client_name: String,
    pub meeting_date: NaiveDate,
    pub process_type: String,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
    /// Set only on success.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Present once transcription succeeds (status `analyzing` or later).
    #[serde(default)]
    pub transcription: Option<TranscriptionRecord>,
    /// Present only once the recording is `completed`.
    #[serde(default)]
    pub analysis: Option<CallAnalysis>,
    /// Attached after completion by a human-in-the-loop step.
    #[serde(default)]
    pub review: Option<ManagerReview>,
    /// Last failure message; present in `failed` state, or the queued marker
    /// on an offline placeholder.
    #[serde(default)]
    pub error: Option<String>,
}

impl Recording {
    /// Create a fresh record in `uploaded` state with the given id.
    pub fn new(id: String, request: &RecordingRequest) -> Self {
        Self {
            id,
            owner_id: request.owner_id.clone(),
            client_name: request.client_name.clone(),
            meeting_date: request.meeting_date,
            process_type: request.process_type.clone(),
            status: RecordingStatus::Uploaded,
            created_at: Utc::now(),
            completed_at: None,
            transcription: None,
            analysis: None,
            review: None,
            error: None,
        }
    }

    /// Synthesize the placeholder record shown while a queued recording waits
    /// for connectivity. Shares the queued item's id so the drainer can swap
    /// it out before a replay attempt.
    pub fn queued_placeholder(queued: &QueuedRecording) -> Self {
        Self {
            id: queued.id.clone(),
            owner_id: queued.owner_id.clone(),
            client_name: queued.client_name.clone(),
            meeting_date: queued.meeting_date,
            process_type: queued.process_type.clone(),
            status: RecordingStatus::Uploaded,
            created_at: queued.queued_at,
            completed_at: None,
            transcription: None,
            analysis: None,
            review: None,
            error: Some(match &queued.last_error {
                Some(err) => format!("{} (attempt {} failed: {})", QUEUED_MARKER, queued.attempts, err),
                None => QUEUED_MARKER.to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this record is an offline placeholder rather than a synced job.
    pub fn is_queued_placeholder(&self) -> bool {
        self.status == RecordingStatus::Uploaded
            && self
                .error
                .as_deref()
                .map(|e| e.starts_with(QUEUED_MARKER))
                .unwrap_or(false)
    }
}

/// A recording staged on-device because no network was available at submit
/// time. Purely client-side: replay turns it into a normal `Recording` with
/// a fresh id, and it is deleted on success or at the retry ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedRecording {
    pub id: String,
    pub owner_id: String,
    pub client_name: String,
    pub meeting_date: NaiveDate,
    pub process_type: String,
    /// Raw audio payload, base64 in the JSON file.
    #[serde(with = "base64_bytes")]
    pub audio: Vec<u8>,
    pub queued_at: DateTime<Utc>,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Error from the most recent failed replay.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedRecording {
    pub fn new(audio: Vec<u8>, request: &RecordingRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: request.owner_id.clone(),
            client_name: request.client_name.clone(),
            meeting_date: request.meeting_date,
            process_type: request.process_type.clone(),
            audio,
            queued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    /// Rebuild the submit request for a replay attempt.
    pub fn request(&self) -> RecordingRequest {
        RecordingRequest {
            owner_id: self.owner_id.clone(),
            client_name: self.client_name.clone(),
            meeting_date: self.meeting_date,
            process_type: self.process_type.clone(),
        }
    }
}

/// Serde adapter storing binary payloads as base64 strings in JSON.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RecordingRequest {
        RecordingRequest {
            owner_id: "user-1".to_string(),
            client_name: "Acme Roofing".to_string(),
            meeting_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            process_type: "standard".to_string(),
        }
    }

    #[test]
    fn test_new_recording_is_uploaded() {
        let rec = Recording::new("rec-1".to_string(), &request());
        assert_eq!(rec.status, RecordingStatus::Uploaded);
        assert!(rec.completed_at.is_none());
        assert!(!rec.is_terminal());
        assert!(!rec.is_queued_placeholder());
    }

    #[test]
    fn test_queued_placeholder_detection() {
        let queued = QueuedRecording::new(vec![1, 2, 3], &request());
        let placeholder = Recording::queued_placeholder(&queued);

        assert_eq!(placeholder.id, queued.id);
        assert_eq!(placeholder.status, RecordingStatus::Uploaded);
        assert!(placeholder.is_queued_placeholder());
        assert_eq!(placeholder.error.as_deref(), Some(QUEUED_MARKER));
    }

    #[test]
    fn test_placeholder_keeps_marker_after_failed_attempt() {
        let mut queued = QueuedRecording::new(vec![1], &request());
        queued.attempts = 2;
        queued.last_error = Some("connection refused".to_string());

        let placeholder = Recording::queued_placeholder(&queued);
        assert!(placeholder.is_queued_placeholder());
        assert!(placeholder.error.as_deref().unwrap().contains("attempt 2"));
        assert!(placeholder
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[test]
    fn test_queued_recording_round_trips_audio() {
        let queued = QueuedRecording::new(vec![0u8, 255, 17, 42], &request());
        let json = serde_json::to_string(&queued).unwrap();
        // Raw bytes must not leak into the JSON as an array.
        assert!(json.contains("\"audio\":\""));

        let back: QueuedRecording = serde_json::from_str(&json).unwrap();
        assert_eq!(back.audio, vec![0u8, 255, 17, 42]);
        assert_eq!(back, queued);
    }

    #[test]
    fn test_recording_deserializes_without_optional_fields() {
        // Older cache files may predate review/analysis fields.
        let json = r#"{
            "id": "rec-9",
            "owner_id": "user-1",
            "client_name": "Acme",
            "meeting_date": "2024-03-14",
            "process_type": "standard",
            "status": "transcribing",
            "created_at": "2024-03-14T10:00:00Z"
        }"#;

        let rec: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(rec.status, RecordingStatus::Transcribing);
        assert!(rec.transcription.is_none());
        assert!(rec.analysis.is_none());
        assert!(rec.review.is_none());
        assert!(rec.error.is_none());
    }

    #[test]
    fn test_all_steps_completed() {
        let mut analysis = CallAnalysis {
            overall_score: 82.0,
            step_scores: vec![
                StepScore {
                    step: "discovery".to_string(),
                    score: 80.0,
                    completed: true,
                    feedback: None,
                },
                StepScore {
                    step: "close".to_string(),
                    score: 60.0,
                    completed: false,
                    feedback: None,
                },
            ],
            metrics: serde_json::Value::Null,
            strengths: vec![],
            improvements: vec![],
            key_moments: vec![],
            coaching_priorities: vec![],
            predicted_outcome: None,
            sentiment: None,
        };
        assert!(!analysis.all_steps_completed());

        analysis.step_scores[1].completed = true;
        assert!(analysis.all_steps_completed());
    }
}
