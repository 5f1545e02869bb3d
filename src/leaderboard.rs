//! Leaderboard aggregation.
//!
//! Pure read-side computation over completed recordings in the local cache;
//! nothing here persists or writes. Rankings are recomputed from scratch on
//! every request, which is fine at the per-user recording counts this tool
//! sees, and keeps the write path completely free of derived state.

use crate::cache::LocalCache;
use crate::recording::Recording;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Time window a leaderboard request covers, keyed on `completed_at`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardWindow {
    /// Rolling 7 days.
    Week,
    /// Rolling 30 days.
    Month,
    All,
}

impl LeaderboardWindow {
    /// Oldest `completed_at` admitted by this window, or `None` for no bound.
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            LeaderboardWindow::Week => Some(now - Duration::days(7)),
            LeaderboardWindow::Month => Some(now - Duration::days(30)),
            LeaderboardWindow::All => None,
        }
    }
}

/// One user's row in the computed leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position after sorting; no gaps.
    pub rank: u32,
    pub owner_id: String,
    /// Mean overall score across the window.
    pub average_score: f64,
    /// Recency-weighted delta: mean of the newer half of the time-ordered
    /// scores minus the mean of the older half. 0 with fewer than 2 scores.
    pub improvement: f64,
    /// Fraction of recordings whose every rubric step was marked complete.
    pub completion_rate: f64,
    /// Total engaged minutes, summed from transcription durations.
    pub total_minutes: f64,
    /// Completed recordings counted in the window.
    pub recordings: u32,
}

/// Batch leaderboard computation.
pub struct Leaderboard;

impl Leaderboard {
    /// Rank every user with at least one scored recording in the window.
    ///
    /// Ordering is average score descending, ties broken by recording count
    /// descending; ranks are assigned positionally after the sort.
    pub fn compute(
        cache: &LocalCache,
        window: LeaderboardWindow,
        now: DateTime<Utc>,
    ) -> Vec<LeaderboardEntry> {
        let cutoff = window.cutoff(now);

        let mut per_user: HashMap<String, Vec<Recording>> = HashMap::new();
        for recording in cache.completed() {
            let Some(completed_at) = recording.completed_at else {
                continue;
            };
            if let Some(cutoff) = cutoff {
                if completed_at < cutoff {
                    continue;
                }
            }
            per_user
                .entry(recording.owner_id.clone())
                .or_default()
                .push(recording);
        }

        let mut entries: Vec<LeaderboardEntry> = per_user
            .into_iter()
            .map(|(owner_id, recordings)| Self::entry_for(owner_id, recordings))
            .filter(|entry| entry.recordings > 0)
            .collect();

        entries.sort_by(|a, b| {
            b.average_score
                .partial_cmp(&a.average_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.recordings.cmp(&a.recordings))
        });

        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index as u32 + 1;
        }

        entries
    }

    fn entry_for(owner_id: String, mut recordings: Vec<Recording>) -> LeaderboardEntry {
        // Oldest first, so the improvement split compares early vs. recent.
        recordings.sort_by_key(|r| r.completed_at);

        let mut scores = Vec::with_capacity(recordings.len());
        let mut fully_completed = 0usize;
        let mut total_minutes = 0.0;

        for recording in &recordings {
            // Completed recordings always carry an analysis; skip any record
            // that lost it rather than scoring it as zero.
            let Some(analysis) = &recording.analysis else {
                continue;
            };
            scores.push(analysis.overall_score);
            if analysis.all_steps_completed() {
                fully_completed += 1;
            }
            if let Some(transcription) = &recording.transcription {
                total_minutes += parse_duration_minutes(&transcription.duration);
            }
        }

        let count = scores.len();
        let average_score = if count == 0 {
            0.0
        } else {
            scores.iter().sum::<f64>() / count as f64
        };

        LeaderboardEntry {
            rank: 0,
            owner_id,
            average_score,
            improvement: improvement_delta(&scores),
            completion_rate: if count == 0 {
                0.0
            } else {
                fully_completed as f64 / count as f64
            },
            total_minutes,
            recordings: count as u32,
        }
    }
}

/// Mean of the newer half minus the mean of the older half of a
/// time-ordered score list, split at the midpoint. Fewer than two scores
/// cannot show a trend and yield 0.
fn improvement_delta(ordered_scores: &[f64]) -> f64 {
    if ordered_scores.len() < 2 {
        return 0.0;
    }

    let mid = ordered_scores.len() / 2;
    let (older, newer) = ordered_scores.split_at(mid);
    let mean = |half: &[f64]| half.iter().sum::<f64>() / half.len() as f64;

    mean(newer) - mean(older)
}

/// Parse a clock-style duration ("M:SS" or "H:MM:SS") or bare minutes into
/// fractional minutes. Unparseable input counts as 0 rather than poisoning
/// the aggregate.
pub fn parse_duration_minutes(duration: &str) -> f64 {
    let parts: Vec<&str> = duration.trim().split(':').collect();

    let parsed: Option<Vec<f64>> = parts
        .iter()
        .map(|p| p.trim().parse::<f64>().ok().filter(|n| *n >= 0.0))
        .collect();

    match parsed.as_deref() {
        Some([minutes]) => *minutes,
        Some([minutes, seconds]) => minutes + seconds / 60.0,
        Some([hours, minutes, seconds]) => hours * 60.0 + minutes + seconds / 60.0,
        _ => 0.0,
    }
}
