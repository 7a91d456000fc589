//! Per-session transcript state: question records, timestamped segments and
//! submission-ready aggregates, with a recovery snapshot written after every
//! mutation.

pub mod snapshot;

pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

use std::collections::BTreeMap;

use chrono::Utc;
use log::{error, warn};
use serde::{Deserialize, Serialize};

/// Fixed key under which the recovery snapshot is persisted.
pub const SNAPSHOT_KEY: &str = "interview_transcript";

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One finalized chunk of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub text: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub confidence: f64,
}

/// Everything recorded for a single question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub text: String,
    /// Set the first time the question becomes active; immutable thereafter.
    pub start_time: i64,
    /// Append-only while the question is active, never reordered.
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimes {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

/// Snapshot-serializable session state: question map plus session clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub questions: BTreeMap<i64, QuestionRecord>,
    pub session: SessionTimes,
}

/// Reconstructed transcript for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTranscript {
    pub question_id: i64,
    pub question_text: String,
    /// All segment texts joined with single spaces, in segment order.
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
    pub start_time: i64,
}

/// One question's answer in the shape the backend accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub question_id: i64,
    pub answer: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// Tracks the active question and accumulates speech segments into
/// per-question transcripts over the course of one interview attempt.
pub struct TranscriptManager<S: SnapshotStore> {
    data: SessionData,
    active_question: Option<i64>,
    store: S,
}

impl TranscriptManager<MemorySnapshotStore> {
    /// Manager with a throwaway in-memory snapshot store.
    pub fn in_memory() -> Self {
        Self::new(MemorySnapshotStore::new())
    }
}

impl<S: SnapshotStore> TranscriptManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            data: SessionData::default(),
            active_question: None,
            store,
        }
    }

    /// Starts a new interview session, clearing any previous question data.
    /// Returns the session start timestamp.
    pub fn start_session(&mut self) -> i64 {
        let started = now_ms();
        self.data.session.start_time = Some(started);
        self.data.session.end_time = None;
        self.data.questions.clear();
        self.active_question = None;
        self.persist();
        started
    }

    /// Ends the current session and returns the full session data.
    pub fn end_session(&mut self) -> SessionData {
        self.data.session.end_time = Some(now_ms());
        self.persist();
        self.data.clone()
    }

    pub fn session_times(&self) -> SessionTimes {
        self.data.session
    }

    pub fn active_question(&self) -> Option<i64> {
        self.active_question
    }

    /// Makes `question_id` the active question. First activation records the
    /// question's start time and an empty segment list; re-activation only
    /// updates the question text (last write wins).
    pub fn set_active_question(&mut self, question_id: i64, question_text: &str) {
        let record = self.data.questions.entry(question_id).or_insert_with(|| QuestionRecord {
            text: String::new(),
            start_time: now_ms(),
            segments: Vec::new(),
        });
        record.text = question_text.to_string();
        self.active_question = Some(question_id);
        self.persist();
    }

    /// Appends a segment to the active question. Returns false (and logs)
    /// when no question is active; this is a caller error, not a panic.
    pub fn add_segment(&mut self, segment: TranscriptSegment) -> bool {
        let Some(question_id) = self.active_question else {
            warn!("add_segment called with no active question");
            return false;
        };
        let Some(record) = self.data.questions.get_mut(&question_id) else {
            warn!("active question {question_id} has no record");
            return false;
        };
        record.segments.push(segment);
        self.persist();
        true
    }

    /// Appends several segments in order through the single-segment path.
    pub fn add_segments(&mut self, segments: &[TranscriptSegment]) -> bool {
        if self.active_question.is_none() {
            warn!("add_segments called with no active question");
            return false;
        }
        for segment in segments {
            self.add_segment(segment.clone());
        }
        true
    }

    /// Full transcript for one question, or None if the id is unknown.
    pub fn get_question_transcript(&self, question_id: i64) -> Option<QuestionTranscript> {
        let record = self.data.questions.get(&question_id)?;
        let full_text = record
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(QuestionTranscript {
            question_id,
            question_text: record.text.clone(),
            full_text,
            segments: record.segments.clone(),
            start_time: record.start_time,
        })
    }

    /// Transcripts for every known question, in key order.
    pub fn get_all_transcripts(&self) -> Vec<QuestionTranscript> {
        self.data
            .questions
            .keys()
            .filter_map(|id| self.get_question_transcript(*id))
            .collect()
    }

    /// Session data formatted for submission to the backend: one entry per
    /// question with the joined answer text and its time bounds.
    pub fn get_formatted_for_submission(&self) -> Vec<SubmissionEntry> {
        self.data
            .questions
            .iter()
            .map(|(id, record)| {
                let answer = record
                    .segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let end_time = record
                    .segments
                    .last()
                    .map(|s| s.end_time)
                    .unwrap_or(record.start_time);
                SubmissionEntry {
                    question_id: *id,
                    answer,
                    start_time: record.start_time,
                    end_time,
                }
            })
            .collect()
    }

    /// Restores session state from the recovery snapshot, if one exists.
    pub fn load_snapshot(&mut self) -> bool {
        match self.store.load(SNAPSHOT_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<SessionData>(&blob) {
                Ok(data) => {
                    self.data = data;
                    true
                }
                Err(e) => {
                    error!("Failed to decode recovery snapshot: {e}");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                error!("Failed to load recovery snapshot: {e}");
                false
            }
        }
    }

    /// Removes the recovery snapshot. Returns false if the store failed.
    pub fn clear_snapshot(&mut self) -> bool {
        match self.store.clear(SNAPSHOT_KEY) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to clear recovery snapshot: {e}");
                false
            }
        }
    }

    // Snapshot failures must never take the in-memory transcript down with
    // them, so persistence errors are logged and swallowed.
    fn persist(&self) {
        let blob = match serde_json::to_string(&self.data) {
            Ok(blob) => blob,
            Err(e) => {
                error!("Failed to encode recovery snapshot: {e}");
                return;
            }
        };
        if let Err(e) = self.store.save(SNAPSHOT_KEY, &blob) {
            error!("Failed to save recovery snapshot: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, start: i64, end: i64, confidence: f64) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            confidence,
        }
    }

    #[test]
    fn test_segments_joined_in_call_order() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "Tell me about yourself");

        assert!(manager.add_segment(segment("I am", 0, 1, 0.9)));
        assert!(manager.add_segment(segment("a developer", 1, 2, 0.8)));

        let transcript = manager.get_question_transcript(0).unwrap();
        assert_eq!(transcript.full_text, "I am a developer");
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.question_text, "Tell me about yourself");
    }

    #[test]
    fn test_submission_round_trip() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(3, "Why this role?");

        let texts = ["one", "two", "three", "four"];
        for (i, text) in texts.iter().enumerate() {
            manager.add_segment(segment(text, i as i64, i as i64 + 1, 1.0));
        }

        let formatted = manager.get_formatted_for_submission();
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].question_id, 3);
        assert_eq!(formatted[0].answer, texts.join(" "));
        assert_eq!(formatted[0].end_time, 4);
    }

    #[test]
    fn test_submission_end_time_falls_back_to_question_start() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "Silent question");

        let formatted = manager.get_formatted_for_submission();
        assert_eq!(formatted[0].start_time, formatted[0].end_time);
    }

    #[test]
    fn test_add_segment_without_active_question_fails() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();

        assert!(!manager.add_segment(segment("orphan", 0, 1, 0.5)));
        assert!(!manager.add_segments(&[segment("orphan", 0, 1, 0.5)]));
        assert!(manager.get_all_transcripts().is_empty());
    }

    #[test]
    fn test_switching_question_preserves_prior_segments() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "First");
        manager.add_segment(segment("answer one", 0, 1, 0.9));

        let before = manager.get_question_transcript(0).unwrap();
        manager.set_active_question(1, "Second");
        manager.add_segment(segment("answer two", 2, 3, 0.9));

        let after = manager.get_question_transcript(0).unwrap();
        assert_eq!(before.segments, after.segments);
        assert_eq!(before.start_time, after.start_time);
    }

    #[test]
    fn test_reactivation_updates_text_but_keeps_history() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "Original wording");
        manager.add_segment(segment("kept", 0, 1, 0.9));

        let original_start = manager.get_question_transcript(0).unwrap().start_time;
        manager.set_active_question(1, "Other");
        manager.set_active_question(0, "Revised wording");

        let transcript = manager.get_question_transcript(0).unwrap();
        assert_eq!(transcript.question_text, "Revised wording");
        assert_eq!(transcript.start_time, original_start);
        assert_eq!(transcript.segments.len(), 1);
    }

    #[test]
    fn test_start_session_clears_previous_questions() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "Old");
        manager.add_segment(segment("stale", 0, 1, 0.9));

        manager.start_session();

        assert!(manager.get_question_transcript(0).is_none());
        assert!(manager.active_question().is_none());
        assert!(manager.session_times().end_time.is_none());
    }

    #[test]
    fn test_end_session_stamps_end_time() {
        let mut manager = TranscriptManager::in_memory();
        let started = manager.start_session();
        let data = manager.end_session();

        assert_eq!(data.session.start_time, Some(started));
        assert!(data.session.end_time.is_some());
    }

    #[test]
    fn test_all_transcripts_in_key_order() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(2, "Second");
        manager.set_active_question(0, "First");

        let all = manager.get_all_transcripts();
        let ids: Vec<i64> = all.iter().map(|t| t.question_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = MemorySnapshotStore::new();
        let mut manager = TranscriptManager::new(store);
        manager.start_session();
        manager.set_active_question(0, "Recovered?");
        manager.add_segment(segment("yes", 0, 1, 0.7));
        let saved = manager.end_session();

        // A fresh manager over the same store recovers the session.
        let TranscriptManager { store, .. } = manager;
        let mut recovered = TranscriptManager::new(store);
        assert!(recovered.load_snapshot());
        assert_eq!(recovered.end_session().questions, saved.questions);
    }

    #[test]
    fn test_clear_snapshot_removes_saved_state() {
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        assert!(manager.clear_snapshot());
        assert!(!manager.load_snapshot());
    }
}
