use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A registered account. The password hash never leaves the store layer.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// One question's answer as persisted on an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub question_text: String,
    pub answer_text: String,
    pub duration_seconds: f64,
}

/// The durable representation of one interview. Identity and owner are
/// immutable; transcript, feedback, visual analysis and final score are
/// populated by later updates, each replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}

impl InterviewRecord {
    /// A freshly created interview: questions only, owned by `owner_id`.
    pub fn new(owner_id: Uuid, questions: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            created_at: Utc::now(),
            questions,
            transcript: None,
            feedback: None,
            visual_analysis: None,
            final_score: None,
        }
    }

    /// Applies a validated update. Each provided field replaces the stored
    /// value wholesale; absent fields are untouched.
    pub fn apply(&mut self, update: InterviewUpdate) {
        if let Some(transcript) = update.transcript {
            self.transcript = Some(transcript);
        }
        if let Some(feedback) = update.feedback {
            self.feedback = Some(feedback);
        }
        if let Some(visual_analysis) = update.visual_analysis {
            self.visual_analysis = Some(visual_analysis);
        }
        if let Some(final_score) = update.final_score {
            self.final_score = Some(final_score);
        }
    }
}

/// Partial interview update; only present fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}
