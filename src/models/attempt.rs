// src/models/attempt.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::submission::SubmittedAnswer;

/// Lifecycle state of an attempt, derived from `finished_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Finished,
}

/// An answer persisted together with its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnswer {
    pub question_id: i64,
    pub correct: bool,
    #[serde(flatten)]
    pub answer: SubmittedAnswer,
}

/// One user's run through one quiz.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    /// `None` while the attempt is in progress. Set exactly once.
    pub finished_at: Option<DateTime<Utc>>,
    /// Percentage, `None` until finished.
    pub score: Option<f64>,
    pub answers: Vec<StoredAnswer>,
}

impl QuizAttempt {
    pub fn status(&self) -> AttemptStatus {
        match self.finished_at {
            Some(_) => AttemptStatus::Finished,
            None => AttemptStatus::InProgress,
        }
    }
}

/// Choice as shown to a test-taker: no correctness flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayableChoice {
    pub id: i64,
    pub text: String,
}

/// Answer-redacted presentation data per question kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "questionType", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum PlayableKind {
    TrueFalse,
    MultipleChoice {
        choices: Vec<PlayableChoice>,
    },
    /// `target_items` are shuffled independently of `source_items`.
    Matching {
        source_items: Vec<String>,
        target_items: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayableQuestion {
    pub id: i64,
    pub text: String,
    #[serde(flatten)]
    pub kind: PlayableKind,
}

/// Per-kind review data: what was submitted next to the answer key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "questionType", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum GradedDetail {
    TrueFalse {
        submitted_answer: bool,
        correct_answer: bool,
    },
    MultipleChoice {
        submitted_choices: BTreeSet<String>,
        correct_choices: BTreeSet<String>,
    },
    Matching {
        submitted_pairs: BTreeMap<String, String>,
        correct_pairs: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedQuestion {
    pub question_id: i64,
    pub text: String,
    pub correct: bool,
    #[serde(flatten)]
    pub detail: GradedDetail,
}

/// Response for `POST /api/attempts/start/{quiz_id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub questions: Vec<PlayableQuestion>,
}

/// Response for `POST /api/attempts/{attempt_id}/submit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub attempt_id: i64,
    pub quiz_title: String,
    pub total_questions: usize,
    pub correct_answers_count: usize,
    pub score: f64,
    pub graded_questions: Vec<GradedQuestion>,
}

/// Read-only view of an attempt for its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: Option<f64>,
    pub answers: Vec<StoredAnswer>,
}
