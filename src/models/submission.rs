// src/models/submission.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::question::QuestionType;

/// A test-taker's answer to one question, tagged like the question it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "questionType", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SubmittedAnswer {
    TrueFalse {
        submitted_answer: bool,
    },
    MultipleChoice {
        selected_choice_ids: BTreeSet<i64>,
    },
    /// Keyed by the source labels shown in the playable view.
    Matching {
        submitted_pairs: BTreeMap<String, String>,
    },
}

impl SubmittedAnswer {
    pub fn question_type(&self) -> QuestionType {
        match self {
            SubmittedAnswer::TrueFalse { .. } => QuestionType::TrueFalse,
            SubmittedAnswer::MultipleChoice { .. } => QuestionType::MultipleChoice,
            SubmittedAnswer::Matching { .. } => QuestionType::Matching,
        }
    }
}

/// Wire shape of a single answer: `questionType`, `questionId` and the
/// variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: i64,
    #[serde(flatten)]
    pub answer: SubmittedAnswer,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub answers: Vec<AnswerSubmission>,
}
