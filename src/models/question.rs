// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{ITEM_MAX_LEN, MIN_CHOICES, QUESTION_TEXT_MAX_LEN};

/// Discriminator shared by questions, submissions, playable and graded views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    TrueFalse,
    MultipleChoice,
    Matching,
}

impl QuestionType {
    /// Value stored in the `question_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::Matching => "MATCHING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TRUE_FALSE" => Some(QuestionType::TrueFalse),
            "MULTIPLE_CHOICE" => Some(QuestionType::MultipleChoice),
            "MATCHING" => Some(QuestionType::Matching),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: i64,
    pub text: String,
    pub correct: bool,
}

/// One source -> target association of a matching question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    pub id: i64,
    pub source_item: String,
    pub target_item: String,
}

/// Per-variant answer key of a question.
///
/// Serialized with a `questionType` discriminator, which makes this the
/// author-facing view (it carries the correct answers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "questionType", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum QuestionBody {
    TrueFalse { correct_answer: bool },
    MultipleChoice { choices: Vec<Choice> },
    Matching { pairs: Vec<MatchPair> },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionBody::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionBody::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionBody::Matching { .. } => QuestionType::Matching,
        }
    }
}

/// A question together with its authoritative answer key.
/// Also used as the author-facing response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    #[serde(flatten)]
    pub body: QuestionBody,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.body.question_type()
    }
}

/// DTO for a choice inside a create/update request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRequest {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// DTO for a match pair inside a create/update request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPairRequest {
    pub source_item: String,
    pub target_item: String,
}

/// Variant-specific payload of a question request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "questionType", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum QuestionRequestKind {
    TrueFalse { correct_answer: bool },
    MultipleChoice { choices: Vec<ChoiceRequest> },
    Matching { pairs: Vec<MatchPairRequest> },
}

impl QuestionRequestKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionRequestKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionRequestKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionRequestKind::Matching { .. } => QuestionType::Matching,
        }
    }
}

/// DTO for creating or updating a question.
///
/// Collections are replaced wholesale on update, so choice and pair ids are
/// reassigned every time a question is saved.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = QUESTION_TEXT_MAX_LEN))]
    pub text: String,
    #[serde(flatten)]
    #[validate(custom(function = validate_kind))]
    pub kind: QuestionRequestKind,
}

fn blank_or_too_long(value: &str) -> bool {
    value.trim().is_empty() || value.chars().count() > ITEM_MAX_LEN
}

fn validate_kind(kind: &QuestionRequestKind) -> Result<(), validator::ValidationError> {
    match kind {
        QuestionRequestKind::TrueFalse { .. } => Ok(()),
        QuestionRequestKind::MultipleChoice { choices } => {
            if choices.len() < MIN_CHOICES {
                return Err(validator::ValidationError::new("too_few_choices"));
            }
            if choices.iter().any(|c| blank_or_too_long(&c.text)) {
                return Err(validator::ValidationError::new("invalid_choice_text"));
            }
            Ok(())
        }
        QuestionRequestKind::Matching { pairs } => {
            if pairs.is_empty() {
                return Err(validator::ValidationError::new("pairs_cannot_be_empty"));
            }
            if pairs
                .iter()
                .any(|p| blank_or_too_long(&p.source_item) || blank_or_too_long(&p.target_item))
            {
                return Err(validator::ValidationError::new("invalid_pair_item"));
            }
            // Source items key the grading map.
            let mut seen = HashSet::new();
            if !pairs.iter().all(|p| seen.insert(p.source_item.as_str())) {
                return Err(validator::ValidationError::new("duplicate_source_item"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> QuestionRequest {
        serde_json::from_value(value).expect("request should deserialize")
    }

    #[test]
    fn request_deserializes_by_discriminator() {
        let req = parse(json!({
            "questionType": "MULTIPLE_CHOICE",
            "text": "Pick the primes",
            "choices": [
                { "text": "2", "correct": true },
                { "text": "4" }
            ]
        }));

        assert_eq!(req.kind.question_type(), QuestionType::MultipleChoice);
        match req.kind {
            QuestionRequestKind::MultipleChoice { choices } => {
                assert!(choices[0].correct);
                assert!(!choices[1].correct);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn item_length_counts_characters() {
        let matching = |source: String| QuestionRequest {
            text: "Match".to_string(),
            kind: QuestionRequestKind::Matching {
                pairs: vec![MatchPairRequest {
                    source_item: source,
                    target_item: "target".to_string(),
                }],
            },
        };

        assert!(matching("ж".repeat(300)).validate().is_ok());
        assert!(matching("ж".repeat(ITEM_MAX_LEN)).validate().is_ok());
        assert!(matching("ж".repeat(ITEM_MAX_LEN + 1)).validate().is_err());
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let result = serde_json::from_value::<QuestionRequest>(json!({
            "questionType": "ESSAY",
            "text": "Describe"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn multiple_choice_needs_two_choices() {
        let req = parse(json!({
            "questionType": "MULTIPLE_CHOICE",
            "text": "Only one",
            "choices": [{ "text": "A", "correct": true }]
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn matching_rejects_empty_and_duplicate_sources() {
        let empty = parse(json!({
            "questionType": "MATCHING",
            "text": "Match",
            "pairs": []
        }));
        assert!(empty.validate().is_err());

        let duplicate = parse(json!({
            "questionType": "MATCHING",
            "text": "Match",
            "pairs": [
                { "sourceItem": "Poland", "targetItem": "Warsaw" },
                { "sourceItem": "Poland", "targetItem": "Krakow" }
            ]
        }));
        assert!(duplicate.validate().is_err());

        let blank = parse(json!({
            "questionType": "MATCHING",
            "text": "Match",
            "pairs": [{ "sourceItem": " ", "targetItem": "Warsaw" }]
        }));
        assert!(blank.validate().is_err());
    }

    #[test]
    fn true_false_only_needs_text() {
        let req = parse(json!({
            "questionType": "TRUE_FALSE",
            "text": "The sky is blue",
            "correctAnswer": true
        }));
        assert!(req.validate().is_ok());

        let no_text = parse(json!({
            "questionType": "TRUE_FALSE",
            "text": "",
            "correctAnswer": true
        }));
        assert!(no_text.validate().is_err());
    }

    #[test]
    fn author_view_serializes_answer_key() {
        let question = Question {
            id: 1,
            quiz_id: 2,
            text: "Capital?".into(),
            body: QuestionBody::Matching {
                pairs: vec![MatchPair {
                    id: 10,
                    source_item: "Poland".into(),
                    target_item: "Warsaw".into(),
                }],
            },
        };

        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["questionType"], "MATCHING");
        assert_eq!(value["quizId"], 2);
        assert_eq!(value["pairs"][0]["sourceItem"], "Poland");
        assert_eq!(value["pairs"][0]["targetItem"], "Warsaw");
    }

    #[test]
    fn question_type_round_trips_through_column_value() {
        for kind in [
            QuestionType::TrueFalse,
            QuestionType::MultipleChoice,
            QuestionType::Matching,
        ] {
            assert_eq!(QuestionType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(QuestionType::parse("ESSAY"), None);
    }
}
