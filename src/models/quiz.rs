// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::{QUIZ_DESCRIPTION_MAX_LEN, QUIZ_TITLE_MAX_LEN, QUIZ_TITLE_MIN_LEN},
    models::question::Question,
};

/// A quiz and its questions in their stored order.
#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

/// DTO for creating and updating a quiz.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuizRequest {
    #[validate(length(
        min = QUIZ_TITLE_MIN_LEN,
        max = QUIZ_TITLE_MAX_LEN,
        message = "Title length must be between 3 and 255 characters."
    ))]
    pub title: String,
    #[validate(length(max = QUIZ_DESCRIPTION_MAX_LEN))]
    pub description: Option<String>,
}

/// DTO for returning quiz data to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub author_username: String,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for QuizResponse {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            author_username: quiz.owner_username.clone(),
            question_count: quiz.questions.len(),
            created_at: quiz.created_at,
        }
    }
}
