// src/store/mod.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, StoredAnswer},
        question::{Question, QuestionRequest},
        quiz::Quiz,
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn insert_quiz(
        &self,
        owner_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Quiz, AppError>;

    /// Loads a quiz with its questions in stored order.
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    async fn list_quizzes_by_owner(&self, owner_id: i64) -> Result<Vec<Quiz>, AppError>;

    /// Returns `None` if the quiz does not exist.
    async fn update_quiz(
        &self,
        quiz_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Quiz>, AppError>;

    /// Deletes the quiz and its questions. Returns `false` if it did not exist.
    /// Fails with `Conflict` when attempts reference the quiz.
    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError>;

    /// Appends a question to the quiz. The quiz must exist.
    async fn insert_question(
        &self,
        quiz_id: i64,
        request: &QuestionRequest,
    ) -> Result<Question, AppError>;

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, AppError>;

    /// Overwrites text and answer key. Choices and pairs are cleared and
    /// re-inserted. The caller has already checked that the variant matches.
    async fn replace_question(
        &self,
        question_id: i64,
        request: &QuestionRequest,
    ) -> Result<Option<Question>, AppError>;

    async fn delete_question(&self, question_id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<QuizAttempt, AppError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError>;

    /// Atomically stores the answers and sets `finished_at` and `score`, but
    /// only if the attempt is still in progress. Returns `false` (and writes
    /// nothing) when it was already finished.
    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        answers: &[StoredAnswer],
        finished_at: DateTime<Utc>,
        score: f64,
    ) -> Result<bool, AppError>;
}

/// Everything the services need from persistence.
pub trait Store: UserRepository + QuizRepository + AttemptRepository {}

impl<T> Store for T where T: UserRepository + QuizRepository + AttemptRepository {}

pub type DynStore = Arc<dyn Store>;
