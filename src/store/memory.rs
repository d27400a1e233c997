// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, StoredAnswer},
        question::{Choice, MatchPair, Question, QuestionBody, QuestionRequest, QuestionRequestKind},
        quiz::Quiz,
        user::{NewUser, User},
    },
    store::{AttemptRepository, QuizRepository, UserRepository},
};

#[derive(Debug, Clone)]
struct QuizRow {
    id: i64,
    title: String,
    description: Option<String>,
    owner_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    quizzes: BTreeMap<i64, QuizRow>,
    questions: BTreeMap<i64, Question>,
    attempts: HashMap<i64, QuizAttempt>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn build_body(&mut self, kind: &QuestionRequestKind) -> QuestionBody {
        match kind {
            QuestionRequestKind::TrueFalse { correct_answer } => QuestionBody::TrueFalse {
                correct_answer: *correct_answer,
            },
            QuestionRequestKind::MultipleChoice { choices } => QuestionBody::MultipleChoice {
                choices: choices
                    .iter()
                    .map(|c| Choice {
                        id: self.next_id(),
                        text: c.text.clone(),
                        correct: c.correct,
                    })
                    .collect(),
            },
            QuestionRequestKind::Matching { pairs } => QuestionBody::Matching {
                pairs: pairs
                    .iter()
                    .map(|p| MatchPair {
                        id: self.next_id(),
                        source_item: p.source_item.clone(),
                        target_item: p.target_item.clone(),
                    })
                    .collect(),
            },
        }
    }

    fn assemble(&self, row: &QuizRow) -> Result<Quiz, AppError> {
        let owner = self.users.get(&row.owner_id).ok_or_else(|| {
            AppError::InternalServerError(format!("Owner {} of quiz {} missing", row.owner_id, row.id))
        })?;

        Ok(Quiz {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            owner_id: row.owner_id,
            owner_username: owner.username.clone(),
            created_at: row.created_at,
            questions: self
                .questions
                .values()
                .filter(|q| q.quiz_id == row.id)
                .cloned()
                .collect(),
        })
    }
}

/// In-process store. Each method holds a single lock for its whole body,
/// which makes every operation atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::InternalServerError("Store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.lock()?;

        if inner.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already in use",
                user.email
            )));
        }

        let created = User {
            id: inner.next_id(),
            username: user.username,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.lock()?;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn insert_quiz(
        &self,
        owner_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Quiz, AppError> {
        let mut inner = self.lock()?;
        let row = QuizRow {
            id: inner.next_id(),
            title: title.to_string(),
            description: description.map(str::to_string),
            owner_id,
            created_at: Utc::now(),
        };
        inner.quizzes.insert(row.id, row.clone());
        inner.assemble(&row)
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let inner = self.lock()?;
        inner
            .quizzes
            .get(&quiz_id)
            .map(|row| inner.assemble(row))
            .transpose()
    }

    async fn list_quizzes_by_owner(&self, owner_id: i64) -> Result<Vec<Quiz>, AppError> {
        let inner = self.lock()?;
        inner
            .quizzes
            .values()
            .rev()
            .filter(|row| row.owner_id == owner_id)
            .map(|row| inner.assemble(row))
            .collect()
    }

    async fn update_quiz(
        &self,
        quiz_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Quiz>, AppError> {
        let mut inner = self.lock()?;
        let Some(row) = inner.quizzes.get_mut(&quiz_id) else {
            return Ok(None);
        };
        row.title = title.to_string();
        row.description = description.map(str::to_string);
        let row = row.clone();
        inner.assemble(&row).map(Some)
    }

    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        if !inner.quizzes.contains_key(&quiz_id) {
            return Ok(false);
        }
        if inner.attempts.values().any(|a| a.quiz_id == quiz_id) {
            return Err(AppError::Conflict(format!(
                "Quiz {} has recorded attempts and cannot be deleted",
                quiz_id
            )));
        }
        inner.quizzes.remove(&quiz_id);
        inner.questions.retain(|_, q| q.quiz_id != quiz_id);
        Ok(true)
    }

    async fn insert_question(
        &self,
        quiz_id: i64,
        request: &QuestionRequest,
    ) -> Result<Question, AppError> {
        let mut inner = self.lock()?;
        if !inner.quizzes.contains_key(&quiz_id) {
            return Err(AppError::NotFound(format!("Quiz not found with id: {}", quiz_id)));
        }
        let id = inner.next_id();
        let body = inner.build_body(&request.kind);
        let question = Question {
            id,
            quiz_id,
            text: request.text.clone(),
            body,
        };
        inner.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, AppError> {
        let inner = self.lock()?;
        Ok(inner.questions.get(&question_id).cloned())
    }

    async fn replace_question(
        &self,
        question_id: i64,
        request: &QuestionRequest,
    ) -> Result<Option<Question>, AppError> {
        let mut inner = self.lock()?;
        if !inner.questions.contains_key(&question_id) {
            return Ok(None);
        }
        let body = inner.build_body(&request.kind);
        let question = inner
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question not found with id: {}", question_id)))?;
        question.text = request.text.clone();
        question.body = body;
        Ok(Some(question.clone()))
    }

    async fn delete_question(&self, question_id: i64) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        Ok(inner.questions.remove(&question_id).is_some())
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn insert_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<QuizAttempt, AppError> {
        let mut inner = self.lock()?;
        let attempt = QuizAttempt {
            id: inner.next_id(),
            user_id,
            quiz_id,
            started_at,
            finished_at: None,
            score: None,
            answers: Vec::new(),
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let inner = self.lock()?;
        Ok(inner.attempts.get(&attempt_id).cloned())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        answers: &[StoredAnswer],
        finished_at: DateTime<Utc>,
        score: f64,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        let attempt = inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz attempt not found with id: {}", attempt_id)))?;

        if attempt.finished_at.is_some() {
            return Ok(false);
        }

        attempt.answers = answers.to_vec();
        attempt.finished_at = Some(finished_at);
        attempt.score = Some(score);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        question::{ChoiceRequest, MatchPairRequest},
        submission::SubmittedAnswer,
    };

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "author".into(),
                email: "author@example.com".into(),
                password_hash: "hash".into(),
                role: "user".into(),
            })
            .await
            .unwrap();
        (store, user)
    }

    fn mc_request(texts: &[&str]) -> QuestionRequest {
        QuestionRequest {
            text: "Pick".into(),
            kind: QuestionRequestKind::MultipleChoice {
                choices: texts
                    .iter()
                    .map(|t| ChoiceRequest {
                        text: t.to_string(),
                        correct: false,
                    })
                    .collect(),
            },
        }
    }

    #[tokio::test]
    async fn duplicate_username_and_email_conflict() {
        let (store, _) = seeded().await;

        let same_name = store
            .create_user(NewUser {
                username: "author".into(),
                email: "other@example.com".into(),
                password_hash: "hash".into(),
                role: "user".into(),
            })
            .await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let same_email = store
            .create_user(NewUser {
                username: "other".into(),
                email: "author@example.com".into(),
                password_hash: "hash".into(),
                role: "user".into(),
            })
            .await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn questions_keep_insertion_order_and_cascade() {
        let (store, user) = seeded().await;
        let quiz = store.insert_quiz(user.id, "Geography", None).await.unwrap();

        let first = store.insert_question(quiz.id, &mc_request(&["a", "b"])).await.unwrap();
        let second = store
            .insert_question(
                quiz.id,
                &QuestionRequest {
                    text: "Match".into(),
                    kind: QuestionRequestKind::Matching {
                        pairs: vec![MatchPairRequest {
                            source_item: "Poland".into(),
                            target_item: "Warsaw".into(),
                        }],
                    },
                },
            )
            .await
            .unwrap();

        let loaded = store.find_quiz(quiz.id).await.unwrap().unwrap();
        let ids: Vec<i64> = loaded.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(loaded.owner_username, "author");

        assert!(store.delete_quiz(quiz.id).await.unwrap());
        assert!(store.find_question(first.id).await.unwrap().is_none());
        assert!(!store.delete_quiz(quiz.id).await.unwrap());
    }

    #[tokio::test]
    async fn replace_question_reassigns_choice_ids() {
        let (store, user) = seeded().await;
        let quiz = store.insert_quiz(user.id, "Quiz", None).await.unwrap();
        let created = store.insert_question(quiz.id, &mc_request(&["a", "b"])).await.unwrap();

        let updated = store
            .replace_question(created.id, &mc_request(&["x", "y", "z"]))
            .await
            .unwrap()
            .unwrap();

        let (QuestionBody::MultipleChoice { choices: old }, QuestionBody::MultipleChoice { choices: new }) =
            (&created.body, &updated.body)
        else {
            panic!("expected multiple choice bodies");
        };
        assert_eq!(new.len(), 3);
        assert!(new.iter().all(|c| old.iter().all(|o| o.id != c.id)));
    }

    #[tokio::test]
    async fn finalize_only_once() {
        let (store, user) = seeded().await;
        let quiz = store.insert_quiz(user.id, "Quiz", None).await.unwrap();
        let attempt = store.insert_attempt(user.id, quiz.id, Utc::now()).await.unwrap();

        let answers = vec![StoredAnswer {
            question_id: 1,
            correct: true,
            answer: SubmittedAnswer::TrueFalse {
                submitted_answer: true,
            },
        }];

        assert!(store.finalize_attempt(attempt.id, &answers, Utc::now(), 100.0).await.unwrap());
        assert!(!store.finalize_attempt(attempt.id, &[], Utc::now(), 0.0).await.unwrap());

        let stored = store.find_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored.score, Some(100.0));
        assert_eq!(stored.answers, answers);
    }

    #[tokio::test]
    async fn quiz_with_attempts_cannot_be_deleted() {
        let (store, user) = seeded().await;
        let quiz = store.insert_quiz(user.id, "Quiz", None).await.unwrap();
        store.insert_attempt(user.id, quiz.id, Utc::now()).await.unwrap();

        let result = store.delete_quiz(quiz.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
