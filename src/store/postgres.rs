// src/store/postgres.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction, postgres::PgPoolOptions, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, StoredAnswer},
        question::{
            Choice, MatchPair, Question, QuestionBody, QuestionRequest, QuestionRequestKind,
            QuestionType,
        },
        quiz::Quiz,
        submission::SubmittedAnswer,
        user::{NewUser, User},
    },
    store::{AttemptRepository, QuizRepository, UserRepository},
};

const CONNECT_RETRIES: u32 = 5;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    description: Option<String>,
    user_id: i64,
    username: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    quiz_id: i64,
    text: String,
    question_type: String,
    correct_answer: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct ChoiceRow {
    id: i64,
    question_id: i64,
    text: String,
    is_correct: bool,
}

#[derive(sqlx::FromRow)]
struct PairRow {
    id: i64,
    question_id: i64,
    source_item: String,
    target_item: String,
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: i64,
    user_id: i64,
    quiz_id: i64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    score: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    question_id: i64,
    is_correct: bool,
    payload: Json<SubmittedAnswer>,
}

const QUIZ_SELECT: &str = r#"
    SELECT q.id, q.title, q.description, q.user_id, u.username, q.created_at
    FROM quizzes q
    JOIN users u ON u.id = q.user_id
"#;

const QUESTION_SELECT: &str =
    "SELECT id, quiz_id, text, question_type, correct_answer FROM questions";

fn unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry, then applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after {} retries: {}",
                            CONNECT_RETRIES, e
                        )));
                    }
                    tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }

    /// Attaches choices and pairs to question rows. Unknown `question_type`
    /// values mean the table was written by something else; that is fatal.
    async fn hydrate(&self, rows: Vec<QuestionRow>) -> Result<Vec<Question>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let choice_rows = sqlx::query_as::<_, ChoiceRow>(
            r#"
            SELECT id, question_id, text, is_correct
            FROM choices
            WHERE question_id = ANY($1)
            ORDER BY question_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let pair_rows = sqlx::query_as::<_, PairRow>(
            r#"
            SELECT id, question_id, source_item, target_item
            FROM match_pairs
            WHERE question_id = ANY($1)
            ORDER BY question_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut choices: HashMap<i64, Vec<Choice>> = HashMap::new();
        for c in choice_rows {
            choices.entry(c.question_id).or_default().push(Choice {
                id: c.id,
                text: c.text,
                correct: c.is_correct,
            });
        }

        let mut pairs: HashMap<i64, Vec<MatchPair>> = HashMap::new();
        for p in pair_rows {
            pairs.entry(p.question_id).or_default().push(MatchPair {
                id: p.id,
                source_item: p.source_item,
                target_item: p.target_item,
            });
        }

        rows.into_iter()
            .map(|row| {
                let question_type = QuestionType::parse(&row.question_type).ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Unknown question type '{}' for question {}",
                        row.question_type, row.id
                    ))
                })?;

                let body = match question_type {
                    QuestionType::TrueFalse => QuestionBody::TrueFalse {
                        correct_answer: row.correct_answer.ok_or_else(|| {
                            AppError::InternalServerError(format!(
                                "TRUE_FALSE question {} has no correct answer",
                                row.id
                            ))
                        })?,
                    },
                    QuestionType::MultipleChoice => QuestionBody::MultipleChoice {
                        choices: choices.remove(&row.id).unwrap_or_default(),
                    },
                    QuestionType::Matching => QuestionBody::Matching {
                        pairs: pairs.remove(&row.id).unwrap_or_default(),
                    },
                };

                Ok(Question {
                    id: row.id,
                    quiz_id: row.quiz_id,
                    text: row.text,
                    body,
                })
            })
            .collect()
    }

    async fn assemble(&self, row: QuizRow) -> Result<Quiz, AppError> {
        let question_rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "{} WHERE quiz_id = $1 ORDER BY id",
            QUESTION_SELECT
        ))
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            owner_id: row.user_id,
            owner_username: row.username,
            created_at: row.created_at,
            questions: self.hydrate(question_rows).await?,
        })
    }

    async fn fetch_quiz_row(&self, quiz_id: i64) -> Result<Option<QuizRow>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!("{} WHERE q.id = $1", QUIZ_SELECT))
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

/// Writes the variant-specific columns and child rows of a question.
async fn write_answer_key(
    tx: &mut Transaction<'_, Postgres>,
    question_id: i64,
    kind: &QuestionRequestKind,
) -> Result<(), AppError> {
    match kind {
        QuestionRequestKind::TrueFalse { .. } => {}
        QuestionRequestKind::MultipleChoice { choices } => {
            for (position, choice) in choices.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO choices (question_id, position, text, is_correct) VALUES ($1, $2, $3, $4)",
                )
                .bind(question_id)
                .bind(position as i32)
                .bind(&choice.text)
                .bind(choice.correct)
                .execute(&mut **tx)
                .await?;
            }
        }
        QuestionRequestKind::Matching { pairs } => {
            for (position, pair) in pairs.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO match_pairs (question_id, position, source_item, target_item) VALUES ($1, $2, $3, $4)",
                )
                .bind(question_id)
                .bind(position as i32)
                .bind(&pair.source_item)
                .bind(&pair.target_item)
                .execute(&mut **tx)
                .await?;
            }
        }
    }
    Ok(())
}

fn tf_answer(kind: &QuestionRequestKind) -> Option<bool> {
    match kind {
        QuestionRequestKind::TrueFalse { correct_answer } => Some(*correct_answer),
        _ => None,
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password, role, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                AppError::Conflict("Username or email is already in use".to_string())
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(row.into())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn insert_quiz(
        &self,
        owner_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Quiz, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO quizzes (title, description, user_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(title)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        let row = self
            .fetch_quiz_row(id)
            .await?
            .ok_or_else(|| AppError::InternalServerError(format!("Quiz {} vanished after insert", id)))?;
        self.assemble(row).await
    }

    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        match self.fetch_quiz_row(quiz_id).await? {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_quizzes_by_owner(&self, owner_id: i64) -> Result<Vec<Quiz>, AppError> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "{} WHERE q.user_id = $1 ORDER BY q.id DESC",
            QUIZ_SELECT
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in rows {
            quizzes.push(self.assemble(row).await?);
        }
        Ok(quizzes)
    }

    async fn update_quiz(
        &self,
        quiz_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Quiz>, AppError> {
        let result = sqlx::query("UPDATE quizzes SET title = $1, description = $2 WHERE id = $3")
            .bind(title)
            .bind(description)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_quiz(quiz_id).await
    }

    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if foreign_key_violation(&e) {
                    AppError::Conflict(format!(
                        "Quiz {} has recorded attempts and cannot be deleted",
                        quiz_id
                    ))
                } else {
                    tracing::error!("Failed to delete quiz: {:?}", e);
                    AppError::from(e)
                }
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_question(
        &self,
        quiz_id: i64,
        request: &QuestionRequest,
    ) -> Result<Question, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (quiz_id, text, question_type, correct_answer)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(&request.text)
        .bind(request.kind.question_type().as_str())
        .bind(tf_answer(&request.kind))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e) {
                AppError::NotFound(format!("Quiz not found with id: {}", quiz_id))
            } else {
                AppError::from(e)
            }
        })?;

        write_answer_key(&mut tx, id, &request.kind).await?;
        tx.commit().await?;

        self.find_question(id)
            .await?
            .ok_or_else(|| AppError::InternalServerError(format!("Question {} vanished after insert", id)))
    }

    async fn find_question(&self, question_id: i64) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!("{} WHERE id = $1", QUESTION_SELECT))
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn replace_question(
        &self,
        question_id: i64,
        request: &QuestionRequest,
    ) -> Result<Option<Question>, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE questions SET text = $1, correct_answer = $2 WHERE id = $3")
            .bind(&request.text)
            .bind(tf_answer(&request.kind))
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM choices WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM match_pairs WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        write_answer_key(&mut tx, question_id, &request.kind).await?;
        tx.commit().await?;

        self.find_question(question_id).await
    }

    async fn delete_question(&self, question_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn insert_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<QuizAttempt, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO quiz_attempts (user_id, quiz_id, started_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, quiz_id, started_at, finished_at, score
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e) {
                AppError::NotFound(format!("Quiz not found with id: {}", quiz_id))
            } else {
                AppError::from(e)
            }
        })?;

        Ok(QuizAttempt {
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            score: row.score,
            answers: Vec::new(),
        })
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let Some(row) = sqlx::query_as::<_, AttemptRow>(
            "SELECT id, user_id, quiz_id, started_at, finished_at, score FROM quiz_attempts WHERE id = $1",
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let answers = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT question_id, is_correct, payload
            FROM attempt_answers
            WHERE attempt_id = $1
            ORDER BY position
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|a| StoredAnswer {
            question_id: a.question_id,
            correct: a.is_correct,
            answer: a.payload.0,
        })
        .collect();

        Ok(Some(QuizAttempt {
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            score: row.score,
            answers,
        }))
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        answers: &[StoredAnswer],
        finished_at: DateTime<Utc>,
        score: f64,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here serializes concurrent submissions; the
        // loser re-evaluates `finished_at IS NULL` and matches nothing.
        let result = sqlx::query(
            r#"
            UPDATE quiz_attempts
            SET finished_at = $2, score = $3
            WHERE id = $1 AND finished_at IS NULL
            "#,
        )
        .bind(attempt_id)
        .bind(finished_at)
        .bind(score)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for (position, answer) in answers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO attempt_answers
                (attempt_id, question_id, position, question_type, payload, is_correct)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attempt_id)
            .bind(answer.question_id)
            .bind(position as i32)
            .bind(answer.answer.question_type().as_str())
            .bind(Json(&answer.answer))
            .bind(answer.correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
