// src/services/access.rs
//
// Ownership predicates evaluated before quiz and attempt operations.

use crate::{
    error::AppError,
    models::{attempt::QuizAttempt, quiz::Quiz, user::Principal},
    store::{AttemptRepository, QuizRepository},
};

/// Loads the quiz if the caller owns it or is an admin.
pub async fn ensure_quiz_owner<S>(
    store: &S,
    quiz_id: i64,
    principal: &Principal,
) -> Result<Quiz, AppError>
where
    S: QuizRepository + ?Sized,
{
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz not found with id: {}", quiz_id)))?;

    if quiz.owner_id != principal.user_id && !principal.is_admin() {
        tracing::warn!(
            "User {} denied access to quiz {}",
            principal.user_id,
            quiz_id
        );
        return Err(AppError::Forbidden(
            "You are not the owner of this quiz".to_string(),
        ));
    }

    Ok(quiz)
}

/// Loads the attempt if the caller took it. Admins pass when `allow_admin`.
pub async fn ensure_attempt_owner<S>(
    store: &S,
    attempt_id: i64,
    principal: &Principal,
    allow_admin: bool,
) -> Result<QuizAttempt, AppError>
where
    S: AttemptRepository + ?Sized,
{
    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Quiz attempt not found with id: {}", attempt_id))
        })?;

    let admin_override = allow_admin && principal.is_admin();
    if attempt.user_id != principal.user_id && !admin_override {
        tracing::warn!(
            "User {} denied access to attempt {}",
            principal.user_id,
            attempt_id
        );
        return Err(AppError::Forbidden(
            "You are not the owner of this attempt".to_string(),
        ));
    }

    Ok(attempt)
}
