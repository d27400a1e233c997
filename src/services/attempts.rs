// src/services/attempts.rs
//
// Attempt lifecycle: IN_PROGRESS (finished_at unset) -> FINISHED.
// The only transition is a single successful submission.

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    engine::{grading::grade_quiz, playable::to_playable},
    error::AppError,
    models::{
        attempt::{AttemptSummary, QuizAttempt, QuizResult, StartAttemptResponse},
        submission::{AnswerSubmission, QuizSubmission},
        user::Principal,
    },
    store::{AttemptRepository, QuizRepository},
};

/// Opens a new attempt and returns the answer-redacted questions.
/// Every call creates an independent attempt with a fresh shuffle.
pub async fn start_quiz<S>(
    store: &S,
    quiz_id: i64,
    principal: &Principal,
) -> Result<StartAttemptResponse, AppError>
where
    S: QuizRepository + AttemptRepository + ?Sized,
{
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz not found with id: {}", quiz_id)))?;

    let attempt = store
        .insert_attempt(principal.user_id, quiz.id, Utc::now())
        .await?;

    tracing::info!(
        "User {} started attempt {} on quiz {}",
        principal.user_id,
        attempt.id,
        quiz.id
    );

    Ok(StartAttemptResponse {
        attempt_id: attempt.id,
        questions: quiz.questions.iter().map(to_playable).collect(),
    })
}

/// Indexes answers by question id, rejecting duplicates and answers to
/// questions outside the quiz.
fn index_answers<'a>(
    quiz_id: i64,
    question_ids: &[i64],
    answers: &'a [AnswerSubmission],
) -> Result<HashMap<i64, &'a AnswerSubmission>, AppError> {
    let mut index = HashMap::with_capacity(answers.len());

    for answer in answers {
        if !question_ids.contains(&answer.question_id) {
            return Err(AppError::NotFound(format!(
                "Question {} not found in quiz {}",
                answer.question_id, quiz_id
            )));
        }
        if index.insert(answer.question_id, answer).is_some() {
            return Err(AppError::BadRequest(format!(
                "Duplicate answer for question {}",
                answer.question_id
            )));
        }
    }

    Ok(index)
}

/// Grades the submission and finalizes the attempt.
///
/// Either the answers, `finished_at` and the score are all stored, or nothing
/// is. A second submission, including one racing the first, gets `Conflict`.
pub async fn submit_answers<S>(
    store: &S,
    attempt: &QuizAttempt,
    submission: QuizSubmission,
) -> Result<QuizResult, AppError>
where
    S: QuizRepository + AttemptRepository + ?Sized,
{
    if attempt.finished_at.is_some() {
        return Err(AppError::Conflict(
            "Quiz attempt has already been submitted.".to_string(),
        ));
    }

    let quiz = store.find_quiz(attempt.quiz_id).await?.ok_or_else(|| {
        AppError::InternalServerError(format!(
            "Quiz {} of attempt {} is missing",
            attempt.quiz_id, attempt.id
        ))
    })?;

    let question_ids: Vec<i64> = quiz.questions.iter().map(|q| q.id).collect();
    let index = index_answers(quiz.id, &question_ids, &submission.answers)?;

    let graded = grade_quiz(&quiz.questions, &index)?;
    let stored = graded.stored_answers(&index);

    let finalized = store
        .finalize_attempt(attempt.id, &stored, Utc::now(), graded.score)
        .await?;
    if !finalized {
        tracing::warn!("Attempt {} was finalized by a concurrent submission", attempt.id);
        return Err(AppError::Conflict(
            "Quiz attempt has already been submitted.".to_string(),
        ));
    }

    tracing::info!(
        "Attempt {} finished: {}/{} correct ({:.2}%)",
        attempt.id,
        graded.correct_count,
        graded.total_questions,
        graded.score
    );

    Ok(QuizResult {
        attempt_id: attempt.id,
        quiz_title: quiz.title,
        total_questions: graded.total_questions,
        correct_answers_count: graded.correct_count,
        score: graded.score,
        graded_questions: graded.graded_questions,
    })
}

pub async fn get_attempt<S>(store: &S, attempt: QuizAttempt) -> Result<AttemptSummary, AppError>
where
    S: QuizRepository + ?Sized,
{
    let quiz_title = store
        .find_quiz(attempt.quiz_id)
        .await?
        .map(|q| q.title)
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Quiz {} of attempt {} is missing",
                attempt.quiz_id, attempt.id
            ))
        })?;

    Ok(AttemptSummary {
        attempt_id: attempt.id,
        quiz_id: attempt.quiz_id,
        quiz_title,
        status: attempt.status(),
        started_at: attempt.started_at,
        finished_at: attempt.finished_at,
        score: attempt.score,
        answers: attempt.answers,
    })
}
