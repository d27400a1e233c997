// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::submission::QuizSubmission,
    services::{access::ensure_attempt_owner, attempts},
    store::DynStore,
    utils::jwt::Claims,
};

/// Starts a new attempt on any quiz. Correct answers are never included.
pub async fn start_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    let started = attempts::start_quiz(store.as_ref(), quiz_id, &principal).await?;
    Ok(Json(started))
}

/// Grades and finalizes the caller's attempt. Only the taker may submit.
pub async fn submit_answers(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    payload: Result<Json<QuizSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    let attempt = ensure_attempt_owner(store.as_ref(), attempt_id, &principal, false).await?;

    let Json(payload) = payload?;
    let result = attempts::submit_answers(store.as_ref(), &attempt, payload).await?;
    Ok(Json(result))
}

pub async fn get_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    let attempt = ensure_attempt_owner(store.as_ref(), attempt_id, &principal, true).await?;

    let summary = attempts::get_attempt(store.as_ref(), attempt).await?;
    Ok(Json(summary))
}
