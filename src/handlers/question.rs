// src/handlers/question.rs
//
// Question management, scoped to a quiz the caller owns.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::question::QuestionRequest,
    services::{access::ensure_quiz_owner, authoring},
    store::DynStore,
    utils::jwt::Claims,
};

pub async fn add_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    let Json(payload) = payload?;
    let question = authoring::add_question(store.as_ref(), quiz_id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists questions with their answer keys, in insertion order.
pub async fn list_questions(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    let questions = authoring::list_questions(store.as_ref(), quiz_id).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    let question = authoring::get_question(store.as_ref(), quiz_id, question_id).await?;
    Ok(Json(question))
}

pub async fn update_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    let Json(payload) = payload?;
    let question =
        authoring::update_question(store.as_ref(), quiz_id, question_id, payload).await?;
    Ok(Json(question))
}

pub async fn delete_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    authoring::delete_question(store.as_ref(), quiz_id, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
