// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::quiz::QuizRequest,
    services::{access::ensure_quiz_owner, authoring},
    store::DynStore,
    utils::jwt::Claims,
};

pub async fn create_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let principal = claims.principal()?;

    let quiz = authoring::create_quiz(store.as_ref(), &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Public quiz details. Questions are not included.
pub async fn get_quiz(
    State(store): State<DynStore>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = authoring::get_quiz(store.as_ref(), quiz_id).await?;
    Ok(Json(quiz))
}

pub async fn list_my_quizzes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    let quizzes = authoring::list_my_quizzes(store.as_ref(), &principal).await?;
    Ok(Json(quizzes))
}

pub async fn update_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    let Json(payload) = payload?;
    let quiz = authoring::update_quiz(store.as_ref(), quiz_id, payload).await?;
    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal()?;
    ensure_quiz_owner(store.as_ref(), quiz_id, &principal).await?;

    authoring::delete_quiz(store.as_ref(), quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
