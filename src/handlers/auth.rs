// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest},
    services::auth,
    store::DynStore,
};

/// Registers a new user.
///
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(store): State<DynStore>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let user = auth::register(store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(store): State<DynStore>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let token = auth::login(store.as_ref(), &config, payload).await?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}
