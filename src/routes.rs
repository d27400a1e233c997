// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, question, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public: registration, login and quiz details.
/// * Everything else requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let public_quiz_routes = Router::new().route("/{quiz_id}", get(quiz::get_quiz));

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route("/my-quizzes", get(quiz::list_my_quizzes))
        .route(
            "/{quiz_id}",
            axum::routing::put(quiz::update_quiz).delete(quiz::delete_quiz),
        )
        .route(
            "/{quiz_id}/questions",
            post(question::add_question).get(question::list_questions),
        )
        .route(
            "/{quiz_id}/questions/{question_id}",
            get(question::get_question)
                .put(question::update_question)
                .delete(question::delete_question),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let attempt_routes = Router::new()
        .route("/start/{quiz_id}", post(attempt::start_quiz))
        .route("/{attempt_id}/submit", post(attempt::submit_answers))
        .route("/{attempt_id}", get(attempt::get_attempt))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", public_quiz_routes.merge(quiz_routes))
        .nest("/api/attempts", attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
