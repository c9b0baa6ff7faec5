//! Router assembly: quiz page + form posts, JSON API, static files, CORS, and HTTP tracing.

use std::{path::Path, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, Level};

use crate::protocol::ErrorOut;
use crate::session::SessionError;
use crate::state::AppState;

pub mod http;
pub mod pages;

/// Build the application router with:
/// - quiz page at `/`, form posts at `/submit` and `/new-player`
/// - JSON API under `/api/v1/...`
/// - optional stylesheet and assets from `static_dir` under `/static`
/// - CORS (allow any origin/method/headers) for the JSON API
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        // HTML
        .route("/", get(pages::page_index))
        .route("/submit", post(pages::page_submit))
        .route("/new-player", post(pages::page_new_player))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/scores", get(http::http_get_scores))
        .route("/api/v1/identity", get(http::http_get_identity))
        .route("/api/v1/round", get(http::http_get_round))
        .route("/api/v1/answers", post(http::http_post_answers))
        .route("/api/v1/new-player", post(http::http_post_new_player))
        .nest_service("/static", ServeDir::new(static_dir))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Session failures are storage failures; report them as 500s.
pub struct HandlerError(SessionError);

impl From<SessionError> for HandlerError {
    fn from(e: SessionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        error!(target: "trivia_quiz", error = %self.0, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorOut { error: self.0.to_string() }),
        )
            .into_response()
    }
}
