//! JSON API handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::logic;
use crate::protocol::*;
use crate::routes::HandlerError;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_scores(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let scores = state.session.lock().await.scores();
  info!(target: "trivia_quiz", entries = scores.len(), "HTTP scores served");
  Json(scores)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_identity(State(state): State<Arc<AppState>>) -> Result<Json<IdentityOut>, HandlerError> {
  let username = state.session.lock().await.identity()?;
  Ok(Json(IdentityOut { username }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_round(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let session = state.session.lock().await;
  Json(RoundOut {
    phase: session.phase(),
    round: session.current_round(),
    questions: session.questions().iter().map(QuestionOut::from).collect(),
    error: session.error_message().map(str::to_string),
  })
}

#[instrument(level = "info", skip(state, body), fields(answered = body.selections.len()))]
pub async fn http_post_answers(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswersIn>,
) -> Result<Json<SubmitOut>, HandlerError> {
  let outcome = logic::submit(&state, body.into()).await?;
  info!(target: "round", ?outcome, "HTTP answers evaluated");
  Ok(Json(outcome.into()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_new_player(State(state): State<Arc<AppState>>) -> Result<Json<IdentityOut>, HandlerError> {
  logic::new_player(&state).await?;
  Ok(Json(IdentityOut { username: None }))
}
