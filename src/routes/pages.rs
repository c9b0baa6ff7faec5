//! HTML handlers: the quiz page and its two form posts.
//! Form posts redirect back to `/` (303) so a reload never resubmits.

use std::{collections::HashMap, sync::Arc};
use axum::{extract::State, Form, response::{Html, IntoResponse, Redirect}};
use tracing::{info, instrument};

use crate::logic;
use crate::protocol::submission_from_form;
use crate::routes::HandlerError;
use crate::state::AppState;

#[instrument(level = "debug", skip(state))]
pub async fn page_index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Html(state.page.render_page())
}

#[instrument(level = "info", skip(state, form), fields(field_count = form.len()))]
pub async fn page_submit(
  State(state): State<Arc<AppState>>,
  Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, HandlerError> {
  let outcome = logic::submit(&state, submission_from_form(&form)).await?;
  info!(target: "round", ?outcome, "Form submission handled");
  Ok(Redirect::to("/"))
}

#[instrument(level = "info", skip(state))]
pub async fn page_new_player(State(state): State<Arc<AppState>>) -> Result<Redirect, HandlerError> {
  logic::new_player(&state).await?;
  Ok(Redirect::to("/"))
}
