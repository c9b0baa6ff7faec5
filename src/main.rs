//! Trivia Quiz
//!
//! - Multiple-choice rounds fetched from Open Trivia DB (or a local TOML bank)
//! - Server-rendered quiz page + small JSON API (axum)
//! - One player profile on disk: `username` cookie + `scores` ledger
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   PROFILE_DIR       : profile directory (default "./profile")
//!   TRIVIA_API_URL    : default "https://opentdb.com/api.php"
//!   QUESTION_COUNT    : questions per round (default 10)
//!   IDENTITY_TTL_DAYS : username cookie lifetime (default 7)
//!   QUIZ_CONFIG_PATH  : path to TOML config (quiz/provider settings + optional question bank)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod clock;
mod config;
mod cookies;
mod domain;
mod identity;
mod ledger;
mod logic;
mod protocol;
mod provider;
mod render;
mod routes;
mod session;
mod state;
mod storage;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Configuration and profile problems stop startup here.
  let cfg = AppConfig::load_from_env()?;
  let state = Arc::new(AppState::from_config(&cfg)?);

  if !cfg.static_dir.is_dir() {
    warn!(target: "trivia_quiz", dir = %cfg.static_dir.display(), "Static directory missing; /static will 404");
  }

  // First round starts before the listener so the page opens on "loading".
  let ticket = logic::start(&state).await?;
  logic::spawn_round(&state, ticket);

  let app = build_router(state.clone(), &cfg.static_dir);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "trivia_quiz", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "trivia_quiz", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "trivia_quiz", error = %e, "Could not listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
}
