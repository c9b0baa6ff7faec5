//! Round driving shared by the HTML form handlers and the JSON API.
//!
//! The session mutex is never held across the network fetch: a round is
//! begun under the lock, fetched without it, and completed under it again.
//! Profile reads and writes do happen under the lock; they are small,
//! blocking file operations (see `storage`).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::session::{RoundTicket, SessionError, Submission, SubmitOutcome};
use crate::state::AppState;

/// Fetch questions for `ticket` and hand the result to the session.
#[instrument(level = "info", skip(state), fields(round = %ticket.round, provider = state.provider.name()))]
pub async fn run_round(state: Arc<AppState>, ticket: RoundTicket) {
  let result = state.provider.fetch(ticket.count).await;
  let mut session = state.session.lock().await;
  let applied = session.complete_round(ticket, result, &mut rand::thread_rng());
  info!(target: "round", applied, phase = ?session.phase(), "Round fetch finished");
}

pub fn spawn_round(state: &Arc<AppState>, ticket: Option<RoundTicket>) {
  if let Some(ticket) = ticket {
    tokio::spawn(run_round(state.clone(), ticket));
  }
}

#[instrument(level = "info", skip(state))]
pub async fn start(state: &Arc<AppState>) -> Result<Option<RoundTicket>, SessionError> {
  state.session.lock().await.start()
}

#[instrument(level = "info", skip(state, submission))]
pub async fn submit(state: &Arc<AppState>, submission: Submission) -> Result<SubmitOutcome, SessionError> {
  let outcome = state.session.lock().await.submit(submission)?;
  let next = match &outcome {
    SubmitOutcome::Scored { next, .. } | SubmitOutcome::Retried { next } => *next,
    SubmitOutcome::Ignored { .. } => None,
  };
  spawn_round(state, next);
  Ok(outcome)
}

#[instrument(level = "info", skip(state))]
pub async fn new_player(state: &Arc<AppState>) -> Result<(), SessionError> {
  state.session.lock().await.new_player()
}

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::Arc;

  use crate::clock::{fixed_now, Clock};
  use crate::provider::{sample_question, QuestionBank, QuestionProvider};
  use crate::session::SessionSettings;
  use crate::state::AppState;
  use crate::storage::MemoryStore;

  pub fn bank() -> QuestionBank {
    QuestionBank::new(vec![
      sample_question("Paris", ["London", "Berlin", "Rome"]),
      sample_question("Oslo", ["Bergen", "Malmo", "Turku"]),
    ])
  }

  pub fn app_state(provider: Arc<dyn QuestionProvider>) -> Arc<AppState> {
    Arc::new(AppState::new(
      provider,
      Arc::new(MemoryStore::new()),
      Arc::new(MemoryStore::new()),
      Clock::Fixed(fixed_now()),
      SessionSettings::default(),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::testing::{app_state, bank};
  use super::*;
  use crate::provider::QuestionBank;
  use crate::session::RoundPhase;

  #[tokio::test]
  async fn start_then_fetch_reaches_ready() {
    let state = app_state(Arc::new(bank()));
    let ticket = start(&state).await.unwrap().unwrap();
    run_round(state.clone(), ticket).await;

    let session = state.session.lock().await;
    assert_eq!(session.phase(), RoundPhase::Ready);
    // The bank holds two questions; a batch of ten draws all of them.
    assert_eq!(session.questions().len(), 2);
    assert_eq!(state.page.snapshot().questions.len(), 2);
  }

  #[tokio::test]
  async fn failed_fetch_lands_in_error() {
    let state = app_state(Arc::new(QuestionBank::new(Vec::new())));
    let ticket = start(&state).await.unwrap().unwrap();
    run_round(state.clone(), ticket).await;

    assert_eq!(state.session.lock().await.phase(), RoundPhase::Error);
    assert!(state.page.snapshot().error.is_some());
  }

  #[tokio::test]
  async fn submit_records_and_starts_next_round() {
    let state = app_state(Arc::new(bank()));
    let ticket = start(&state).await.unwrap().unwrap();
    run_round(state.clone(), ticket).await;

    let outcome = submit(&state, Submission { username: Some("ivy".into()), ..Default::default() })
      .await
      .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Scored { next: Some(_), .. }));
    assert_eq!(state.session.lock().await.scores().len(), 1);

    new_player(&state).await.unwrap();
    assert_eq!(state.page.snapshot().username, None);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn profile_files_survive_a_full_round() {
    use crate::config::{AppConfig, ProviderKind};
    use crate::provider::sample_question;
    use crate::state::LOCAL_STORAGE_FILE;
    use crate::storage::scratch_dir;

    let dir = scratch_dir("logic-profile");
    let mut cfg = AppConfig { profile_dir: dir.clone(), questions: vec![sample_question("Paris", ["London", "Berlin", "Rome"])], ..AppConfig::default() };
    cfg.provider.kind = ProviderKind::LocalBank;
    let state = Arc::new(AppState::from_config(&cfg).unwrap());

    let ticket = start(&state).await.unwrap().unwrap();
    run_round(state.clone(), ticket).await;
    let outcome = submit(&state, Submission { username: Some("uma".into()), ..Default::default() })
      .await
      .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Scored { .. }));

    let raw = std::fs::read_to_string(dir.join(LOCAL_STORAGE_FILE)).unwrap();
    assert!(raw.contains("uma"));
    assert_eq!(state.session.lock().await.identity().unwrap().as_deref(), Some("uma"));

    let _ = std::fs::remove_dir_all(dir);
  }
}
