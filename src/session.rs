//! Quiz session: the round state machine.
//!
//! `Idle -> Loading -> Ready -> Submitted -> Loading -> ...`, with `Error`
//! ending a round whose fetch failed.
//!
//! Rounds are serialized: while a fetch is outstanding no new round can
//! start, submissions are ignored, and results for any round other than the
//! outstanding one are dropped. The fetch itself runs outside the session
//! (see `logic::run_round`), driven by the `RoundTicket` handed out here.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::{Question, RenderedQuestion, RoundId, ScoreRecord};
use crate::identity::IdentityStore;
use crate::ledger::ScoreLedger;
use crate::provider::ProviderError;
use crate::render::{build_round, Presenter};
use crate::storage::StorageError;
use crate::util::clean_username;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
  #[error(transparent)]
  Storage(#[from] StorageError),
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
  pub question_count: usize,
  pub identity_ttl_days: i64,
  pub anonymous_name: String,
  pub sync_identity_on_start: bool,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self {
      question_count: 10,
      identity_ttl_days: 7,
      anonymous_name: "Anonymous".into(),
      sync_identity_on_start: true,
    }
  }
}

#[derive(Clone, Debug)]
pub enum RoundState {
  Idle,
  Loading { round: RoundId },
  Ready { round: RoundId, questions: Vec<RenderedQuestion> },
  Submitted { round: RoundId },
  Error { round: RoundId, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
  Idle,
  Loading,
  Ready,
  Submitted,
  Error,
}

/// Permission to fetch questions for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTicket {
  pub round: RoundId,
  pub count: usize,
}

/// A form submission: optional round echo, optional username input, and the
/// selected option position per question index.
#[derive(Clone, Debug, Default)]
pub struct Submission {
  pub round: Option<RoundId>,
  pub username: Option<String>,
  pub selections: BTreeMap<usize, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
  Scored { record: ScoreRecord, next: Option<RoundTicket> },
  Retried { next: Option<RoundTicket> },
  Ignored { reason: &'static str },
}

/// Count questions whose selected option carries the correct marker.
/// Unanswered questions and out-of-range positions score nothing.
pub fn score_selections(questions: &[RenderedQuestion], selections: &BTreeMap<usize, usize>) -> u32 {
  questions
    .iter()
    .filter(|q| {
      selections
        .get(&q.index)
        .and_then(|pos| q.options.get(*pos))
        .is_some_and(|opt| opt.is_correct)
    })
    .count() as u32
}

pub struct QuizSession {
  identity: IdentityStore,
  ledger: ScoreLedger,
  presenter: Box<dyn Presenter>,
  settings: SessionSettings,
  state: RoundState,
}

impl QuizSession {
  pub fn new(
    identity: IdentityStore,
    ledger: ScoreLedger,
    presenter: Box<dyn Presenter>,
    settings: SessionSettings,
  ) -> Self {
    Self { identity, ledger, presenter, settings, state: RoundState::Idle }
  }

  pub fn phase(&self) -> RoundPhase {
    match self.state {
      RoundState::Idle => RoundPhase::Idle,
      RoundState::Loading { .. } => RoundPhase::Loading,
      RoundState::Ready { .. } => RoundPhase::Ready,
      RoundState::Submitted { .. } => RoundPhase::Submitted,
      RoundState::Error { .. } => RoundPhase::Error,
    }
  }

  pub fn current_round(&self) -> Option<RoundId> {
    match &self.state {
      RoundState::Idle => None,
      RoundState::Loading { round }
      | RoundState::Ready { round, .. }
      | RoundState::Submitted { round }
      | RoundState::Error { round, .. } => Some(*round),
    }
  }

  pub fn questions(&self) -> &[RenderedQuestion] {
    match &self.state {
      RoundState::Ready { questions, .. } => questions,
      _ => &[],
    }
  }

  pub fn error_message(&self) -> Option<&str> {
    match &self.state {
      RoundState::Error { message, .. } => Some(message),
      _ => None,
    }
  }

  pub fn identity(&self) -> Result<Option<String>, SessionError> {
    Ok(self.identity.get_identity()?)
  }

  pub fn scores(&self) -> Vec<ScoreRecord> {
    self.ledger.list_all()
  }

  /// Initial render plus the first round.
  #[instrument(level = "info", skip(self))]
  pub fn start(&mut self) -> Result<Option<RoundTicket>, SessionError> {
    if self.settings.sync_identity_on_start {
      self.sync_identity()?;
    }
    let scores = self.ledger.list_all();
    self.presenter.render_scores(&scores);
    Ok(self.begin_round())
  }

  /// Enter `Loading`. Returns `None` while another fetch is outstanding.
  #[instrument(level = "info", skip(self))]
  pub fn begin_round(&mut self) -> Option<RoundTicket> {
    if let RoundState::Loading { round } = &self.state {
      warn!(target: "round", %round, "Fetch already outstanding; not starting another round");
      return None;
    }
    let round = RoundId::new();
    self.state = RoundState::Loading { round };
    self.presenter.show_error(None);
    self.presenter.show_loading(true);
    info!(target: "round", %round, count = self.settings.question_count, "Round loading");
    Some(RoundTicket { round, count: self.settings.question_count })
  }

  /// Apply a fetch result. Returns `false` when the ticket is not the
  /// outstanding round and the result was dropped.
  #[instrument(level = "info", skip(self, result, rng), fields(round = %ticket.round))]
  pub fn complete_round<R: Rng + ?Sized>(
    &mut self,
    ticket: RoundTicket,
    result: Result<Vec<Question>, ProviderError>,
    rng: &mut R,
  ) -> bool {
    match &self.state {
      RoundState::Loading { round } if *round == ticket.round => {}
      _ => {
        warn!(target: "round", phase = ?self.phase(), "Dropping result for a round that is not loading");
        return false;
      }
    }

    match result {
      Ok(fetched) => {
        let questions = build_round(&fetched, rng);
        self.presenter.render_questions(Some(ticket.round), &questions);
        info!(target: "round", questions = questions.len(), "Round ready");
        self.state = RoundState::Ready { round: ticket.round, questions };
      }
      Err(e) => {
        error!(target: "round", error = %e, "Error fetching questions");
        let message = format!("Could not load questions: {e}");
        self.presenter.render_questions(Some(ticket.round), &[]);
        self.presenter.show_error(Some(&message));
        self.state = RoundState::Error { round: ticket.round, message };
      }
    }
    self.presenter.show_loading(false);
    true
  }

  /// Score the current round, record it, and begin the next one.
  #[instrument(level = "info", skip(self, submission), fields(answered = submission.selections.len()))]
  pub fn submit(&mut self, submission: Submission) -> Result<SubmitOutcome, SessionError> {
    if let (Some(sent), Some(current)) = (submission.round, self.current_round()) {
      if sent != current {
        warn!(target: "round", %sent, %current, "Ignoring submission for a stale round");
        return Ok(SubmitOutcome::Ignored { reason: "stale round" });
      }
    }

    let round = match &self.state {
      RoundState::Ready { round, .. } => *round,
      RoundState::Error { round, .. } => {
        let round = *round;
        info!(target: "round", %round, "Submission after failed fetch; retrying");
        return Ok(SubmitOutcome::Retried { next: self.begin_round() });
      }
      _ => {
        let reason = match self.phase() {
          RoundPhase::Loading => "questions still loading",
          _ => "no round in progress",
        };
        warn!(target: "round", reason, "Ignoring submission");
        return Ok(SubmitOutcome::Ignored { reason });
      }
    };

    // The round stays Ready until the score is on disk, so a failed write
    // can be submitted again.
    let total = self.questions().len();
    let record = match self.record_score(self.questions(), &submission) {
      Ok(record) => record,
      Err(e) => {
        error!(target: "round", %round, error = %e, "Could not record score");
        return Err(e);
      }
    };
    self.state = RoundState::Submitted { round };

    let scores = self.ledger.list_all();
    self.presenter.render_scores(&scores);
    if let Err(e) = self.sync_identity() {
      warn!(target: "round", error = %e, "Score saved but identity display could not be refreshed");
    }
    info!(target: "round", %round, username = %record.username, score = record.score, total, "Round submitted");

    Ok(SubmitOutcome::Scored { record, next: self.begin_round() })
  }

  fn record_score(&self, questions: &[RenderedQuestion], submission: &Submission) -> Result<ScoreRecord, SessionError> {
    let username = match self.identity.get_identity()? {
      Some(name) => name,
      None => {
        let name = submission
          .username
          .as_deref()
          .and_then(clean_username)
          .unwrap_or_else(|| self.settings.anonymous_name.clone());
        self.identity.set_identity(&name, self.settings.identity_ttl_days)?;
        name
      }
    };
    let score = score_selections(questions, &submission.selections);
    Ok(self.ledger.append(&username, score)?)
  }

  /// Forget the current player.
  #[instrument(level = "info", skip(self))]
  pub fn new_player(&mut self) -> Result<(), SessionError> {
    self.identity.clear_identity()?;
    self.sync_identity()
  }

  fn sync_identity(&mut self) -> Result<(), SessionError> {
    let username = self.identity.get_identity()?;
    self.presenter.sync_identity(username.as_deref());
    Ok(())
  }
}
