//! Public protocol structs for the JSON API and the HTML form (serde ready).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{RenderedQuestion, RoundId, ScoreRecord};
use crate::session::{RoundPhase, Submission, SubmitOutcome};

/// Read a posted quiz form: `round`, `username`, and one `answer{index}`
/// field per answered question carrying the option position. Fields that do
/// not parse are dropped, which scores them as unanswered.
pub fn submission_from_form(fields: &HashMap<String, String>) -> Submission {
  let selections = fields
    .iter()
    .filter_map(|(k, v)| {
      let index = k.strip_prefix("answer")?.parse::<usize>().ok()?;
      let pos = v.trim().parse::<usize>().ok()?;
      Some((index, pos))
    })
    .collect();
  Submission {
    round: fields.get("round").and_then(|r| RoundId::parse(r)),
    username: fields.get("username").cloned(),
    selections,
  }
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

#[derive(Serialize)]
pub struct IdentityOut {
  pub username: Option<String>,
}

/// Question as shown to a client: text only, no correct-answer marker.
#[derive(Serialize)]
pub struct QuestionOut {
  pub index: usize,
  pub prompt: String,
  pub category: Option<String>,
  pub difficulty: Option<String>,
  pub options: Vec<String>,
}

impl From<&RenderedQuestion> for QuestionOut {
  fn from(q: &RenderedQuestion) -> Self {
    Self {
      index: q.index,
      prompt: q.prompt.clone(),
      category: q.category.clone(),
      difficulty: q.difficulty.clone(),
      options: q.options.iter().map(|o| o.display_text.clone()).collect(),
    }
  }
}

#[derive(Serialize)]
pub struct RoundOut {
  pub phase: RoundPhase,
  pub round: Option<RoundId>,
  pub questions: Vec<QuestionOut>,
  pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswersIn {
  #[serde(default)]
  pub round: Option<RoundId>,
  #[serde(default)]
  pub username: Option<String>,
  /// Question index -> selected option position.
  #[serde(default)]
  pub selections: BTreeMap<usize, usize>,
}

impl From<AnswersIn> for Submission {
  fn from(a: AnswersIn) -> Self {
    Submission { round: a.round, username: a.username, selections: a.selections }
  }
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOut {
  Scored { record: ScoreRecord },
  Retried,
  Ignored { reason: &'static str },
}

impl From<SubmitOutcome> for SubmitOut {
  fn from(o: SubmitOutcome) -> Self {
    match o {
      SubmitOutcome::Scored { record, .. } => SubmitOut::Scored { record },
      SubmitOutcome::Retried { .. } => SubmitOut::Retried,
      SubmitOutcome::Ignored { reason } => SubmitOut::Ignored { reason },
    }
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}
