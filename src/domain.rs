//! Domain models: questions as fetched, questions as rendered, score records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A multiple-choice question as supplied by a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub prompt: String,
  pub correct_answer: String,
  pub incorrect_answers: Vec<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub difficulty: Option<String>,
}

/// One selectable answer. `is_correct` is the correct-answer marker that
/// scoring reads back; it never leaves the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOption {
  pub display_text: String,
  pub is_correct: bool,
  pub question_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedQuestion {
  pub index: usize,
  pub prompt: String,
  pub category: Option<String>,
  pub difficulty: Option<String>,
  pub options: Vec<AnswerOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
  pub username: String,
  pub score: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub Uuid);

impl RoundId {
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  pub fn parse(s: &str) -> Option<Self> {
    Uuid::parse_str(s.trim()).ok().map(Self)
  }
}

impl fmt::Display for RoundId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}
